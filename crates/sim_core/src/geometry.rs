use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        hypotenuse(self.x, self.y)
    }

    /// Unit vector in the same direction, or zero when the input has no length.
    pub fn normalized_or_zero(self) -> Self {
        let length = self.length();
        if length <= f32::EPSILON || !length.is_finite() {
            return Self::ZERO;
        }
        Self {
            x: self.x / length,
            y: self.y / length,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

pub fn hypotenuse(a: f32, b: f32) -> f32 {
    a.hypot(b)
}

pub fn distance_between(a: Vec2, b: Vec2) -> f32 {
    hypotenuse(b.x - a.x, b.y - a.y)
}

/// Angle of the ray from `from` to `to`, counter-clockwise from +x.
pub fn radians_between(from: Vec2, to: Vec2) -> f32 {
    (to.y - from.y).atan2(to.x - from.x)
}

pub fn direction_from_radians(radians: f32) -> Vec2 {
    Vec2::new(radians.cos(), radians.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() <= 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn distance_between_is_symmetric_euclidean() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, 6.0);

        assert_close(distance_between(a, b), 5.0);
        assert_close(distance_between(b, a), 5.0);
        assert_close(distance_between(a, a), 0.0);
    }

    #[test]
    fn radians_between_follows_atan2_quadrants() {
        let origin = Vec2::ZERO;

        assert_close(radians_between(origin, Vec2::new(1.0, 0.0)), 0.0);
        assert_close(radians_between(origin, Vec2::new(0.0, 1.0)), PI / 2.0);
        assert_close(radians_between(origin, Vec2::new(-1.0, 0.0)), PI);
        assert_close(radians_between(origin, Vec2::new(0.0, -1.0)), -PI / 2.0);
    }

    #[test]
    fn normalized_or_zero_keeps_zero_vector_at_zero() {
        assert_eq!(Vec2::ZERO.normalized_or_zero(), Vec2::ZERO);

        let unit = Vec2::new(3.0, -4.0).normalized_or_zero();
        assert_close(unit.length(), 1.0);
        assert_close(unit.x, 0.6);
        assert_close(unit.y, -0.8);
    }

    #[test]
    fn direction_from_radians_round_trips_through_radians_between() {
        let angle = 0.75;
        let direction = direction_from_radians(angle);

        assert_close(radians_between(Vec2::ZERO, direction), angle);
    }
}
