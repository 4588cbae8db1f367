use serde::{Deserialize, Serialize};

use super::SimError;
use crate::geometry::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn middle(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }
}

/// World translation that keeps the tracked hero at least `margin` away from
/// every viewport edge. Viewport coordinate of a world point is
/// `world_offset + point`.
#[derive(Debug, Clone)]
pub struct CameraFollow {
    viewport: Viewport,
    margin: f32,
    world_offset: Vec2,
}

impl CameraFollow {
    pub fn new(viewport: Viewport, margin: f32) -> Result<Self, SimError> {
        validate_viewport(viewport, margin)?;
        Ok(Self {
            viewport,
            margin,
            world_offset: Vec2::ZERO,
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn world_offset(&self) -> Vec2 {
        self.world_offset
    }

    pub fn to_viewport(&self, world: Vec2) -> Vec2 {
        self.world_offset + world
    }

    pub fn center_on(&mut self, position: Vec2) {
        self.world_offset = -position + self.viewport.middle();
    }

    /// Shifts the world on each axis where the hero left the margin band.
    /// Returns whether any shift happened.
    pub fn follow(&mut self, hero: Vec2) -> bool {
        let (y, moved_y) = clamp_axis(self.world_offset.y, hero.y, self.viewport.height, self.margin);
        let (x, moved_x) = clamp_axis(self.world_offset.x, hero.x, self.viewport.width, self.margin);
        self.world_offset = Vec2::new(x, y);
        moved_x || moved_y
    }
}

fn clamp_axis(offset: f32, hero: f32, size: f32, margin: f32) -> (f32, bool) {
    let coordinate = offset + hero;
    if coordinate < margin {
        (-hero + margin, true)
    } else if coordinate > size - margin {
        (size - hero - margin, true)
    } else {
        (offset, false)
    }
}

fn validate_viewport(viewport: Viewport, margin: f32) -> Result<(), SimError> {
    let fits = |size: f32| size.is_finite() && size >= margin * 2.0;
    if !fits(viewport.width) || !fits(viewport.height) {
        return Err(SimError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
            margin,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraFollow {
        CameraFollow::new(
            Viewport {
                width: 1024.0,
                height: 768.0,
            },
            256.0,
        )
        .expect("camera")
    }

    #[test]
    fn hero_inside_band_does_not_move_world() {
        let mut camera = camera();
        camera.center_on(Vec2::ZERO);
        let before = camera.world_offset();

        assert!(!camera.follow(Vec2::new(100.0, -50.0)));
        assert_eq!(camera.world_offset(), before);
    }

    #[test]
    fn hero_past_low_edge_sits_exactly_on_margin() {
        let mut camera = camera();
        camera.center_on(Vec2::ZERO);

        assert!(camera.follow(Vec2::new(-400.0, 0.0)));
        assert_eq!(camera.to_viewport(Vec2::new(-400.0, 0.0)).x, 256.0);
        assert_eq!(camera.world_offset().y, 384.0);
    }

    #[test]
    fn hero_past_high_edge_sits_exactly_on_far_margin() {
        let mut camera = camera();
        camera.center_on(Vec2::ZERO);
        let hero = Vec2::new(300.0, 200.0);

        assert!(camera.follow(hero));
        let on_screen = camera.to_viewport(hero);
        assert_eq!(on_screen.x, 1024.0 - 256.0);
        assert_eq!(on_screen.y, 768.0 - 256.0);
    }

    #[test]
    fn center_on_puts_position_at_viewport_middle() {
        let mut camera = camera();
        camera.center_on(Vec2::new(50.0, -20.0));

        assert_eq!(camera.to_viewport(Vec2::new(50.0, -20.0)), Vec2::new(512.0, 384.0));
    }

    #[test]
    fn viewport_narrower_than_both_margins_is_rejected() {
        let result = CameraFollow::new(
            Viewport {
                width: 400.0,
                height: 768.0,
            },
            256.0,
        );

        assert!(matches!(result, Err(SimError::InvalidViewport { .. })));
    }
}
