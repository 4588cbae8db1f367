use super::entity::Entity;
use super::players::MoveDirection;
use crate::geometry::{direction_from_radians, distance_between, radians_between, Vec2};

pub fn face_to(entity: &mut Entity, point: Vec2) {
    if point != entity.position {
        entity.facing_radians = radians_between(entity.position, point);
    }
}

/// Walks toward `target` at the entity's speed, landing exactly on it when the
/// remaining distance fits inside this step.
pub fn move_towards(entity: &mut Entity, target: Vec2, dt_seconds: f32) {
    face_to(entity, target);
    let step = entity.movement_speed * dt_seconds;
    let distance = distance_between(entity.position, target);
    if distance <= step {
        entity.position = target;
        return;
    }
    let direction = (target - entity.position) * (1.0 / distance);
    entity.position += direction * step;
}

pub fn move_in_direction(entity: &mut Entity, direction: Vec2, dt_seconds: f32) {
    let unit = direction.normalized_or_zero();
    if unit == Vec2::ZERO {
        return;
    }
    entity.facing_radians = radians_between(Vec2::ZERO, unit);
    entity.position += unit * (entity.movement_speed * dt_seconds);
}

pub fn move_relative(
    entity: &mut Entity,
    direction: MoveDirection,
    turn_rate_radians: f32,
    dt_seconds: f32,
) {
    let forward = direction_from_radians(entity.facing_radians);
    let step = entity.movement_speed * dt_seconds;
    match direction {
        MoveDirection::Forward => entity.position += forward * step,
        MoveDirection::Back => entity.position += -forward * step,
        MoveDirection::Left => entity.facing_radians += turn_rate_radians * dt_seconds,
        MoveDirection::Right => entity.facing_radians -= turn_rate_radians * dt_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{EntityId, EntityKind, Health, LifeState};
    use std::f32::consts::FRAC_PI_2;

    fn walker(position: Vec2, speed: f32) -> Entity {
        Entity {
            id: EntityId(1),
            kind: EntityKind::Boss,
            position,
            facing_radians: 0.0,
            life: LifeState::Active,
            health: Health::full(10),
            movement_speed: speed,
            attack_damage: 1,
            attacking: false,
        }
    }

    fn assert_vec2_close(actual: Vec2, expected: Vec2) {
        assert!(
            (actual.x - expected.x).abs() <= 1e-4 && (actual.y - expected.y).abs() <= 1e-4,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn move_towards_advances_speed_times_dt_and_faces_target() {
        let mut entity = walker(Vec2::new(100.0, 0.0), 60.0);

        move_towards(&mut entity, Vec2::ZERO, 0.5);

        assert_vec2_close(entity.position, Vec2::new(70.0, 0.0));
        assert!((entity.facing_radians.abs() - std::f32::consts::PI).abs() <= 1e-5);
    }

    #[test]
    fn move_towards_snaps_onto_close_target() {
        let mut entity = walker(Vec2::new(1.0, 1.0), 200.0);

        move_towards(&mut entity, Vec2::new(2.0, 2.0), 1.0 / 60.0);

        assert_eq!(entity.position, Vec2::new(2.0, 2.0));
    }

    #[test]
    fn move_in_direction_uses_unit_direction() {
        let mut entity = walker(Vec2::ZERO, 10.0);

        move_in_direction(&mut entity, Vec2::new(0.0, 3.0), 2.0);

        assert_vec2_close(entity.position, Vec2::new(0.0, 20.0));
        assert!((entity.facing_radians - FRAC_PI_2).abs() <= 1e-5);
    }

    #[test]
    fn relative_moves_walk_along_facing_and_turn_in_place() {
        let mut entity = walker(Vec2::ZERO, 10.0);

        move_relative(&mut entity, MoveDirection::Forward, 1.0, 1.0);
        assert_vec2_close(entity.position, Vec2::new(10.0, 0.0));

        move_relative(&mut entity, MoveDirection::Back, 1.0, 0.5);
        assert_vec2_close(entity.position, Vec2::new(5.0, 0.0));

        move_relative(&mut entity, MoveDirection::Left, 2.0, 0.25);
        assert!((entity.facing_radians - 0.5).abs() <= 1e-6);
        move_relative(&mut entity, MoveDirection::Right, 2.0, 0.5);
        assert!((entity.facing_radians + 0.5).abs() <= 1e-6);
        assert_vec2_close(entity.position, Vec2::new(5.0, 0.0));
    }
}
