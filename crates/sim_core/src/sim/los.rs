use crate::geometry::Vec2;

/// Answers whether an unobstructed straight path joins two world points.
pub trait LineOfSight {
    fn can_see(&self, from: Vec2, to: Vec2) -> bool;
}

/// Open terrain: everything is visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearSight;

impl LineOfSight for ClearSight {
    fn can_see(&self, _from: Vec2, _to: Vec2) -> bool {
        true
    }
}
