use serde::Serialize;

use super::entity::{EntityId, EntityKind, LifeState, Team};
use crate::geometry::Vec2;

/// Read-only view of the world after a tick, for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub world_offset: Vec2,
    pub world_moved: bool,
    pub entities: Vec<EntitySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub team: Team,
    pub position: Vec2,
    pub facing_radians: f32,
    pub life: LifeState,
    pub health: u32,
    pub max_health: u32,
    pub target: Option<EntityId>,
}

impl WorldSnapshot {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
