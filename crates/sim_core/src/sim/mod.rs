use thiserror::Error;

pub mod ai;
pub mod camera;
pub mod entity;
pub mod events;
pub mod los;
pub mod movement;
pub mod players;
pub mod snapshot;
pub mod step;
pub mod tuning;

use entity::EntityId;
use players::PlayerIndex;
use tuning::TuningError;

/// Host-integration mistakes caught at the public boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),
    #[error("player slot {0} is not connected or out of range")]
    UnknownPlayer(PlayerIndex),
    #[error("the primary player slot cannot be disconnected")]
    PrimaryPlayerRequired,
    #[error("entity {0} has no attack in progress")]
    NoAttackInProgress(EntityId),
    #[error("entity {0} is not dying")]
    NotDying(EntityId),
    #[error("viewport {width}x{height} cannot keep a {margin} margin on both sides")]
    InvalidViewport { width: f32, height: f32, margin: f32 },
    #[error("invalid tuning: {0}")]
    InvalidTuning(#[from] TuningError),
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
