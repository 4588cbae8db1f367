pub mod geometry;
pub mod level;
pub mod sim;

pub use geometry::{direction_from_radians, distance_between, hypotenuse, radians_between, Vec2};
pub use level::{LevelCell, LevelLayout, LevelMap, LevelMapError};
pub use sim::ai::{
    decide_chase, decide_generator, AiAgent, AiBehavior, ChaseAction, ChaseDecision,
    GeneratorDecision, GeneratorInput, OpponentView,
};
pub use sim::camera::{CameraFollow, Viewport};
pub use sim::entity::{Entity, EntityId, EntityKind, Health, HeroClass, LifeState, Team};
pub use sim::events::{SimEvent, SimEventCounts, SimEventKind};
pub use sim::los::{ClearSight, LineOfSight};
pub use sim::players::{
    DirectionFlags, MoveDirection, Player, PlayerIndex, PlayerIntent, Players, PLAYER_SLOTS,
};
pub use sim::snapshot::{EntitySnapshot, WorldSnapshot};
pub use sim::step::{
    AttackOutcome, DamageResult, EnemyKind, SimPhase, Simulation, TickReport, SIM_PHASE_ORDER,
    SIM_PHASE_ORDER_TEXT,
};
pub use sim::tuning::{ChaseParams, GeneratorParams, Tuning, TuningError, UnitStats};
pub use sim::SimError;
