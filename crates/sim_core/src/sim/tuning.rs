use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CHARACTER_COLLISION_RADIUS: f32 = 40.0;
pub const ENEMY_ALERT_RADIUS: f32 = CHARACTER_COLLISION_RADIUS * 500.0;
pub const BOSS_CHASE_RADIUS: f32 = CHARACTER_COLLISION_RADIUS * 4.0;
pub const MINIMUM_HERO_DISTANCE: f32 = 2048.0;
pub const MAX_GENERATED_UNITS: usize = 4;
pub const MIN_HERO_TO_EDGE_DISTANCE: f32 = 256.0;
pub const MIN_TIME_INTERVAL: f32 = 1.0 / 60.0;
pub const MAX_TICK_GAP_SECONDS: f32 = 1.0;
pub const HERO_PROJECTILE_SPEED: f32 = 480.0;
pub const HERO_PROJECTILE_LIFETIME: f32 = 1.0;
pub const START_LIVES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaseParams {
    pub alert_radius: f32,
    pub max_alert_radius: f32,
    pub chase_radius: f32,
}

impl ChaseParams {
    pub fn goblin() -> Self {
        Self {
            alert_radius: ENEMY_ALERT_RADIUS,
            max_alert_radius: ENEMY_ALERT_RADIUS * 2.0,
            chase_radius: CHARACTER_COLLISION_RADIUS * 2.0,
        }
    }

    /// The boss notices heroes across the whole level but gives up once they
    /// are more than a few body lengths away.
    pub fn boss() -> Self {
        Self {
            alert_radius: ENEMY_ALERT_RADIUS,
            max_alert_radius: BOSS_CHASE_RADIUS * 4.0,
            chase_radius: BOSS_CHASE_RADIUS,
        }
    }

    fn validate(&self, prefix: &'static str) -> Result<(), TuningError> {
        require_non_negative(prefix, "alert_radius", self.alert_radius)?;
        require_non_negative(prefix, "max_alert_radius", self.max_alert_radius)?;
        require_non_negative(prefix, "chase_radius", self.chase_radius)
    }
}

impl Default for ChaseParams {
    fn default() -> Self {
        Self::goblin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorParams {
    pub minimum_hero_distance: f32,
    pub max_active_units: usize,
    pub urgent_proximity_ratio: f32,
    pub urgent_countdown_floor: f32,
    pub countdown_scale: f32,
    pub initial_countdown: f32,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            minimum_hero_distance: MINIMUM_HERO_DISTANCE,
            max_active_units: MAX_GENERATED_UNITS,
            urgent_proximity_ratio: 0.35,
            urgent_countdown_floor: 5.0,
            countdown_scale: 4.0,
            initial_countdown: 5.0,
        }
    }
}

impl GeneratorParams {
    fn validate(&self) -> Result<(), TuningError> {
        require_positive("generator", "minimum_hero_distance", self.minimum_hero_distance)?;
        require_non_negative("generator", "urgent_proximity_ratio", self.urgent_proximity_ratio)?;
        require_non_negative("generator", "urgent_countdown_floor", self.urgent_countdown_floor)?;
        require_non_negative("generator", "countdown_scale", self.countdown_scale)?;
        require_non_negative("generator", "initial_countdown", self.initial_countdown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    pub max_health: u32,
    pub movement_speed: f32,
    pub attack_damage: u32,
    pub kill_score: u32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            max_health: 100,
            movement_speed: 200.0,
            attack_damage: 10,
            kill_score: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub goblin_chase: ChaseParams,
    pub boss_chase: ChaseParams,
    pub generator: GeneratorParams,
    pub hero: UnitStats,
    pub goblin: UnitStats,
    pub boss: UnitStats,
    pub cave: UnitStats,
    pub hero_turn_rate_radians: f32,
    pub warrior_attack_reach: f32,
    pub archer_attack_reach: f32,
    pub hit_radius: f32,
    pub camera_margin: f32,
    pub min_time_interval: f32,
    pub max_tick_gap_seconds: f32,
    pub start_lives: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            goblin_chase: ChaseParams::goblin(),
            boss_chase: ChaseParams::boss(),
            generator: GeneratorParams::default(),
            hero: UnitStats {
                max_health: 100,
                movement_speed: 200.0,
                attack_damage: 50,
                kill_score: 0,
            },
            goblin: UnitStats {
                max_health: 100,
                movement_speed: 150.0,
                attack_damage: 10,
                kill_score: 10,
            },
            boss: UnitStats {
                max_health: 1000,
                movement_speed: 70.0,
                attack_damage: 25,
                kill_score: 100,
            },
            cave: UnitStats {
                max_health: 50,
                movement_speed: 0.0,
                attack_damage: 0,
                kill_score: 25,
            },
            hero_turn_rate_radians: 0.06 * 60.0,
            warrior_attack_reach: CHARACTER_COLLISION_RADIUS * 3.0,
            archer_attack_reach: HERO_PROJECTILE_SPEED * HERO_PROJECTILE_LIFETIME,
            hit_radius: CHARACTER_COLLISION_RADIUS,
            camera_margin: MIN_HERO_TO_EDGE_DISTANCE,
            min_time_interval: MIN_TIME_INTERVAL,
            max_tick_gap_seconds: MAX_TICK_GAP_SECONDS,
            start_lives: START_LIVES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    #[error("{section}.{field} must be finite and non-negative, got {value}")]
    NegativeOrNonFinite {
        section: &'static str,
        field: &'static str,
        value: f32,
    },
    #[error("{section}.{field} must be finite and greater than zero, got {value}")]
    NotPositive {
        section: &'static str,
        field: &'static str,
        value: f32,
    },
}

impl Tuning {
    pub fn validate(&self) -> Result<(), TuningError> {
        self.goblin_chase.validate("goblin_chase")?;
        self.boss_chase.validate("boss_chase")?;
        self.generator.validate()?;
        for (section, stats) in [
            ("hero", &self.hero),
            ("goblin", &self.goblin),
            ("boss", &self.boss),
            ("cave", &self.cave),
        ] {
            require_non_negative(section, "movement_speed", stats.movement_speed)?;
        }
        require_non_negative("tuning", "hero_turn_rate_radians", self.hero_turn_rate_radians)?;
        require_non_negative("tuning", "warrior_attack_reach", self.warrior_attack_reach)?;
        require_non_negative("tuning", "archer_attack_reach", self.archer_attack_reach)?;
        require_non_negative("tuning", "hit_radius", self.hit_radius)?;
        require_non_negative("tuning", "camera_margin", self.camera_margin)?;
        require_positive("tuning", "min_time_interval", self.min_time_interval)?;
        require_positive("tuning", "max_tick_gap_seconds", self.max_tick_gap_seconds)
    }
}

fn require_non_negative(
    section: &'static str,
    field: &'static str,
    value: f32,
) -> Result<(), TuningError> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(TuningError::NegativeOrNonFinite {
        section,
        field,
        value,
    })
}

fn require_positive(section: &'static str, field: &'static str, value: f32) -> Result<(), TuningError> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(TuningError::NotPositive {
        section,
        field,
        value,
    })
}
