use super::entity::EntityId;
use super::los::LineOfSight;
use super::tuning::{ChaseParams, GeneratorParams};
use crate::geometry::{distance_between, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiBehavior {
    Chase(ChaseParams),
    SpawnGenerator(GeneratorParams),
}

impl AiBehavior {
    pub fn label(&self) -> &'static str {
        match self {
            AiBehavior::Chase(_) => "chase",
            AiBehavior::SpawnGenerator(_) => "spawn_generator",
        }
    }
}

/// Per-enemy AI memory. `target` is only an id; it is resolved against the
/// entity table on every use.
#[derive(Debug, Clone, PartialEq)]
pub struct AiAgent {
    pub behavior: AiBehavior,
    pub target: Option<EntityId>,
    pub time_until_next_generate: f32,
    pub active_units: Vec<EntityId>,
}

impl AiAgent {
    pub fn chase(params: ChaseParams) -> Self {
        Self {
            behavior: AiBehavior::Chase(params),
            target: None,
            time_until_next_generate: 0.0,
            active_units: Vec::new(),
        }
    }

    pub fn spawn_generator(params: GeneratorParams) -> Self {
        Self {
            behavior: AiBehavior::SpawnGenerator(params),
            target: None,
            time_until_next_generate: params.initial_countdown,
            active_units: Vec::new(),
        }
    }
}

/// One opposing entity as seen by an AI this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpponentView {
    pub id: EntityId,
    pub position: Vec2,
    pub dying: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChaseAction {
    Hold,
    MoveToward(Vec2),
    Attack { face: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaseDecision {
    pub target: Option<EntityId>,
    pub action: ChaseAction,
}

impl ChaseDecision {
    const IDLE: ChaseDecision = ChaseDecision {
        target: None,
        action: ChaseAction::Hold,
    };
}

/// Picks the nearest non-dying opponent inside the alert radius and decides
/// whether to close in or strike. Equal distances keep the first opponent seen.
pub fn decide_chase(
    params: &ChaseParams,
    position: Vec2,
    self_dying: bool,
    opponents: &[OpponentView],
) -> ChaseDecision {
    if self_dying {
        return ChaseDecision::IDLE;
    }

    let mut closest: Option<(f32, &OpponentView)> = None;
    for opponent in opponents {
        if opponent.dying {
            continue;
        }
        let distance = distance_between(position, opponent.position);
        if distance >= params.alert_radius {
            continue;
        }
        if closest.map_or(true, |(best, _)| distance < best) {
            closest = Some((distance, opponent));
        }
    }

    let Some((distance, target)) = closest else {
        return ChaseDecision::IDLE;
    };

    if distance > params.max_alert_radius {
        return ChaseDecision::IDLE;
    }

    let action = if distance > params.chase_radius {
        ChaseAction::MoveToward(target.position)
    } else if distance < params.chase_radius {
        ChaseAction::Attack {
            face: target.position,
        }
    } else {
        ChaseAction::Hold
    };

    ChaseDecision {
        target: Some(target.id),
        action,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorDecision {
    /// Health is gone; nothing ticks.
    Dormant,
    Waiting {
        countdown: f32,
    },
    /// A decision point was reached. The countdown restarts whether or not a
    /// unit is produced, which throttles generation while heroes stay hidden.
    DecisionPoint {
        generate: bool,
        next_countdown: f32,
        proximity_ratio: f32,
    },
}

pub struct GeneratorInput<'a> {
    pub position: Vec2,
    pub health: u32,
    pub active_units: usize,
    pub countdown: f32,
    pub delta_seconds: f32,
    pub opponents: &'a [OpponentView],
}

pub fn decide_generator(
    params: &GeneratorParams,
    input: &GeneratorInput<'_>,
    sight: &dyn LineOfSight,
) -> GeneratorDecision {
    if input.health == 0 {
        return GeneratorDecision::Dormant;
    }

    let mut closest_distance = params.minimum_hero_distance;
    let mut closest_position = None;
    for opponent in input.opponents {
        let distance = distance_between(input.position, opponent.position);
        if distance < closest_distance {
            closest_distance = distance;
            closest_position = Some(opponent.position);
        }
    }

    let proximity_ratio = closest_distance / params.minimum_hero_distance;
    let countdown = input.countdown - input.delta_seconds;
    let no_units = input.active_units < 1;

    let decision_point = no_units
        || countdown <= 0.0
        || (proximity_ratio < params.urgent_proximity_ratio
            && countdown > params.urgent_countdown_floor);
    if !decision_point {
        return GeneratorDecision::Waiting { countdown };
    }

    let generate = no_units
        || (input.active_units < params.max_active_units
            && closest_position
                .is_some_and(|hero_position| sight.can_see(hero_position, input.position)));

    GeneratorDecision::DecisionPoint {
        generate,
        next_countdown: params.countdown_scale * proximity_ratio,
        proximity_ratio,
    }
}
