use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::ai::{
    decide_chase, decide_generator, AiAgent, AiBehavior, ChaseAction, GeneratorDecision,
    GeneratorInput, OpponentView,
};
use super::camera::{CameraFollow, Viewport};
use super::entity::{Entity, EntityId, EntityKind, EntityTable, HeroClass, LifeState, Team};
use super::events::{SimEvent, SimEventBus, SimEventCounts};
use super::los::{ClearSight, LineOfSight};
use super::movement::{face_to, move_in_direction, move_relative, move_towards};
use super::players::{MoveDirection, PlayerIndex, Players};
use super::snapshot::{EntitySnapshot, WorldSnapshot};
use super::tuning::{GeneratorParams, Tuning};
use super::SimError;
use crate::geometry::{direction_from_radians, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimPhase {
    FrameClock,
    Ai,
    PrimaryIntent,
    PlayerMovement,
    CameraFollow,
    Cleanup,
}

impl SimPhase {
    pub fn name(self) -> &'static str {
        match self {
            SimPhase::FrameClock => "FrameClock",
            SimPhase::Ai => "Ai",
            SimPhase::PrimaryIntent => "PrimaryIntent",
            SimPhase::PlayerMovement => "PlayerMovement",
            SimPhase::CameraFollow => "CameraFollow",
            SimPhase::Cleanup => "Cleanup",
        }
    }
}

pub const SIM_PHASE_ORDER: [SimPhase; 6] = [
    SimPhase::FrameClock,
    SimPhase::Ai,
    SimPhase::PrimaryIntent,
    SimPhase::PlayerMovement,
    SimPhase::CameraFollow,
    SimPhase::Cleanup,
];

pub const SIM_PHASE_ORDER_TEXT: &str =
    "FrameClock>Ai>PrimaryIntent>PlayerMovement>CameraFollow>Cleanup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Goblin,
    Boss,
    Cave,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub delta_seconds: f32,
    pub delta_clamped: bool,
    pub world_moved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageResult {
    pub applied: u32,
    pub killed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    Landed {
        target: EntityId,
        damage: DamageResult,
    },
    /// The attacker died mid-swing, its target is gone, or a hero strike met nothing.
    NoHit,
}

#[derive(Debug, Clone, Copy)]
struct ActorView {
    id: EntityId,
    position: Vec2,
    dying: bool,
    health: u32,
}

pub struct Simulation {
    tuning: Tuning,
    entities: EntityTable,
    ai_agents: HashMap<EntityId, AiAgent>,
    camera: CameraFollow,
    sight: Box<dyn LineOfSight>,
    spawn_point: Vec2,
    last_update_time: f64,
    pending_reposition: bool,
    world_moved: bool,
    tick: u64,
    last_tick_phases: Vec<SimPhase>,
    events: SimEventBus,
}

impl Simulation {
    pub fn new(tuning: Tuning, viewport: Viewport) -> Result<Self, SimError> {
        tuning.validate()?;
        let camera = CameraFollow::new(viewport, tuning.camera_margin)?;
        Ok(Self {
            tuning,
            entities: EntityTable::default(),
            ai_agents: HashMap::new(),
            camera,
            sight: Box::new(ClearSight),
            spawn_point: Vec2::ZERO,
            last_update_time: 0.0,
            pending_reposition: false,
            world_moved: false,
            tick: 0,
            last_tick_phases: Vec::with_capacity(SIM_PHASE_ORDER.len()),
            events: SimEventBus::default(),
        })
    }

    pub fn set_line_of_sight(&mut self, sight: Box<dyn LineOfSight>) {
        self.sight = sight;
    }

    pub fn set_spawn_point(&mut self, spawn_point: Vec2) {
        self.spawn_point = spawn_point;
    }

    pub fn spawn_point(&self) -> Vec2 {
        self.spawn_point
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn last_tick_phases(&self) -> &[SimPhase] {
        &self.last_tick_phases
    }

    pub fn world_offset(&self) -> Vec2 {
        self.camera.world_offset()
    }

    pub fn world_moved(&self) -> bool {
        self.world_moved
    }

    pub fn camera(&self) -> &CameraFollow {
        &self.camera
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.find(id)
    }

    pub fn ai_agent(&self, id: EntityId) -> Option<&AiAgent> {
        self.ai_agents.get(&id)
    }

    pub fn ai_target(&self, id: EntityId) -> Option<EntityId> {
        self.ai_agents.get(&id).and_then(|agent| agent.target)
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    pub fn last_drain_counts(&self) -> SimEventCounts {
        self.events.last_drain_counts()
    }

    pub fn spawn_enemy(&mut self, kind: EnemyKind, position: Vec2) -> EntityId {
        let (entity_kind, stats, agent) = match kind {
            EnemyKind::Goblin => (
                EntityKind::Goblin { generator: None },
                self.tuning.goblin,
                AiAgent::chase(self.tuning.goblin_chase),
            ),
            EnemyKind::Boss => (
                EntityKind::Boss,
                self.tuning.boss,
                AiAgent::chase(self.tuning.boss_chase),
            ),
            EnemyKind::Cave => (
                EntityKind::Cave,
                self.tuning.cave,
                AiAgent::spawn_generator(self.tuning.generator),
            ),
        };
        let id = self.entities.spawn(entity_kind, position, stats);
        self.entities.apply_pending();
        debug!(
            entity_id = id.0,
            kind = entity_kind.label(),
            ai = agent.behavior.label(),
            x = position.x,
            y = position.y,
            "enemy_spawned"
        );
        self.ai_agents.insert(id, agent);
        id
    }

    /// Places a fresh hero for `index` at the spawn point, replacing a living
    /// hero the player already had. Spawning the local player's hero recentres
    /// the world on it.
    pub fn spawn_hero_for(
        &mut self,
        players: &mut Players,
        index: PlayerIndex,
    ) -> Result<EntityId, SimError> {
        let player = players
            .get_mut(index)
            .ok_or(SimError::UnknownPlayer(index))?;

        if let Some(existing) = player.hero {
            let replace = self
                .entities
                .find(existing)
                .is_some_and(|hero| !hero.is_dying());
            if replace {
                self.entities.despawn(existing);
                self.events.emit(SimEvent::EntityRemoved {
                    entity_id: existing,
                });
                debug!(player = index.0, hero = existing.0, "hero_replaced");
            }
        }

        let id = self.entities.spawn(
            EntityKind::Hero {
                class: player.hero_class,
                player: index,
            },
            self.spawn_point,
            self.tuning.hero,
        );
        self.entities.apply_pending();
        player.hero = Some(id);
        self.purge_stale_targets();

        if index.is_primary() {
            self.center_world_on(self.spawn_point);
        }
        self.events.emit(SimEvent::HeroSpawned {
            player: index,
            hero: id,
        });
        info!(
            player = index.0,
            hero = id.0,
            lives_left = player.lives_left,
            "hero_spawned"
        );
        Ok(id)
    }

    /// Seats or reattaches the player at `index`. A hero is placed only when
    /// the player has none; a returning player keeps the hero it left behind.
    pub fn connect_player(
        &mut self,
        players: &mut Players,
        index: PlayerIndex,
        hero_class: HeroClass,
    ) -> Result<EntityId, SimError> {
        let existing = players
            .connect(index, hero_class, self.tuning.start_lives)?
            .hero;
        if let Some(hero) = existing {
            debug!(player = index.0, hero = hero.0, "player_reattached");
            return Ok(hero);
        }
        self.spawn_hero_for(players, index)
    }

    pub fn center_world_on(&mut self, position: Vec2) {
        self.camera.center_on(position);
        self.pending_reposition = true;
    }

    /// Steps the world using the time elapsed since the previous call.
    pub fn advance_to(&mut self, current_time: f64, players: &mut Players) -> TickReport {
        let delta = current_time - self.last_update_time;
        self.last_update_time = current_time;
        self.advance(delta, players)
    }

    pub fn advance(&mut self, delta_seconds: f64, players: &mut Players) -> TickReport {
        self.tick = self.tick.saturating_add(1);
        self.last_tick_phases.clear();

        self.last_tick_phases.push(SimPhase::FrameClock);
        let (dt, delta_clamped) = effective_delta(delta_seconds, &self.tuning);
        self.world_moved = delta_clamped || std::mem::take(&mut self.pending_reposition);
        if delta_clamped {
            debug!(
                tick = self.tick,
                raw_delta_seconds = delta_seconds,
                "frame_delta_clamped"
            );
        }

        self.last_tick_phases.push(SimPhase::Ai);
        self.run_ai_phase(dt);

        self.last_tick_phases.push(SimPhase::PrimaryIntent);
        if dt > 0.0 {
            self.apply_primary_intent(dt, players);
        }

        self.last_tick_phases.push(SimPhase::PlayerMovement);
        if dt > 0.0 {
            self.apply_player_movement(dt, players);
        }

        self.last_tick_phases.push(SimPhase::CameraFollow);
        self.follow_primary_hero(players);

        self.last_tick_phases.push(SimPhase::Cleanup);
        self.entities.apply_pending();
        self.purge_stale_targets();
        if self.world_moved {
            self.events.emit(SimEvent::WorldRepositioned);
        }

        trace!(
            tick = self.tick,
            dt,
            entity_count = self.entities.len(),
            world_moved = self.world_moved,
            "tick_completed"
        );

        TickReport {
            tick: self.tick,
            delta_seconds: dt,
            delta_clamped,
            world_moved: self.world_moved,
        }
    }

    /// The host finished playing `attacker`'s attack animation. AI attackers hit
    /// whatever they are locked onto right now; heroes strike along their facing.
    pub fn notify_attack_animation_completed(
        &mut self,
        attacker: EntityId,
        players: &mut Players,
    ) -> Result<AttackOutcome, SimError> {
        let entity = self
            .entities
            .find_mut(attacker)
            .ok_or(SimError::UnknownEntity(attacker))?;
        if entity.is_dying() {
            return Ok(AttackOutcome::NoHit);
        }
        if !entity.attacking {
            return Err(SimError::NoAttackInProgress(attacker));
        }
        entity.attacking = false;

        match entity.team() {
            Team::Hero => Ok(self.resolve_hero_strike(attacker, players)),
            Team::Enemy | Team::Structure => Ok(self.resolve_ai_strike(attacker)),
        }
    }

    /// The host finished playing `entity`'s death animation; the entity leaves
    /// the world. A hero's player loses a life and respawns while lives remain.
    pub fn notify_death_animation_completed(
        &mut self,
        entity: EntityId,
        players: &mut Players,
    ) -> Result<(), SimError> {
        let dead = self
            .entities
            .find(entity)
            .ok_or(SimError::UnknownEntity(entity))?;
        if !dead.is_dying() {
            return Err(SimError::NotDying(entity));
        }
        let kind = dead.kind;

        self.entities.despawn(entity);
        self.entities.apply_pending();
        self.ai_agents.remove(&entity);
        self.purge_stale_targets();
        self.events.emit(SimEvent::EntityRemoved { entity_id: entity });
        debug!(entity_id = entity.0, kind = kind.label(), "entity_removed");

        if let EntityKind::Hero { player, .. } = kind {
            self.hero_was_killed(players, player, entity)?;
        }
        Ok(())
    }

    /// Direct damage from a host-side source such as a projectile collision.
    pub fn apply_damage(&mut self, target: EntityId, amount: u32) -> Result<DamageResult, SimError> {
        if self.entities.find(target).is_none() {
            return Err(SimError::UnknownEntity(target));
        }
        Ok(self.damage_entity(target, amount))
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            world_offset: self.camera.world_offset(),
            world_moved: self.world_moved,
            entities: self
                .entities
                .iter()
                .map(|entity| EntitySnapshot {
                    id: entity.id,
                    kind: entity.kind,
                    team: entity.team(),
                    position: entity.position,
                    facing_radians: entity.facing_radians,
                    life: entity.life,
                    health: entity.health.current(),
                    max_health: entity.health.max(),
                    target: self.ai_target(entity.id),
                })
                .collect(),
        }
    }

    fn run_ai_phase(&mut self, dt: f32) {
        let mut actor_ids = self.ai_agents.keys().copied().collect::<Vec<_>>();
        actor_ids.sort();
        let hero_views = self.opponent_views(Team::Enemy);

        for actor_id in actor_ids {
            let Some(mut agent) = self.ai_agents.get(&actor_id).cloned() else {
                continue;
            };
            let Some(actor) = self.entities.find(actor_id) else {
                self.ai_agents.remove(&actor_id);
                continue;
            };
            let actor = ActorView {
                id: actor_id,
                position: actor.position,
                dying: actor.is_dying(),
                health: actor.health.current(),
            };

            match agent.behavior {
                AiBehavior::Chase(params) => {
                    let decision = decide_chase(&params, actor.position, actor.dying, &hero_views);
                    agent.target = decision.target;
                    if dt > 0.0 {
                        self.apply_chase_action(actor_id, decision.action, dt);
                    }
                }
                AiBehavior::SpawnGenerator(params) => {
                    if dt > 0.0 {
                        self.run_generator(actor, &mut agent, &params, dt, &hero_views);
                    }
                }
            }

            self.ai_agents.insert(actor_id, agent);
        }
    }

    fn opponent_views(&self, team: Team) -> Vec<OpponentView> {
        self.entities
            .opponents_of(team)
            .map(|entity| OpponentView {
                id: entity.id,
                position: entity.position,
                dying: entity.is_dying(),
            })
            .collect()
    }

    fn apply_chase_action(&mut self, actor_id: EntityId, action: ChaseAction, dt: f32) {
        match action {
            ChaseAction::Hold => {}
            ChaseAction::MoveToward(point) => {
                if let Some(actor) = self.entities.find_mut(actor_id) {
                    move_towards(actor, point, dt);
                }
            }
            ChaseAction::Attack { face } => {
                if let Some(actor) = self.entities.find_mut(actor_id) {
                    face_to(actor, face);
                }
                self.request_attack(actor_id);
            }
        }
    }

    fn run_generator(
        &mut self,
        generator: ActorView,
        agent: &mut AiAgent,
        params: &GeneratorParams,
        dt: f32,
        hero_views: &[OpponentView],
    ) {
        agent
            .active_units
            .retain(|unit| self.entities.is_active(*unit));
        let input = GeneratorInput {
            position: generator.position,
            health: generator.health,
            active_units: agent.active_units.len(),
            countdown: agent.time_until_next_generate,
            delta_seconds: dt,
            opponents: hero_views,
        };

        match decide_generator(params, &input, self.sight.as_ref()) {
            GeneratorDecision::Dormant => {}
            GeneratorDecision::Waiting { countdown } => {
                agent.time_until_next_generate = countdown;
            }
            GeneratorDecision::DecisionPoint {
                generate,
                next_countdown,
                proximity_ratio,
            } => {
                if generate {
                    let unit = self.spawn_generated_goblin(generator.id, generator.position);
                    agent.active_units.push(unit);
                }
                agent.time_until_next_generate = next_countdown;
                trace!(
                    generator = generator.id.0,
                    generate,
                    proximity_ratio,
                    next_countdown,
                    active_units = agent.active_units.len(),
                    "generator_decision"
                );
            }
        }
    }

    fn spawn_generated_goblin(&mut self, generator: EntityId, position: Vec2) -> EntityId {
        let unit = self.entities.spawn(
            EntityKind::Goblin {
                generator: Some(generator),
            },
            position,
            self.tuning.goblin,
        );
        self.entities.apply_pending();
        self.ai_agents
            .insert(unit, AiAgent::chase(self.tuning.goblin_chase));
        self.events.emit(SimEvent::UnitGenerated { generator, unit });
        debug!(generator = generator.0, unit = unit.0, "unit_generated");
        unit
    }

    fn apply_primary_intent(&mut self, dt: f32, players: &mut Players) {
        let primary = players.primary_mut();
        let Some(hero_id) = primary.hero else {
            return;
        };
        let Some(target) = primary.intent.target_location else {
            return;
        };
        let Some(hero) = self
            .entities
            .find_mut(hero_id)
            .filter(|hero| hero.is_active())
        else {
            return;
        };

        if primary.intent.fire {
            face_to(hero, target);
        }
        if primary.intent.move_requested {
            if hero.position != target {
                move_towards(hero, target, dt);
            } else {
                primary.intent.move_requested = false;
            }
        }
    }

    fn apply_player_movement(&mut self, dt: f32, players: &Players) {
        let turn_rate = self.tuning.hero_turn_rate_radians;
        for (_, player) in players.connected() {
            let Some(hero_id) = player.hero else {
                continue;
            };
            let Some(hero) = self
                .entities
                .find_mut(hero_id)
                .filter(|hero| hero.is_active())
            else {
                continue;
            };

            let intent = player.intent;
            if intent.move_direction.length() > 0.0 {
                move_in_direction(hero, intent.move_direction, dt);
            } else {
                if intent.flags.forward {
                    move_relative(hero, MoveDirection::Forward, turn_rate, dt);
                } else if intent.flags.back {
                    move_relative(hero, MoveDirection::Back, turn_rate, dt);
                }

                if intent.flags.left {
                    move_relative(hero, MoveDirection::Left, turn_rate, dt);
                } else if intent.flags.right {
                    move_relative(hero, MoveDirection::Right, turn_rate, dt);
                }
            }

            if intent.fire {
                self.request_attack(hero_id);
            }
        }
    }

    fn follow_primary_hero(&mut self, players: &Players) {
        let Some(hero) = players
            .primary()
            .hero
            .and_then(|hero_id| self.entities.find(hero_id))
        else {
            return;
        };
        if self.camera.follow(hero.position) {
            self.world_moved = true;
        }
    }

    fn request_attack(&mut self, attacker: EntityId) -> bool {
        let Some(entity) = self.entities.find_mut(attacker) else {
            return false;
        };
        if !entity.is_active() || entity.attacking {
            return false;
        }
        entity.attacking = true;
        self.events.emit(SimEvent::AttackRequested { attacker });
        true
    }

    fn resolve_ai_strike(&mut self, attacker: EntityId) -> AttackOutcome {
        let damage = self
            .entities
            .find(attacker)
            .map_or(0, |entity| entity.attack_damage);
        let target = self
            .ai_target(attacker)
            .filter(|target| self.entities.is_active(*target));
        let Some(target) = target else {
            debug!(attacker = attacker.0, "attack_dropped");
            return AttackOutcome::NoHit;
        };

        self.events.emit(SimEvent::AttackLanded { attacker, target });
        let result = self.damage_entity(target, damage);
        AttackOutcome::Landed {
            target,
            damage: result,
        }
    }

    fn resolve_hero_strike(&mut self, attacker: EntityId, players: &mut Players) -> AttackOutcome {
        let Some(hero) = self.entities.find(attacker) else {
            return AttackOutcome::NoHit;
        };
        let EntityKind::Hero { class, player } = hero.kind else {
            return AttackOutcome::NoHit;
        };
        let reach = match class {
            HeroClass::Warrior => self.tuning.warrior_attack_reach,
            HeroClass::Archer => self.tuning.archer_attack_reach,
        };
        let origin = hero.position;
        let damage = hero.attack_damage;
        let direction = direction_from_radians(hero.facing_radians);
        let hit_radius = self.tuning.hit_radius;

        let mut best: Option<(f32, EntityId)> = None;
        for candidate in self.entities.opponents_of(Team::Hero) {
            if !candidate.is_active() {
                continue;
            }
            let offset = candidate.position - origin;
            let along = offset.x * direction.x + offset.y * direction.y;
            if !(0.0..=reach).contains(&along) {
                continue;
            }
            let across = (offset.x * direction.y - offset.y * direction.x).abs();
            if across > hit_radius {
                continue;
            }
            if !self.sight.can_see(origin, candidate.position) {
                continue;
            }
            if best.map_or(true, |(closest, _)| along < closest) {
                best = Some((along, candidate.id));
            }
        }

        let Some((_, target)) = best else {
            trace!(attacker = attacker.0, "hero_strike_missed");
            return AttackOutcome::NoHit;
        };

        self.events.emit(SimEvent::AttackLanded { attacker, target });
        let result = self.damage_entity(target, damage);
        if result.killed {
            let kill_score = self
                .entities
                .find(target)
                .map_or(0, |entity| self.kill_score(entity.kind));
            self.award_score(players, player, kill_score);
        }
        AttackOutcome::Landed {
            target,
            damage: result,
        }
    }

    fn kill_score(&self, kind: EntityKind) -> u32 {
        match kind {
            EntityKind::Hero { .. } => self.tuning.hero.kill_score,
            EntityKind::Goblin { .. } => self.tuning.goblin.kill_score,
            EntityKind::Boss => self.tuning.boss.kill_score,
            EntityKind::Cave => self.tuning.cave.kill_score,
        }
    }

    fn award_score(&mut self, players: &mut Players, index: PlayerIndex, amount: u32) {
        if amount == 0 {
            return;
        }
        let Some(player) = players.get_mut(index) else {
            return;
        };
        player.score = player.score.saturating_add(amount);
        self.events.emit(SimEvent::ScoreAwarded {
            player: index,
            amount,
        });
        debug!(player = index.0, amount, score = player.score, "score_awarded");
    }

    fn damage_entity(&mut self, target: EntityId, amount: u32) -> DamageResult {
        let Some(entity) = self
            .entities
            .find_mut(target)
            .filter(|entity| entity.is_active())
        else {
            return DamageResult {
                applied: 0,
                killed: false,
            };
        };

        let applied = entity.health.apply_damage(amount);
        let killed = entity.health.is_depleted();
        if killed {
            entity.life = LifeState::Dying;
            entity.attacking = false;
        }
        let kind = entity.kind;

        if applied > 0 {
            self.events.emit(SimEvent::EntityDamaged {
                entity_id: target,
                amount: applied,
            });
        }
        if killed {
            self.events.emit(SimEvent::EntityDied { entity_id: target });
            self.purge_stale_targets();
            info!(entity_id = target.0, kind = kind.label(), "entity_died");
        }
        DamageResult { applied, killed }
    }

    fn hero_was_killed(
        &mut self,
        players: &mut Players,
        index: PlayerIndex,
        hero: EntityId,
    ) -> Result<(), SimError> {
        let Some(player) = players.get_mut(index) else {
            debug!(player = index.0, hero = hero.0, "dead_hero_owner_disconnected");
            return Ok(());
        };
        if player.hero != Some(hero) {
            return Ok(());
        }

        player.hero = None;
        player.intent.move_requested = false;
        player.lives_left = player.lives_left.saturating_sub(1);
        if player.lives_left < 1 {
            info!(player = index.0, score = player.score, "player_out_of_lives");
            return Ok(());
        }

        let respawned = self.spawn_hero_for(players, index)?;
        info!(player = index.0, hero = respawned.0, "hero_respawned");
        Ok(())
    }

    fn purge_stale_targets(&mut self) {
        let entities = &self.entities;
        for agent in self.ai_agents.values_mut() {
            if agent
                .target
                .is_some_and(|target| !entities.is_active(target))
            {
                agent.target = None;
            }
            agent.active_units.retain(|unit| entities.is_active(*unit));
        }
    }
}

/// Gaps longer than the configured limit (a suspend or a debugger stop) are
/// replaced by one minimum frame and reported as a discontinuity.
fn effective_delta(raw_seconds: f64, tuning: &Tuning) -> (f32, bool) {
    if raw_seconds.is_nan() || raw_seconds > f64::from(tuning.max_tick_gap_seconds) {
        return (tuning.min_time_interval, true);
    }
    if raw_seconds <= 0.0 {
        return (0.0, false);
    }
    (raw_seconds as f32, false)
}
