use std::process::ExitCode;

use serde::Deserialize;
use sim_core::{AttackOutcome, SimEventCounts, Team};
use tracing::{error, info, warn};

use super::animation::{AnimationDriver, CompletionKind};
use super::bootstrap::AppWiring;
use super::scenario::{apply_script_step, build_world, ScriptStep, World};

/// Virtual clock settings for a headless run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RunConfig {
    pub(crate) ticks: u64,
    pub(crate) ticks_per_second: u32,
    /// Ticks preceded by an artificial pause of `stall_seconds`.
    pub(crate) stall_ticks: Vec<u64>,
    pub(crate) stall_seconds: f64,
    pub(crate) summary_interval_ticks: u64,
    pub(crate) attack_animation_seconds: f32,
    pub(crate) death_animation_seconds: f32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            ticks_per_second: 60,
            stall_ticks: Vec::new(),
            stall_seconds: 2.0,
            summary_interval_ticks: 60,
            attack_animation_seconds: 0.4,
            death_animation_seconds: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) ticks_run: u64,
    pub(crate) clamped_ticks: u64,
    pub(crate) world_moved_ticks: u64,
    pub(crate) events: SimEventCounts,
    pub(crate) strikes_without_hit: u32,
    pub(crate) rejected_signals: u32,
    pub(crate) score: u32,
    pub(crate) lives_left: u32,
    pub(crate) active_entities: usize,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring { scenario, config } = app;
    let mut world = match build_world(&scenario) {
        Ok(world) => world,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let summary = match run_session(&mut world, &scenario.script, &config) {
        Ok(summary) => summary,
        Err(err) => {
            error!(error = %err, "run_failed");
            return ExitCode::FAILURE;
        }
    };
    log_run_summary(&scenario.name, &summary);

    match world.sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(err) => {
            error!(error = %err, "snapshot_encode_failed");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

/// Runs `config.ticks` fixed steps. Script steps for tick `n` apply before
/// the `n`th step; animation completions are signalled once their time is up.
pub(crate) fn run_session(
    world: &mut World,
    script: &[ScriptStep],
    config: &RunConfig,
) -> Result<RunSummary, String> {
    let mut driver = AnimationDriver::new(
        config.attack_animation_seconds,
        config.death_animation_seconds,
    );
    let mut script = script.to_vec();
    script.sort_by_key(|step| step.tick);
    let mut next_step = 0;

    let frame_seconds = 1.0 / f64::from(config.ticks_per_second.max(1));
    let mut now = 0.0_f64;
    let mut summary = RunSummary::default();

    for tick in 0..config.ticks {
        while let Some(step) = script.get(next_step).filter(|step| step.tick <= tick) {
            apply_script_step(world, step)?;
            next_step += 1;
        }

        now += frame_seconds;
        if config.stall_ticks.contains(&tick) {
            now += config.stall_seconds;
            warn!(tick, stall_seconds = config.stall_seconds, "simulated_stall");
        }

        let report = world.sim.advance_to(now, &mut world.players);
        summary.ticks_run += 1;
        if report.delta_clamped {
            summary.clamped_ticks += 1;
        }
        if report.world_moved {
            summary.world_moved_ticks += 1;
        }

        pump_events(world, &mut driver, now, &mut summary);
        deliver_completions(world, &mut driver, now, &mut summary);

        if config.summary_interval_ticks > 0 && (tick + 1) % config.summary_interval_ticks == 0 {
            log_tick_summary(world, &driver, report.tick);
        }
    }

    let primary = world.players.primary();
    summary.score = primary.score;
    summary.lives_left = primary.lives_left;
    summary.active_entities = world
        .sim
        .entities()
        .filter(|entity| entity.is_active())
        .count();
    Ok(summary)
}

fn pump_events(
    world: &mut World,
    driver: &mut AnimationDriver,
    now: f64,
    summary: &mut RunSummary,
) {
    let events = world.sim.drain_events();
    summary.events.accumulate(world.sim.last_drain_counts());
    driver.observe(&events, now);
}

fn deliver_completions(
    world: &mut World,
    driver: &mut AnimationDriver,
    now: f64,
    summary: &mut RunSummary,
) {
    loop {
        let due = driver.take_due(now);
        if due.is_empty() {
            return;
        }
        for completion in due {
            let result = match completion.kind {
                CompletionKind::Attack => world
                    .sim
                    .notify_attack_animation_completed(completion.entity, &mut world.players)
                    .map(|outcome| {
                        if outcome == AttackOutcome::NoHit {
                            summary.strikes_without_hit += 1;
                        }
                    }),
                CompletionKind::Death => world
                    .sim
                    .notify_death_animation_completed(completion.entity, &mut world.players),
            };
            if let Err(err) = result {
                summary.rejected_signals += 1;
                warn!(
                    entity_id = completion.entity.0,
                    kind = ?completion.kind,
                    error = %err,
                    "animation_signal_rejected"
                );
            }
        }
        pump_events(world, driver, now, summary);
    }
}

fn log_tick_summary(world: &World, driver: &AnimationDriver, tick: u64) {
    let heroes_alive = world
        .sim
        .entities()
        .filter(|entity| entity.team() == Team::Hero && entity.is_active())
        .count();
    let offset = world.sim.world_offset();
    let primary = world.players.primary();
    info!(
        tick,
        entities = world.sim.entities().count(),
        heroes_alive,
        score = primary.score,
        lives_left = primary.lives_left,
        offset_x = offset.x,
        offset_y = offset.y,
        pending_animations = driver.pending_count(),
        "tick_summary"
    );
}

fn log_run_summary(scenario: &str, summary: &RunSummary) {
    info!(
        scenario,
        ticks_run = summary.ticks_run,
        clamped_ticks = summary.clamped_ticks,
        world_moved_ticks = summary.world_moved_ticks,
        events = summary.events.total,
        units_generated = summary.events.unit_generated,
        attacks_landed = summary.events.attack_landed,
        deaths = summary.events.entity_died,
        strikes_without_hit = summary.strikes_without_hit,
        rejected_signals = summary.rejected_signals,
        score = summary.score,
        lives_left = summary.lives_left,
        active_entities = summary.active_entities,
        "run_completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::scenario::{demo_scenario, EnemySpawn, Scenario, ScriptAction};
    use sim_core::{EnemyKind, Vec2};

    fn quiet_scenario() -> Scenario {
        Scenario {
            name: "quiet".to_string(),
            ..Scenario::default()
        }
    }

    #[test]
    fn demo_run_generates_units_and_signals_cleanly() {
        let scenario = demo_scenario();
        let mut world = build_world(&scenario).expect("world");
        let config = RunConfig {
            ticks: 120,
            ..scenario.run.clone()
        };

        let summary = run_session(&mut world, &scenario.script, &config).expect("run");

        assert_eq!(summary.ticks_run, 120);
        assert_eq!(summary.clamped_ticks, 0);
        assert!(summary.events.unit_generated >= 2);
        assert_eq!(summary.rejected_signals, 0);
        assert_eq!(world.sim.tick_count(), 120);
    }

    #[test]
    fn stall_tick_is_clamped_once_and_moves_world() {
        let scenario = quiet_scenario();
        let mut world = build_world(&scenario).expect("world");
        let config = RunConfig {
            ticks: 10,
            stall_ticks: vec![4],
            ..RunConfig::default()
        };

        let summary = run_session(&mut world, &[], &config).expect("run");

        assert_eq!(summary.clamped_ticks, 1);
        assert_eq!(summary.world_moved_ticks, 2);
    }

    #[test]
    fn scripted_walk_reaches_target_and_stops() {
        let scenario = quiet_scenario();
        let mut world = build_world(&scenario).expect("world");
        let script = [ScriptStep {
            tick: 0,
            player: 0,
            action: ScriptAction::PressAt {
                location: Vec2::new(100.0, 0.0),
                attack: false,
            },
        }];
        let config = RunConfig {
            ticks: 60,
            ..RunConfig::default()
        };

        run_session(&mut world, &script, &config).expect("run");

        let hero = world.players.primary().hero.expect("hero");
        assert_eq!(
            world.sim.entity(hero).map(|entity| entity.position),
            Some(Vec2::new(100.0, 0.0))
        );
        assert!(!world.players.primary().intent.move_requested);
    }

    #[test]
    fn goblin_wears_hero_down_and_hero_respawns() {
        let scenario = Scenario {
            enemies: vec![EnemySpawn {
                kind: EnemyKind::Goblin,
                position: Vec2::new(40.0, 0.0),
            }],
            ..quiet_scenario()
        };
        let mut world = build_world(&scenario).expect("world");
        let config = RunConfig {
            ticks: 150,
            attack_animation_seconds: 0.1,
            death_animation_seconds: 0.2,
            ..RunConfig::default()
        };

        let summary = run_session(&mut world, &[], &config).expect("run");

        assert_eq!(summary.events.entity_removed, 1);
        assert_eq!(summary.events.hero_spawned, 2);
        assert_eq!(summary.lives_left, 2);
        assert_eq!(summary.rejected_signals, 0);
        assert!(world.players.primary().hero.is_some());
    }

    #[test]
    fn script_failure_aborts_run() {
        let scenario = quiet_scenario();
        let mut world = build_world(&scenario).expect("world");
        let script = [ScriptStep {
            tick: 2,
            player: 1,
            action: ScriptAction::Fire { active: true },
        }];

        let error = run_session(&mut world, &script, &RunConfig::default()).expect_err("script");

        assert_eq!(error, "script tick 2: player slot 1 is not connected");
        assert_eq!(world.sim.tick_count(), 2);
    }
}
