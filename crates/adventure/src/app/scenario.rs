use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sim_core::{
    DirectionFlags, EnemyKind, HeroClass, LevelMap, PlayerIndex, Players, Simulation, Tuning,
    Vec2, Viewport, PLAYER_SLOTS,
};
use tracing::info;

use super::loop_runner::RunConfig;

pub(crate) type ScenarioResult<T> = Result<T, String>;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Scenario {
    pub(crate) name: String,
    pub(crate) tuning: Tuning,
    pub(crate) viewport: Viewport,
    pub(crate) spawn_point: Vec2,
    pub(crate) primary_class: HeroClass,
    pub(crate) level: Option<LevelSource>,
    pub(crate) enemies: Vec<EnemySpawn>,
    pub(crate) run: RunConfig,
    pub(crate) script: Vec<ScriptStep>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            tuning: Tuning::default(),
            viewport: Viewport {
                width: 1024.0,
                height: 768.0,
            },
            spawn_point: Vec2::ZERO,
            primary_class: HeroClass::Warrior,
            level: None,
            enemies: Vec::new(),
            run: RunConfig::default(),
            script: Vec::new(),
        }
    }
}

/// PNG level image. Relative paths resolve against the scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LevelSource {
    pub(crate) path: PathBuf,
    pub(crate) cell_size: f32,
    #[serde(default)]
    pub(crate) spawn_from_markers: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EnemySpawn {
    pub(crate) kind: EnemyKind,
    pub(crate) position: Vec2,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptStep {
    pub(crate) tick: u64,
    #[serde(default)]
    pub(crate) player: usize,
    pub(crate) action: ScriptAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ScriptAction {
    Connect {
        class: HeroClass,
    },
    Disconnect,
    PressAt {
        location: Vec2,
        #[serde(default)]
        attack: bool,
    },
    DragTo {
        location: Vec2,
    },
    Release,
    MoveDirection {
        direction: Vec2,
    },
    Flags {
        #[serde(default)]
        forward: bool,
        #[serde(default)]
        back: bool,
        #[serde(default)]
        left: bool,
        #[serde(default)]
        right: bool,
    },
    Fire {
        active: bool,
    },
    Stop,
}

impl ScriptAction {
    fn steers_by_location(&self) -> bool {
        matches!(
            self,
            ScriptAction::PressAt { .. } | ScriptAction::DragTo { .. } | ScriptAction::Release
        )
    }
}

pub(crate) struct World {
    pub(crate) sim: Simulation,
    pub(crate) players: Players,
}

pub(crate) fn load_scenario(path: &Path) -> ScenarioResult<Scenario> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read scenario '{}': {error}", path.display()))?;
    let mut scenario = parse_scenario_json(&raw)?;
    if let (Some(level), Some(base_dir)) = (scenario.level.as_mut(), path.parent()) {
        if level.path.is_relative() {
            level.path = base_dir.join(&level.path);
        }
    }
    validate_scenario(&scenario)?;
    info!(
        path = %path.display(),
        scenario = %scenario.name,
        enemies = scenario.enemies.len(),
        script_steps = scenario.script.len(),
        "scenario_loaded"
    );
    Ok(scenario)
}

pub(crate) fn parse_scenario_json(raw: &str) -> ScenarioResult<Scenario> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, Scenario>(&mut deserializer) {
        Ok(scenario) => Ok(scenario),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse scenario json: {source}"))
            } else {
                Err(format!("parse scenario json at {path}: {source}"))
            }
        }
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

fn require_finite_point(path: &str, point: Vec2) -> ScenarioResult<()> {
    if !point.x.is_finite() {
        return Err(expected_actual(&format!("{path}.x"), "finite number", point.x));
    }
    if !point.y.is_finite() {
        return Err(expected_actual(&format!("{path}.y"), "finite number", point.y));
    }
    Ok(())
}

pub(crate) fn validate_scenario(scenario: &Scenario) -> ScenarioResult<()> {
    scenario
        .tuning
        .validate()
        .map_err(|error| validation_err("tuning", error.to_string()))?;

    let min_extent = scenario.tuning.camera_margin * 2.0;
    let viewport = scenario.viewport;
    if !(viewport.width.is_finite() && viewport.width >= min_extent) {
        return Err(expected_actual(
            "viewport.width",
            format!("at least {min_extent}"),
            viewport.width,
        ));
    }
    if !(viewport.height.is_finite() && viewport.height >= min_extent) {
        return Err(expected_actual(
            "viewport.height",
            format!("at least {min_extent}"),
            viewport.height,
        ));
    }
    require_finite_point("spawn_point", scenario.spawn_point)?;

    if let Some(level) = &scenario.level {
        if !(level.cell_size.is_finite() && level.cell_size > 0.0) {
            return Err(expected_actual(
                "level.cell_size",
                "positive number",
                level.cell_size,
            ));
        }
    }

    for (index, enemy) in scenario.enemies.iter().enumerate() {
        require_finite_point(&format!("enemies[{index}].position"), enemy.position)?;
    }

    let run = &scenario.run;
    if run.ticks_per_second == 0 {
        return Err(expected_actual("run.ticks_per_second", "at least 1", 0));
    }
    if !(run.stall_seconds.is_finite() && run.stall_seconds >= 0.0) {
        return Err(expected_actual(
            "run.stall_seconds",
            "non-negative number",
            run.stall_seconds,
        ));
    }
    for (field, value) in [
        ("run.attack_animation_seconds", run.attack_animation_seconds),
        ("run.death_animation_seconds", run.death_animation_seconds),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(expected_actual(field, "non-negative number", value));
        }
    }

    for (index, step) in scenario.script.iter().enumerate() {
        validate_script_step(index, step)?;
    }
    Ok(())
}

fn validate_script_step(index: usize, step: &ScriptStep) -> ScenarioResult<()> {
    let player_path = format!("script[{index}].player");
    if step.player >= PLAYER_SLOTS {
        return Err(expected_actual(
            &player_path,
            format!("slot below {PLAYER_SLOTS}"),
            step.player,
        ));
    }
    let primary = PlayerIndex(step.player).is_primary();
    match step.action {
        ScriptAction::Connect { .. } | ScriptAction::Disconnect if primary => Err(validation_err(
            &player_path,
            "the primary player is always connected",
        )),
        action if action.steers_by_location() && !primary => Err(expected_actual(
            &player_path,
            "primary player for location steering",
            step.player,
        )),
        ScriptAction::PressAt { location, .. } | ScriptAction::DragTo { location } => {
            require_finite_point(&format!("script[{index}].action.location"), location)
        }
        ScriptAction::MoveDirection { direction } => {
            require_finite_point(&format!("script[{index}].action.direction"), direction)
        }
        _ => Ok(()),
    }
}

pub(crate) fn build_world(scenario: &Scenario) -> ScenarioResult<World> {
    let mut sim = Simulation::new(scenario.tuning.clone(), scenario.viewport)
        .map_err(|error| format!("build simulation: {error}"))?;
    sim.set_spawn_point(scenario.spawn_point);

    if let Some(level) = &scenario.level {
        let map = LevelMap::load_png(&level.path, level.cell_size)
            .map_err(|error| format!("load level: {error}"))?;
        if level.spawn_from_markers {
            let layout = map.scan_layout();
            if let Some(spawn) = layout.hero_spawns.first() {
                sim.set_spawn_point(*spawn);
            }
            for position in &layout.generators {
                sim.spawn_enemy(EnemyKind::Cave, *position);
            }
            for position in &layout.bosses {
                sim.spawn_enemy(EnemyKind::Boss, *position);
            }
            info!(
                hero_spawns = layout.hero_spawns.len(),
                generators = layout.generators.len(),
                bosses = layout.bosses.len(),
                wall_cells = layout.wall_cells,
                "level_markers_applied"
            );
        }
        sim.set_line_of_sight(Box::new(map));
    }

    for enemy in &scenario.enemies {
        sim.spawn_enemy(enemy.kind, enemy.position);
    }

    let mut players = Players::new(scenario.primary_class, scenario.tuning.start_lives);
    sim.spawn_hero_for(&mut players, PlayerIndex::PRIMARY)
        .map_err(|error| format!("spawn primary hero: {error}"))?;

    info!(
        scenario = %scenario.name,
        entities = sim.entities().count(),
        spawn_x = sim.spawn_point().x,
        spawn_y = sim.spawn_point().y,
        "world_built"
    );
    Ok(World { sim, players })
}

pub(crate) fn apply_script_step(world: &mut World, step: &ScriptStep) -> ScenarioResult<()> {
    let index = PlayerIndex(step.player);
    match step.action {
        ScriptAction::Connect { class } => {
            let hero = world
                .sim
                .connect_player(&mut world.players, index, class)
                .map_err(|error| format!("script tick {}: {error}", step.tick))?;
            info!(player = index.0, hero = hero.0, "player_connected");
            return Ok(());
        }
        ScriptAction::Disconnect => {
            world
                .players
                .disconnect(index)
                .map_err(|error| format!("script tick {}: {error}", step.tick))?;
            info!(player = index.0, "player_disconnected");
            return Ok(());
        }
        _ => {}
    }

    let player = world.players.connected_mut(index).ok_or_else(|| {
        format!(
            "script tick {}: player slot {index} is not connected",
            step.tick
        )
    })?;
    let intent = &mut player.intent;
    match step.action {
        ScriptAction::PressAt { location, attack } => intent.press_at(location, attack),
        ScriptAction::DragTo { location } => intent.drag_to(location),
        ScriptAction::Release => intent.release(),
        ScriptAction::MoveDirection { direction } => intent.set_move_direction(direction),
        ScriptAction::Flags {
            forward,
            back,
            left,
            right,
        } => {
            intent.flags = DirectionFlags {
                forward,
                back,
                left,
                right,
            };
        }
        ScriptAction::Fire { active } => intent.fire = active,
        ScriptAction::Stop => {
            intent.move_direction = Vec2::ZERO;
            intent.flags = DirectionFlags::default();
            intent.fire = false;
            intent.move_requested = false;
        }
        ScriptAction::Connect { .. } | ScriptAction::Disconnect => {}
    }
    Ok(())
}

/// A small cave level with a wandering boss, used when no scenario file is given.
pub(crate) fn demo_scenario() -> Scenario {
    let step = |tick: u64, player: usize, action: ScriptAction| ScriptStep {
        tick,
        player,
        action,
    };
    Scenario {
        name: "demo".to_string(),
        enemies: vec![
            EnemySpawn {
                kind: EnemyKind::Cave,
                position: Vec2::new(900.0, 300.0),
            },
            EnemySpawn {
                kind: EnemyKind::Cave,
                position: Vec2::new(-800.0, -600.0),
            },
            EnemySpawn {
                kind: EnemyKind::Boss,
                position: Vec2::new(1400.0, -200.0),
            },
            EnemySpawn {
                kind: EnemyKind::Goblin,
                position: Vec2::new(300.0, 120.0),
            },
            EnemySpawn {
                kind: EnemyKind::Goblin,
                position: Vec2::new(-250.0, -80.0),
            },
        ],
        run: RunConfig {
            ticks: 900,
            stall_ticks: vec![450],
            ..RunConfig::default()
        },
        script: vec![
            step(
                30,
                0,
                ScriptAction::PressAt {
                    location: Vec2::new(400.0, 0.0),
                    attack: false,
                },
            ),
            step(
                120,
                0,
                ScriptAction::PressAt {
                    location: Vec2::new(300.0, 120.0),
                    attack: true,
                },
            ),
            step(180, 0, ScriptAction::Release),
            step(
                200,
                1,
                ScriptAction::Connect {
                    class: HeroClass::Archer,
                },
            ),
            step(
                200,
                1,
                ScriptAction::MoveDirection {
                    direction: Vec2::new(1.0, 0.2),
                },
            ),
            step(260, 1, ScriptAction::Fire { active: true }),
            step(
                320,
                0,
                ScriptAction::Flags {
                    forward: true,
                    back: false,
                    left: true,
                    right: false,
                },
            ),
            step(400, 0, ScriptAction::Stop),
            step(600, 1, ScriptAction::Stop),
            step(700, 1, ScriptAction::Disconnect),
        ],
        ..Scenario::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::EntityKind;

    #[test]
    fn empty_document_takes_defaults_and_validates() {
        let scenario = parse_scenario_json("{}").expect("parse");

        assert_eq!(scenario.name, "unnamed");
        assert_eq!(scenario.primary_class, HeroClass::Warrior);
        assert!(scenario.enemies.is_empty());
        validate_scenario(&scenario).expect("valid");
    }

    #[test]
    fn parse_error_reports_json_path() {
        let raw = r#"{
            "enemies": [
                { "kind": "goblin", "position": { "x": 1.0, "y": 2.0 } },
                { "kind": "dragon", "position": { "x": 1.0, "y": 2.0 } }
            ]
        }"#;

        let error = parse_scenario_json(raw).expect_err("unknown kind");

        assert!(
            error.starts_with("parse scenario json at enemies[1].kind:"),
            "{error}"
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = parse_scenario_json(r#"{ "enemys": [] }"#).expect_err("typo");

        assert!(error.contains("unknown field"), "{error}");
    }

    #[test]
    fn script_actions_parse_from_tagged_objects() {
        let raw = r#"{
            "primary_class": "Archer",
            "script": [
                { "tick": 3, "action": { "type": "press_at", "location": { "x": 5.0, "y": 6.0 } } },
                { "tick": 4, "player": 2, "action": { "type": "flags", "forward": true } },
                { "tick": 5, "player": 2, "action": { "type": "connect", "class": "Warrior" } }
            ]
        }"#;

        let scenario = parse_scenario_json(raw).expect("parse");

        assert_eq!(scenario.primary_class, HeroClass::Archer);
        assert_eq!(
            scenario.script[0].action,
            ScriptAction::PressAt {
                location: Vec2::new(5.0, 6.0),
                attack: false
            }
        );
        assert_eq!(scenario.script[1].player, 2);
        assert_eq!(
            scenario.script[1].action,
            ScriptAction::Flags {
                forward: true,
                back: false,
                left: false,
                right: false
            }
        );
    }

    #[test]
    fn validation_rejects_connecting_the_primary_player() {
        let scenario = Scenario {
            script: vec![ScriptStep {
                tick: 0,
                player: 0,
                action: ScriptAction::Disconnect,
            }],
            ..Scenario::default()
        };

        let error = validate_scenario(&scenario).expect_err("primary disconnect");

        assert_eq!(
            error,
            "validation failed at script[0].player: the primary player is always connected"
        );
    }

    #[test]
    fn validation_rejects_location_steering_for_other_players() {
        let scenario = Scenario {
            script: vec![ScriptStep {
                tick: 0,
                player: 2,
                action: ScriptAction::Release,
            }],
            ..Scenario::default()
        };

        let error = validate_scenario(&scenario).expect_err("secondary release");

        assert!(error.starts_with("validation failed at script[0].player"), "{error}");
    }

    #[test]
    fn validation_reports_tuning_and_viewport_problems() {
        let mut scenario = Scenario::default();
        scenario.tuning.boss_chase.chase_radius = -1.0;
        let tuning_error = validate_scenario(&scenario).expect_err("tuning");

        let mut narrow = Scenario::default();
        narrow.viewport.width = 300.0;
        let viewport_error = validate_scenario(&narrow).expect_err("viewport");

        assert_eq!(
            tuning_error,
            "validation failed at tuning: boss_chase.chase_radius must be finite and non-negative, got -1"
        );
        assert_eq!(
            viewport_error,
            "validation failed at viewport.width: expected at least 512, got 300"
        );
    }

    #[test]
    fn load_scenario_resolves_level_path_next_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cave.json");
        fs::write(
            &path,
            r#"{ "name": "cave", "level": { "path": "cave.png", "cell_size": 32.0 } }"#,
        )
        .expect("write scenario");

        let scenario = load_scenario(&path).expect("load");
        let level = scenario.level.as_ref().expect("level");
        assert_eq!(level.path, dir.path().join("cave.png"));

        let error = build_world(&scenario).err().expect("missing png");
        assert!(error.starts_with("load level: failed to open level map"), "{error}");
    }

    #[test]
    fn load_scenario_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = load_scenario(&dir.path().join("absent.json")).expect_err("missing");

        assert!(error.starts_with("read scenario '"), "{error}");
    }

    #[test]
    fn demo_world_has_enemies_and_primary_hero() {
        let scenario = demo_scenario();
        validate_scenario(&scenario).expect("demo is valid");

        let world = build_world(&scenario).expect("world");

        assert_eq!(world.sim.entities().count(), scenario.enemies.len() + 1);
        let hero = world.players.primary().hero.expect("primary hero");
        assert_eq!(world.sim.entity(hero).map(|entity| entity.position), Some(Vec2::ZERO));
    }

    #[test]
    fn script_steps_drive_player_intents() {
        let mut world = build_world(&Scenario::default()).expect("world");

        apply_script_step(
            &mut world,
            &ScriptStep {
                tick: 0,
                player: 2,
                action: ScriptAction::Connect {
                    class: HeroClass::Archer,
                },
            },
        )
        .expect("connect");
        apply_script_step(
            &mut world,
            &ScriptStep {
                tick: 0,
                player: 0,
                action: ScriptAction::PressAt {
                    location: Vec2::new(10.0, 0.0),
                    attack: false,
                },
            },
        )
        .expect("press");
        let missing = apply_script_step(
            &mut world,
            &ScriptStep {
                tick: 7,
                player: 3,
                action: ScriptAction::Fire { active: true },
            },
        );

        assert!(world
            .players
            .get(PlayerIndex(2))
            .and_then(|player| player.hero)
            .is_some());
        assert!(world.players.primary().intent.move_requested);
        assert_eq!(
            missing,
            Err("script tick 7: player slot 3 is not connected".to_string())
        );
    }

    #[test]
    fn reconnecting_player_gets_back_the_hero_it_left() {
        let mut world = build_world(&Scenario::default()).expect("world");
        let step = |tick: u64, action: ScriptAction| ScriptStep {
            tick,
            player: 1,
            action,
        };
        let connect = ScriptAction::Connect {
            class: HeroClass::Archer,
        };

        apply_script_step(&mut world, &step(0, connect)).expect("connect");
        apply_script_step(&mut world, &step(1, connect)).expect("connect again");
        apply_script_step(&mut world, &step(2, ScriptAction::Disconnect)).expect("disconnect");
        let while_away = apply_script_step(&mut world, &step(3, ScriptAction::Fire { active: true }));
        apply_script_step(&mut world, &step(4, connect)).expect("reconnect");

        assert_eq!(
            while_away,
            Err("script tick 3: player slot 1 is not connected".to_string())
        );
        let owned = world
            .sim
            .entities()
            .filter(|entity| {
                entity.is_active()
                    && matches!(
                        entity.kind,
                        EntityKind::Hero {
                            player: PlayerIndex(1),
                            ..
                        }
                    )
            })
            .count();
        assert_eq!(owned, 1);
        assert_eq!(world.players.connected_indices().len(), 2);
    }
}
