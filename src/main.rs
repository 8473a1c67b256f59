mod barrier;
mod camera;
mod collector;
mod components;
mod editor;
mod entities;
mod entity_array;
mod events;
mod map_format;
mod particles;
mod persistence;
mod physics_core;
mod simulation;
mod spawn;
mod tilemap;
mod world;

use bevy::prelude::*;
use components::GameConfig;
use editor::EditError;
use entities::player::PlayerInput;
use map_format::MapError;
use persistence::SaveError;
use world::{LoadMode, WorldState};

const DEFAULT_MAP: &str = "maps/start.map";

fn load_game_config() -> GameConfig {
    let path = std::env::var("TILEWORLD_GAME_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "game.json".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<GameConfig>(&contents) {
            Ok(cfg) => {
                println!("[Tileworld] Loaded game config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[Tileworld] Failed to parse {}: {}", path, e);
                GameConfig::default()
            }
        },
        Err(_) => GameConfig::default(),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// `--hold right,jump` keeps those buttons pressed for the whole run.
fn held_input(buttons: Option<&str>) -> PlayerInput {
    let mut input = PlayerInput::default();
    for button in buttons.unwrap_or_default().split(',').map(str::trim) {
        match button {
            "left" => input.left = true,
            "right" => input.right = true,
            "jump" => input.jump = true,
            "fire" => input.fire = true,
            "up" => input.up = true,
            "" => {}
            other => eprintln!("[Tileworld] Ignoring unknown button '{}'", other),
        }
    }
    input
}

/// Reopens `map` for editing and runs the command file against it.
fn edit_with_script(world: &mut WorldState, map: &str, script: &str) -> Result<usize, EditError> {
    let source = std::fs::read_to_string(script).map_err(MapError::from)?;
    world.load_map(map, LoadMode::Edit)?;
    editor::run_script(world, &source)
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let config = load_game_config();

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(bevy::log::LogPlugin::default())
        .insert_resource(Time::<Fixed>::from_hz(60.0));

    let mut world = match WorldState::new(config) {
        Ok(world) => world,
        Err(e) => {
            error!("[Tileworld] Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let map = flag_value(&args, "--map").unwrap_or(DEFAULT_MAP);
    let loaded = match flag_value(&args, "--load") {
        Some(save) => match persistence::load_game(&mut world, save) {
            Err(e) if e.is_recoverable() => {
                warn!("[Tileworld] Ignoring save {} ({}), starting {}", save, e, map);
                world.load_map(map, LoadMode::Play).map_err(SaveError::from)
            }
            other => other,
        },
        None => world.load_map(map, LoadMode::Play).map_err(SaveError::from),
    };
    match loaded {
        Ok(report) if !report.diagnostics.is_empty() => {
            warn!("[Tileworld] Map loaded with {} diagnostics", report.diagnostics.len());
        }
        Ok(_) => {}
        Err(e) => {
            error!("[Tileworld] Could not start: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(script) = flag_value(&args, "--edit") {
        let map = world.map.path.clone();
        match edit_with_script(&mut world, &map, script) {
            Ok(applied) => info!("[Tileworld] Applied {} edit command(s) to {}", applied, map),
            Err(e) => {
                error!("[Tileworld] Editing {} failed: {}", map, e);
                std::process::exit(1);
            }
        }
    }

    if let Some(out) = flag_value(&args, "--normalize") {
        let map = world.map.path.clone();
        let saved = world
            .load_map(&map, LoadMode::Edit)
            .map_err(EditError::from)
            .and_then(|_| editor::save(&world, out));
        match saved {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => warn!("[Tileworld] Nothing written for {}: {}", map, e),
            Err(e) => {
                error!("[Tileworld] Could not rewrite {}: {}", map, e);
                std::process::exit(1);
            }
        }
        return;
    }

    app.insert_resource(world)
        .insert_resource(held_input(flag_value(&args, "--hold")))
        .add_plugins(simulation::SimulationPlugin);

    let Some(frames) = flag_value(&args, "--frames").and_then(|n| n.parse::<u64>().ok()) else {
        app.run();
        return;
    };

    for _ in 0..frames {
        app.world_mut().run_schedule(FixedUpdate);
    }
    let world = app.world().resource::<WorldState>();
    info!(
        "[Tileworld] Ran {} frames on {}: hp {}, coins {}",
        frames, world.map.path, world.player.hp, world.player.coins
    );
    if let Some(path) = flag_value(&args, "--save") {
        match persistence::save_game(world, path) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => warn!("[Tileworld] Save to {} skipped: {}", path, e),
            Err(e) => {
                error!("[Tileworld] Could not save to {}: {}", path, e);
                std::process::exit(1);
            }
        }
    }
    if args.iter().any(|a| a == "--events") {
        println!("{}", world.events.to_json_lines());
    }
}
