use bevy::prelude::*;

use crate::entities::player::PlayerInput;
use crate::world::{LoadMode, WorldState};

/// Runs one tick of the game on `FixedUpdate`. Every phase finishes before
/// the next one starts.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlayerInput>().add_systems(
            FixedUpdate,
            (
                update_entities,
                process_barrier_requests,
                clean_entity_arrays,
                apply_map_transition,
            )
                .chain()
                .run_if(in_play_mode),
        );
    }
}

fn in_play_mode(world: Option<Res<WorldState>>) -> bool {
    world.is_some_and(|w| w.mode == LoadMode::Play && w.map.is_loaded())
}

fn update_entities(mut world: ResMut<WorldState>, input: Res<PlayerInput>) {
    world.update_entities(&input);
}

fn process_barrier_requests(mut world: ResMut<WorldState>) {
    let opened = world.handle_check_requests();
    if opened > 0 {
        debug!("[Tileworld barrier] {} barrier(s) opened this tick", opened);
    }
}

fn clean_entity_arrays(mut world: ResMut<WorldState>) {
    world.clean_entity_arrays();
}

fn apply_map_transition(mut world: ResMut<WorldState>) {
    if let Some(Ok(report)) = world.apply_pending_map() {
        if report.spawn.dropped > 0 {
            warn!(
                "[Tileworld map] {} entities did not fit after the transition",
                report.spawn.dropped
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TileId;
    use crate::entities::walker;
    use crate::world::tests::world_with_map;

    const GATED: &str = "9x3\n\
                         #########\n\
                         #P....wB#\n\
                         #########\n\
                         #vr 6 1 2 1 2\n";

    fn app_with(world: WorldState) -> App {
        let mut app = App::new();
        app.insert_resource(world).add_plugins(SimulationPlugin);
        app
    }

    #[test]
    fn tick_opens_barrier_and_sweeps_arrays() {
        let mut world = world_with_map(GATED);
        walker::kill(&mut world, 0);
        let mut app = app_with(world);
        app.world_mut().run_schedule(FixedUpdate);

        let world = app.world().resource::<WorldState>();
        assert!(world.walkers.is_empty());
        assert!(world.barriers.is_empty());
        assert!(world.barrier_requests.is_empty());
        assert_eq!(world.map.tiles.tile(7, 1), Some(TileId::AIR));
        assert_eq!(world.events.frame, 1);
    }

    #[test]
    fn live_carrier_keeps_barrier_closed() {
        let mut app = app_with(world_with_map(GATED));
        for _ in 0..3 {
            app.world_mut().run_schedule(FixedUpdate);
        }
        let world = app.world().resource::<WorldState>();
        assert_eq!(world.barriers.len(), 1);
        assert_eq!(world.map.tiles.tile(7, 1), Some(world.config.barrier_tile_id()));
    }

    #[test]
    fn edit_mode_pauses_simulation() {
        let mut world = world_with_map(GATED);
        world
            .load_map_source("test.map", GATED, LoadMode::Edit)
            .unwrap();
        let mut app = app_with(world);
        app.world_mut().run_schedule(FixedUpdate);
        let world = app.world().resource::<WorldState>();
        assert_eq!(world.events.frame, 0);
        assert!(!world.barrier_requests.is_empty());
    }

    #[test]
    fn queued_transition_runs_after_the_tick() {
        let path = std::env::temp_dir().join(format!("tileworld-sim-{}.map", std::process::id()));
        std::fs::write(&path, "4x3\n####\n#P.#\n####\n").unwrap();
        let path = path.to_string_lossy().into_owned();

        let mut world = world_with_map(GATED);
        world.request_map(path.clone());
        let mut app = app_with(world);
        app.world_mut().run_schedule(FixedUpdate);

        let world = app.world().resource::<WorldState>();
        assert_eq!(world.map.path, path);
        assert!(world.walkers.is_empty());
        assert_eq!(world.pending_map, None);
        let _ = std::fs::remove_file(&path);
    }
}
