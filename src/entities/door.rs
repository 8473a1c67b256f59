use bevy::log::warn;

use crate::entities::player::PlayerInput;
use crate::entity_array::{ArrayError, Slot};
use crate::physics_core::EcmBody;
use crate::spawn::SpawnContext;
use crate::tilemap::VoidValue;
use crate::world::WorldState;

/// Leads to another map. Survives `reset_temporary`.
#[derive(Clone, Debug, Default)]
pub struct Door {
    pub slot: Slot,
    pub body: EcmBody,
    pub target: Option<String>,
}

impl_record!(Door);

pub fn spawn(world: &mut WorldState, ctx: &SpawnContext) -> Result<(), ArrayError> {
    let ts = world.config.tile_size;
    let target = ctx
        .aux
        .as_ref()
        .and_then(VoidValue::as_text)
        .map(str::to_string);
    if target.is_none() {
        warn!("[Tileworld door] Door at {:?} has no target map", ctx.cell);
    }
    world.doors.add(Door {
        body: EcmBody::new(ctx.x, ctx.y, ts, ts),
        target,
        ..Default::default()
    })?;
    Ok(())
}

/// Pressing up inside a door queues its target map.
pub fn update(world: &mut WorldState, input: &PlayerInput) {
    if !input.up {
        return;
    }
    let player_box = world.player.body.hitbox();
    let target = world
        .doors
        .iter()
        .filter(|d| d.body.hitbox().overlaps(&player_box))
        .find_map(|d| d.target.clone());
    if let Some(path) = target {
        world.request_map(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests::world_with_map;

    const LOBBY: &str = "5x3\n\
                         #####\n\
                         #PD.#\n\
                         #####\n\
                         #vr 2 1 1 1 maps/cellar.map\n";

    #[test]
    fn door_reads_target_from_void_rect() {
        let world = world_with_map(LOBBY);
        assert_eq!(world.doors.len(), 1);
        assert_eq!(world.doors.get(0).unwrap().target.as_deref(), Some("maps/cellar.map"));
    }

    #[test]
    fn pressing_up_in_doorway_requests_target() {
        let mut world = world_with_map(LOBBY);
        world.player.place(70.0, 40.0);
        update(&mut world, &PlayerInput::default());
        assert_eq!(world.pending_map, None);
        update(
            &mut world,
            &PlayerInput {
                up: true,
                ..Default::default()
            },
        );
        assert_eq!(world.pending_map.as_deref(), Some("maps/cellar.map"));
    }

    #[test]
    fn doors_survive_temporary_reset() {
        let mut world = world_with_map(LOBBY);
        world.reset_temporary();
        assert_eq!(world.doors.len(), 1);
    }
}
