use bevy::log::{info, warn};

use crate::barrier::BarrierTag;
use crate::components::TileId;
use crate::entity_array::{ArrayError, Slot};
use crate::events::GameEventKind;
use crate::particles::EffectKind;
use crate::spawn::SpawnContext;
use crate::tilemap::VoidValue;
use crate::world::WorldState;

/// Solid block that stays until no carrier holds its tag.
#[derive(Clone, Debug, Default)]
pub struct Barrier {
    pub slot: Slot,
    pub cell: (usize, usize),
    pub tag: BarrierTag,
}

impl_record!(Barrier);

pub fn spawn(world: &mut WorldState, ctx: &SpawnContext) -> Result<(), ArrayError> {
    let tag = ctx
        .aux
        .as_ref()
        .and_then(VoidValue::as_int)
        .map(BarrierTag::from_aux)
        .unwrap_or_default();
    world.barriers.add(Barrier {
        cell: ctx.cell,
        tag,
        ..Default::default()
    })?;
    let block = world.config.barrier_tile_id();
    world.map.tiles.set(ctx.cell.0, ctx.cell.1, block);
    if tag.is_none() {
        warn!(
            "[Tileworld barrier] Barrier at {:?} has no tag and will never open",
            ctx.cell
        );
    } else {
        // Opens on the first tick if every carrier was already consumed.
        let _ = world.send_check_request(tag);
    }
    Ok(())
}

/// Removes every live barrier carrying `tag` and frees its cell.
pub fn destroy_tagged(world: &mut WorldState, tag: BarrierTag) -> usize {
    let doomed: Vec<(usize, (usize, usize))> = world
        .barriers
        .live()
        .filter(|b| b.tag == tag)
        .map(|b| (b.slot.index, b.cell))
        .collect();
    let ts = world.config.tile_size;
    for &(index, (cx, cy)) in &doomed {
        world.barriers.mark_delete(index);
        world.map.tiles.set(cx, cy, TileId::AIR);
        world.consume_spawn_cell(Some((cx, cy)));
        world.spawn_effect(
            EffectKind::BarrierBreak,
            (cx as f32 + 0.5) * ts,
            (cy as f32 + 0.5) * ts,
        );
    }
    if !doomed.is_empty() {
        info!(
            "[Tileworld barrier] Tag {} released {} barrier(s)",
            tag.0,
            doomed.len()
        );
        world.events.emit(GameEventKind::BarrierOpened {
            tag: tag.0,
            count: doomed.len(),
        });
    }
    doomed.len()
}
