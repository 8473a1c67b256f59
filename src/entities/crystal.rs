use crate::barrier::BarrierTag;
use crate::entities::scaled;
use crate::entity_array::{ArrayError, Record, Slot};
use crate::events::GameEventKind;
use crate::particles::EffectKind;
use crate::physics_core::EcmBody;
use crate::spawn::SpawnContext;
use crate::tilemap::VoidValue;
use crate::world::WorldState;

/// Static carrier. One fireball shatters it.
#[derive(Clone, Debug, Default)]
pub struct Crystal {
    pub slot: Slot,
    pub body: EcmBody,
    pub tag: BarrierTag,
    pub origin: Option<(usize, usize)>,
}

impl_record!(Crystal);

pub fn spawn(world: &mut WorldState, ctx: &SpawnContext) -> Result<(), ArrayError> {
    let ts = world.config.tile_size;
    let (w, h) = scaled(ts, 0.625, 0.75);
    let tag = ctx
        .aux
        .as_ref()
        .and_then(VoidValue::as_int)
        .map(BarrierTag::from_aux)
        .unwrap_or_default();
    world.crystals.add(Crystal {
        body: EcmBody::on_tile_floor(ctx.x, ctx.y, ts, w, h),
        tag,
        origin: Some(ctx.cell),
        ..Default::default()
    })?;
    Ok(())
}

pub fn holds_tag(world: &WorldState, tag: BarrierTag) -> bool {
    world.crystals.live().any(|c| c.tag == tag)
}

pub fn shatter(world: &mut WorldState, index: usize) {
    let Some(crystal) = world.crystals.get(index).filter(|c| c.is_live()) else {
        return;
    };
    let (x, y) = crystal.body.center();
    let tag = crystal.tag;
    let origin = crystal.origin;
    world.crystals.mark_delete(index);
    world.consume_spawn_cell(origin);
    world.spawn_effect(EffectKind::CrystalShatter, x, y);
    world.events.emit(GameEventKind::EntityDestroyed {
        kind: "crystal".to_string(),
        x,
        y,
    });
    if !tag.is_none() {
        let _ = world.send_check_request(tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::fireball;
    use crate::world::tests::world_with_map;

    const VAULT: &str = "8x3\n\
                         ########\n\
                         #.P..c.#\n\
                         ########\n\
                         #vr 5 1 1 1 -3\n";

    #[test]
    fn fireball_shatters_crystal_and_queues_tag() {
        let mut world = world_with_map(VAULT);
        assert!(holds_tag(&world, BarrierTag(-3)));
        world.barrier_requests.clear();
        let (x, y) = world.player.body.center();
        fireball::launch(&mut world, x, y, 1.0).unwrap();
        for _ in 0..30 {
            fireball::update(&mut world);
        }
        assert!(!holds_tag(&world, BarrierTag(-3)));
        assert!(world.barrier_requests.contains(BarrierTag(-3)));
        assert_eq!(
            world.events.count(|e| matches!(e, GameEventKind::EntityDestroyed { kind, .. } if kind == "crystal")),
            1
        );
    }
}
