use crate::entities::{crystal, scaled, walker};
use crate::entity_array::{ArrayError, Record, Slot};
use crate::particles::EffectKind;
use crate::physics_core::{Axis, EcmBody, TileProbe};
use crate::world::WorldState;

const FIREBALL_LIFETIME: u32 = 90;

#[derive(Clone, Debug, Default)]
pub struct Fireball {
    pub slot: Slot,
    pub body: EcmBody,
    pub life: u32,
}

impl_record!(Fireball);

/// Launches a fireball centred on `(x, y)` travelling in `dir`.
pub fn launch(world: &mut WorldState, x: f32, y: f32, dir: f32) -> Result<(), ArrayError> {
    let ts = world.config.tile_size;
    let (w, h) = scaled(ts, 0.25, 0.25);
    let mut body = EcmBody::new(x - w * 0.5, y - h * 0.5, w, h);
    body.hsp = dir * ts * 0.25;
    world.fireballs.add(Fireball {
        body,
        life: FIREBALL_LIFETIME,
        ..Default::default()
    })?;
    Ok(())
}

/// Flies straight; burns out on walls, on the first enemy hit or with age.
pub fn update(world: &mut WorldState) {
    let probe = TileProbe::new(&world.map, &world.config);
    let mut expired = Vec::new();
    let mut walker_hits = Vec::new();
    let mut crystal_hits = Vec::new();

    for fireball in world.fireballs.iter_mut() {
        if !fireball.is_live() {
            continue;
        }
        fireball.life = fireball.life.saturating_sub(1);
        let hit_wall = probe.move_axis(&mut fireball.body, Axis::Horizontal).collided();
        let index = fireball.slot.index;
        if let Some(target) = world.walkers.live().find(|w| w.body.overlaps(&fireball.body)) {
            walker_hits.push(target.slot.index);
            expired.push(index);
        } else if let Some(target) = world.crystals.live().find(|c| c.body.overlaps(&fireball.body)) {
            crystal_hits.push(target.slot.index);
            expired.push(index);
        } else if hit_wall || fireball.life == 0 {
            expired.push(index);
        }
    }

    for index in expired {
        if let Some((x, y)) = world.fireballs.get(index).map(|f| f.body.center()) {
            world.fireballs.mark_delete(index);
            world.spawn_effect(EffectKind::Fizzle, x, y);
        }
    }
    for index in walker_hits {
        walker::damage(world, index, 1);
    }
    for index in crystal_hits {
        crystal::shatter(world, index);
    }
}
