use crate::barrier::BarrierTag;
use crate::components::TILE_SPIKE;
use crate::entities::{player, scaled};
use crate::entity_array::{ArrayError, Record, Slot};
use crate::events::GameEventKind;
use crate::particles::EffectKind;
use crate::physics_core::{apply_gravity, land, Axis, EcmBody, TileProbe};
use crate::spawn::SpawnContext;
use crate::tilemap::VoidValue;
use crate::world::WorldState;

const WALKER_HP: i32 = 2;

/// Patrolling enemy. Carries a barrier tag taken from its void rect.
#[derive(Clone, Debug, Default)]
pub struct Walker {
    pub slot: Slot,
    pub body: EcmBody,
    pub dir: f32,
    pub hp: i32,
    pub tag: BarrierTag,
    pub origin: Option<(usize, usize)>,
}

impl_record!(Walker);

pub fn spawn(world: &mut WorldState, ctx: &SpawnContext) -> Result<(), ArrayError> {
    let ts = world.config.tile_size;
    let (w, h) = scaled(ts, 0.75, 0.625);
    let tag = ctx
        .aux
        .as_ref()
        .and_then(VoidValue::as_int)
        .map(BarrierTag::from_aux)
        .unwrap_or_default();
    world.walkers.add(Walker {
        body: EcmBody::on_tile_floor(ctx.x, ctx.y, ts, w, h),
        dir: -1.0,
        hp: WALKER_HP,
        tag,
        origin: Some(ctx.cell),
        ..Default::default()
    })?;
    Ok(())
}

pub fn holds_tag(world: &WorldState, tag: BarrierTag) -> bool {
    world.walkers.live().any(|w| w.tag == tag)
}

/// Vertical first, then horizontal; turns around at walls.
pub fn update(world: &mut WorldState) {
    let config = &world.config;
    let probe = TileProbe::new(&world.map, config);
    let speed = config.move_speed * 0.5;
    let floor_limit = (world.map.height() as f32 + 2.0) * config.tile_size;
    let player_box = world.player.body.hitbox();
    let mut doomed = Vec::new();
    let mut touched_player = false;

    for walker in world.walkers.iter_mut() {
        if !walker.is_live() {
            continue;
        }
        apply_gravity(&mut walker.body, config.gravity, config.max_fall_speed);
        if probe.move_axis(&mut walker.body, Axis::Vertical).collided() {
            land(&mut walker.body);
        }
        walker.body.hsp = walker.dir * speed;
        if probe.move_axis(&mut walker.body, Axis::Horizontal).collided() {
            walker.body.hsp = 0.0;
            walker.dir = -walker.dir;
        }

        let on_spike = !probe
            .rect_collides_with_flag(walker.body.hitbox(), TILE_SPIKE)
            .is_air();
        if on_spike || walker.body.y > floor_limit {
            doomed.push(walker.slot.index);
        } else if walker.body.hitbox().overlaps(&player_box) {
            touched_player = true;
        }
    }

    for index in doomed {
        kill(world, index);
    }
    if touched_player {
        player::hurt(world);
    }
}

pub fn damage(world: &mut WorldState, index: usize, amount: i32) {
    let Some(walker) = world.walkers.get_mut(index) else {
        return;
    };
    if !walker.is_live() {
        return;
    }
    walker.hp -= amount;
    if walker.hp <= 0 {
        kill(world, index);
    }
}

/// Marks the walker for removal and asks for its tag to be re-checked.
pub fn kill(world: &mut WorldState, index: usize) {
    let Some(walker) = world.walkers.get(index).filter(|w| w.is_live()) else {
        return;
    };
    let (x, y) = walker.body.center();
    let tag = walker.tag;
    let origin = walker.origin;
    world.walkers.mark_delete(index);
    world.consume_spawn_cell(origin);
    world.spawn_effect(EffectKind::EnemyDeath, x, y);
    world.events.emit(GameEventKind::EntityDestroyed {
        kind: "walker".to_string(),
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
    use crate::world::tests::world_with_map;

    const PEN: &str = "8x4\n\
                       ########\n\
                       #.....w#\n\
                       #......#\n\
                       ########\n\
                       #vr 6 1 1 1 4\n";

    #[test]
    fn walker_takes_tag_from_void_rect() {
        let world = world_with_map(PEN);
        assert_eq!(world.walkers.len(), 1);
        let walker = world.walkers.get(0).unwrap();
        assert_eq!(walker.tag, BarrierTag(4));
        assert_eq!(walker.origin, Some((6, 1)));
        assert!(holds_tag(&world, BarrierTag(4)));
        assert!(!holds_tag(&world, BarrierTag(5)));
    }

    #[test]
    fn walker_turns_at_walls() {
        let mut world = world_with_map(PEN);
        world.player.place(-500.0, -500.0);
        for _ in 0..400 {
            update(&mut world);
        }
        let walker = world.walkers.get(0).unwrap();
        assert!(walker.is_live());
        assert!(walker.body.x >= 32.0);
        assert!(walker.body.x + walker.body.w < 224.0);
    }

    #[test]
    fn killing_a_walker_queues_its_tag_once() {
        let mut world = world_with_map(PEN);
        world.barrier_requests.clear();
        damage(&mut world, 0, 1);
        assert!(world.walkers.get(0).unwrap().is_live());
        damage(&mut world, 0, 1);
        assert!(!world.walkers.get(0).unwrap().is_live());
        assert!(world.barrier_requests.contains(BarrierTag(4)));
        kill(&mut world, 0);
        assert_eq!(world.barrier_requests.len(), 1);
        assert!(!holds_tag(&world, BarrierTag(4)));
        assert_eq!(world.map.entity_tiles.active_kind(6, 1), None);
    }
}
