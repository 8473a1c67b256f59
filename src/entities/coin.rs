use crate::entities::scaled;
use crate::entity_array::{ArrayError, Record, Slot};
use crate::events::GameEventKind;
use crate::particles::EffectKind;
use crate::physics_core::EcmBody;
use crate::spawn::SpawnContext;
use crate::world::WorldState;

#[derive(Clone, Debug, Default)]
pub struct Coin {
    pub slot: Slot,
    pub body: EcmBody,
    pub origin: Option<(usize, usize)>,
}

impl_record!(Coin);

pub fn spawn(world: &mut WorldState, ctx: &SpawnContext) -> Result<(), ArrayError> {
    let ts = world.config.tile_size;
    let (w, h) = scaled(ts, 0.5, 0.5);
    world.coins.add(Coin {
        body: EcmBody::new(ctx.x + (ts - w) * 0.5, ctx.y + (ts - h) * 0.5, w, h),
        origin: Some(ctx.cell),
        ..Default::default()
    })?;
    Ok(())
}

/// Touching a coin collects it and tops up one fireball charge.
pub fn update(world: &mut WorldState) {
    let player_box = world.player.body.hitbox();
    let touched: Vec<usize> = world
        .coins
        .live()
        .filter(|c| c.body.hitbox().overlaps(&player_box))
        .map(|c| c.slot.index)
        .collect();
    for index in touched {
        collect(world, index);
    }
}

fn collect(world: &mut WorldState, index: usize) {
    let Some(coin) = world.coins.get(index).filter(|c| c.is_live()) else {
        return;
    };
    let (x, y) = coin.body.center();
    let origin = coin.origin;
    world.coins.mark_delete(index);
    world.consume_spawn_cell(origin);

    let max_charges = world.config.max_fireball_charges;
    let player = &mut world.player;
    player.coins += 1;
    player.fireball_charges = (player.fireball_charges + 1).min(max_charges);
    let total = player.coins;

    world.spawn_effect(EffectKind::Sparkle, x, y);
    world.events.emit(GameEventKind::CoinCollected { total });
}
