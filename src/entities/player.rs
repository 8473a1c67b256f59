use bevy::prelude::*;

use crate::components::{GameConfig, TILE_SPIKE};
use crate::entities::{fireball, scaled};
use crate::entity_array::ArrayError;
use crate::events::GameEventKind;
use crate::particles::EffectKind;
use crate::physics_core::{apply_gravity, horizontal_velocity, land, Axis, EcmBody, TileProbe};
use crate::spawn::SpawnContext;
use crate::world::WorldState;

/// Buttons held this tick. Filled by whatever drives the simulation.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub fire: bool,
    pub up: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub body: EcmBody,
    pub hp: i32,
    pub max_hp: i32,
    pub fireball_charges: i32,
    pub coins: i32,
    pub facing: f32,
    pub grounded: bool,
    pub invulnerable: u32,
    fire_held: bool,
}

impl Player {
    pub fn new(config: &GameConfig) -> Self {
        let (w, h) = scaled(config.tile_size, 0.625, 0.875);
        Self {
            body: EcmBody::new(0.0, 0.0, w, h),
            hp: config.max_hp,
            max_hp: config.max_hp,
            fireball_charges: config.max_fireball_charges,
            coins: 0,
            facing: 1.0,
            grounded: false,
            invulnerable: 0,
            fire_held: false,
        }
    }

    pub fn place(&mut self, x: f32, y: f32) {
        self.body.x = x;
        self.body.y = y;
        self.body.hsp = 0.0;
        land(&mut self.body);
    }
}

pub fn spawn_start(world: &mut WorldState, ctx: &SpawnContext) -> Result<(), ArrayError> {
    let body = EcmBody::on_tile_floor(
        ctx.x,
        ctx.y,
        world.config.tile_size,
        world.player.body.w,
        world.player.body.h,
    );
    world.player.place(body.x, body.y);
    Ok(())
}

/// Horizontal first, then vertical.
pub fn update(world: &mut WorldState, input: &PlayerInput) {
    let config = &world.config;
    let probe = TileProbe::new(&world.map, config);
    let player = &mut world.player;
    player.invulnerable = player.invulnerable.saturating_sub(1);

    player.body.hsp = horizontal_velocity(input.left, input.right, config.move_speed);
    if player.body.hsp != 0.0 {
        player.facing = player.body.hsp.signum();
    }
    if input.jump && player.grounded {
        player.body.vsp = config.jump_velocity;
    }
    apply_gravity(&mut player.body, config.gravity, config.max_fall_speed);

    if probe.move_axis(&mut player.body, Axis::Horizontal).collided() {
        player.body.hsp = 0.0;
    }
    let falling = player.body.vsp >= 0.0;
    player.grounded = false;
    if probe.move_axis(&mut player.body, Axis::Vertical).collided() {
        player.grounded = falling;
        land(&mut player.body);
    }

    let on_spike = !probe
        .rect_collides_with_flag(player.body.hitbox(), TILE_SPIKE)
        .is_air();
    let fire = input.fire && !player.fire_held && player.fireball_charges > 0;
    player.fire_held = input.fire;
    let (cx, cy) = player.body.center();
    let facing = player.facing;

    if fire {
        match fireball::launch(world, cx, cy, facing) {
            Ok(()) => world.player.fireball_charges -= 1,
            Err(e) => debug!("[Tileworld player] Fireball not launched: {}", e),
        }
    }
    if on_spike {
        hurt(world);
    }
}

pub fn hurt(world: &mut WorldState) {
    if world.player.invulnerable > 0 {
        return;
    }
    world.player.hp -= 1;
    world.player.invulnerable = world.config.invulnerable_frames;
    let (x, y) = world.player.body.center();
    world.spawn_effect(EffectKind::Hurt, x, y);
    world.events.emit(GameEventKind::PlayerHurt {
        hp: world.player.hp,
    });
    if world.player.hp <= 0 {
        info!("[Tileworld player] Died, reloading {}", world.map.path);
        world.player.hp = world.player.max_hp;
        world.events.emit(GameEventKind::PlayerRespawned);
        let path = world.map.path.clone();
        world.request_map(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests::world_with_map;

    const ROOM: &str = "8x5\n\
                        ########\n\
                        #......#\n\
                        #.P....#\n\
                        #....^^#\n\
                        ########\n";

    #[test]
    fn player_start_places_player_on_floor() {
        let world = world_with_map(ROOM);
        let body = world.player.body;
        assert!(body.x > 64.0 && body.x + body.w < 96.0);
        assert!(body.y + body.h < 96.0);
    }

    #[test]
    fn player_settles_on_ground() {
        let mut world = world_with_map(ROOM);
        for _ in 0..60 {
            update(&mut world, &PlayerInput::default());
        }
        assert!(world.player.grounded);
        assert_eq!(world.player.body.vsp, 0.0);
        assert!(world.player.body.y + world.player.body.h < 128.0);
    }

    #[test]
    fn walking_into_a_wall_stops_flush() {
        let mut world = world_with_map(ROOM);
        let input = PlayerInput {
            left: true,
            ..Default::default()
        };
        for _ in 0..60 {
            update(&mut world, &input);
        }
        assert_eq!(world.player.body.x, 32.0);
        assert_eq!(world.player.facing, -1.0);
    }

    #[test]
    fn spikes_hurt_once_per_invulnerability_window() {
        let mut world = world_with_map(ROOM);
        let input = PlayerInput {
            right: true,
            ..Default::default()
        };
        for _ in 0..120 {
            update(&mut world, &input);
        }
        assert!(world.player.hp < world.player.max_hp);
        let hurt = world.events.count(|e| matches!(e, GameEventKind::PlayerHurt { .. }));
        assert!(hurt >= 1 && hurt <= 2);
    }

    #[test]
    fn fire_launches_one_fireball_per_press() {
        let mut world = world_with_map(ROOM);
        let charges = world.player.fireball_charges;
        let held = PlayerInput {
            fire: true,
            ..Default::default()
        };
        update(&mut world, &held);
        update(&mut world, &held);
        assert_eq!(world.fireballs.len(), 1);
        assert_eq!(world.player.fireball_charges, charges - 1);
    }

    #[test]
    fn death_requests_reload_of_current_map() {
        let mut world = world_with_map(ROOM);
        world.player.hp = 1;
        hurt(&mut world);
        assert_eq!(world.player.hp, world.player.max_hp);
        assert_eq!(world.pending_map.as_deref(), Some("test.map"));
    }
}
