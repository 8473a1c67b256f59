use bevy::log::error;

use crate::components::{GameConfig, TileId, TileTypeRegistry, TILE_SOLID};
use crate::tilemap::{TileGrid, TileMap};

/// Axis-aligned box, top-left anchored. Y grows downward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BodyRect {
    /// Top-left, top-right, bottom-left, bottom-right.
    pub fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.x, self.y),
            (self.x + self.w, self.y),
            (self.x, self.y + self.h),
            (self.x + self.w, self.y + self.h),
        ]
    }

    pub fn overlaps(&self, other: &BodyRect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EcmBody {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub hsp: f32,
    pub vsp: f32,
    /// Accumulated gravity this airtime.
    pub grav: f32,
}

impl EcmBody {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            ..Default::default()
        }
    }

    /// Body of size `w x h` centred horizontally on a tile and resting on its floor.
    pub fn on_tile_floor(cell_x: f32, cell_y: f32, tile_size: f32, w: f32, h: f32) -> Self {
        Self::new(cell_x + (tile_size - w) * 0.5, cell_y + tile_size - h - 1.0, w, h)
    }

    pub fn hitbox(&self) -> BodyRect {
        BodyRect {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn overlaps(&self, other: &EcmBody) -> bool {
        self.hitbox().overlaps(&other.hitbox())
    }

    fn coord(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }

    fn set_coord(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::Horizontal => self.x = value,
            Axis::Vertical => self.y = value,
        }
    }

    fn speed(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.hsp,
            Axis::Vertical => self.vsp,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisMove {
    /// Full displacement applied.
    Free,
    /// Stopped next to a solid tile.
    Blocked,
    /// Correction ran out of steps; the coordinate was restored.
    Diverged,
}

impl AxisMove {
    pub fn collided(self) -> bool {
        !matches!(self, AxisMove::Free)
    }
}

/// Read-only view of the tile world used by every collision query in a tick.
#[derive(Clone, Copy)]
pub struct TileProbe<'a> {
    tiles: &'a TileGrid,
    registry: &'a TileTypeRegistry,
    outside: TileId,
    tile_size: f32,
    timestep: f32,
    max_steps: u32,
}

impl<'a> TileProbe<'a> {
    pub fn new(map: &'a TileMap, config: &'a GameConfig) -> Self {
        Self {
            tiles: &map.tiles,
            registry: &config.tile_types,
            outside: map.outside,
            tile_size: config.tile_size.max(1.0),
            timestep: config.timestep,
            max_steps: config.max_correction_steps,
        }
    }

    /// Tile under a pixel-space point. Anything off the grid is the outside tile.
    pub fn tile_collides_at(&self, x: f32, y: f32) -> TileId {
        if x < 0.0 || y < 0.0 || !x.is_finite() || !y.is_finite() {
            return self.outside;
        }
        let tx = (x / self.tile_size) as usize;
        let ty = (y / self.tile_size) as usize;
        self.tiles.tile(tx, ty).unwrap_or(self.outside)
    }

    /// Four-corner test only. Exact while the rect is smaller than one tile.
    pub fn rect_collides_with_flag(&self, rect: BodyRect, mask: u8) -> TileId {
        for (cx, cy) in rect.corners() {
            let id = self.tile_collides_at(cx, cy);
            if self.registry.has_flag(id, mask) {
                return id;
            }
        }
        TileId::AIR
    }

    fn solid_at(&self, rect: BodyRect) -> bool {
        !self.rect_collides_with_flag(rect, TILE_SOLID).is_air()
    }

    /// Moves `body` along one axis by its velocity, stopping flush against
    /// solid tiles. Velocity is left untouched.
    pub fn move_axis(&self, body: &mut EcmBody, axis: Axis) -> AxisMove {
        debug_assert!(
            body.w < self.tile_size && body.h < self.tile_size,
            "moving hitbox {}x{} must be smaller than a {} px tile",
            body.w,
            body.h,
            self.tile_size
        );
        let displacement = body.speed(axis) * self.timestep;
        if displacement == 0.0 || !displacement.is_finite() {
            return AxisMove::Free;
        }
        let start = body.coord(axis);

        let mut projected = *body;
        projected.set_coord(axis, start + displacement);
        if !self.solid_at(projected.hitbox()) {
            body.set_coord(axis, start + displacement);
            return AxisMove::Free;
        }

        let dir = displacement.signum();
        let limit = displacement.abs();
        let mut travelled = 0.0f32;
        let mut steps = 0u32;
        loop {
            if steps >= self.max_steps {
                body.set_coord(axis, start);
                error!(
                    "[Tileworld physics] {:?} correction exceeded {} steps at ({}, {}); rolled back",
                    axis, self.max_steps, body.x, body.y
                );
                return AxisMove::Diverged;
            }
            steps += 1;
            let next = (travelled + 1.0).min(limit);
            projected.set_coord(axis, start + dir * next);
            if next <= travelled || self.solid_at(projected.hitbox()) {
                break;
            }
            travelled = next;
        }
        body.set_coord(axis, start + dir * travelled);
        AxisMove::Blocked
    }
}

pub fn apply_gravity(body: &mut EcmBody, gravity: f32, max_fall_speed: f32) {
    body.grav += gravity;
    body.vsp = (body.vsp + gravity).min(max_fall_speed);
}

pub fn land(body: &mut EcmBody) {
    body.vsp = 0.0;
    body.grav = 0.0;
}

pub fn horizontal_velocity(left: bool, right: bool, speed: f32) -> f32 {
    let mut dir = 0.0;
    if left {
        dir -= 1.0;
    }
    if right {
        dir += 1.0;
    }
    dir * speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TILE_SPIKE;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    const GROUND: TileId = TileId(1);
    const SPIKE: TileId = TileId(3);

    fn map_with_tiles(width: usize, height: usize, tiles: &[(usize, usize, TileId)]) -> TileMap {
        let mut map = TileMap::new("test.map", width, height, GROUND).unwrap();
        for &(x, y, id) in tiles {
            map.tiles.set(x, y, id);
        }
        map
    }

    #[test]
    fn points_off_grid_resolve_to_outside_tile() {
        let config = GameConfig::default();
        let mut map = map_with_tiles(4, 4, &[]);
        map.outside = SPIKE;
        let probe = TileProbe::new(&map, &config);
        assert_eq!(probe.tile_collides_at(-0.5, 10.0), SPIKE);
        assert_eq!(probe.tile_collides_at(10.0, 128.0), SPIKE);
        assert_eq!(probe.tile_collides_at(127.9, 127.9), TileId::AIR);
    }

    #[test]
    fn tile_lookup_truncates() {
        let config = GameConfig::default();
        let map = map_with_tiles(4, 4, &[(1, 2, GROUND)]);
        let probe = TileProbe::new(&map, &config);
        assert_eq!(probe.tile_collides_at(32.0, 64.0), GROUND);
        assert_eq!(probe.tile_collides_at(63.99, 95.99), GROUND);
        assert_eq!(probe.tile_collides_at(31.99, 64.0), TileId::AIR);
    }

    #[test]
    fn corner_order_reports_first_match() {
        let config = GameConfig::default();
        // Spike under top-right corner, ground under bottom-left.
        let map = map_with_tiles(4, 4, &[(1, 0, SPIKE), (0, 1, GROUND)]);
        let probe = TileProbe::new(&map, &config);
        let rect = BodyRect {
            x: 20.0,
            y: 20.0,
            w: 20.0,
            h: 20.0,
        };
        assert_eq!(probe.rect_collides_with_flag(rect, TILE_SPIKE | TILE_SOLID), SPIKE);
        assert_eq!(probe.rect_collides_with_flag(rect, TILE_SOLID), GROUND);
        let clear = BodyRect {
            x: 70.0,
            y: 70.0,
            w: 20.0,
            h: 20.0,
        };
        assert_eq!(probe.rect_collides_with_flag(clear, TILE_SOLID), TileId::AIR);
    }

    #[test]
    fn free_move_applies_full_displacement() {
        let config = GameConfig::default();
        let map = map_with_tiles(10, 4, &[]);
        let probe = TileProbe::new(&map, &config);
        let mut body = EcmBody::new(40.0, 40.0, 20.0, 20.0);
        body.hsp = 7.5;
        assert_eq!(probe.move_axis(&mut body, Axis::Horizontal), AxisMove::Free);
        assert_eq!(body.x, 47.5);
        assert_eq!(body.hsp, 7.5);
    }

    #[test]
    fn blocked_move_stops_flush_against_wall() {
        let config = GameConfig::default();
        // Solid column at tile x=5 starts at pixel 160.
        let map = map_with_tiles(10, 4, &[(5, 1, GROUND), (5, 2, GROUND)]);
        let probe = TileProbe::new(&map, &config);
        let mut body = EcmBody::new(100.0, 40.0, 30.0, 20.0);
        body.hsp = 40.0;
        let result = probe.move_axis(&mut body, Axis::Horizontal);
        assert_eq!(result, AxisMove::Blocked);
        assert!(result.collided());
        assert_eq!(body.x, 129.0);
        assert_eq!(body.hsp, 40.0);
        assert_eq!(probe.rect_collides_with_flag(body.hitbox(), TILE_SOLID), TileId::AIR);
    }

    #[test]
    fn blocked_move_toward_negative_axis() {
        let config = GameConfig::default();
        let map = map_with_tiles(10, 6, &[(2, 1, GROUND)]);
        let probe = TileProbe::new(&map, &config);
        // Rising into the underside of tile (2,1), whose bottom edge is y=64.
        let mut body = EcmBody::new(70.0, 80.0, 20.0, 20.0);
        body.vsp = -20.0;
        assert_eq!(probe.move_axis(&mut body, Axis::Vertical), AxisMove::Blocked);
        assert_eq!(body.y, 64.0);
    }

    #[test]
    fn embedded_body_does_not_move() {
        let config = GameConfig::default();
        let map = map_with_tiles(10, 4, &[(1, 1, GROUND)]);
        let probe = TileProbe::new(&map, &config);
        let mut body = EcmBody::new(40.0, 40.0, 10.0, 10.0);
        body.hsp = 3.0;
        assert_eq!(probe.move_axis(&mut body, Axis::Horizontal), AxisMove::Blocked);
        assert_eq!(body.x, 40.0);
    }

    #[test]
    fn runaway_correction_rolls_back() {
        let config = GameConfig::default();
        // Outside is solid, so a huge leap lands off-grid and the stepping
        // loop walks open floor until it gives up.
        let map = map_with_tiles(30, 4, &[]);
        let probe = TileProbe::new(&map, &config);
        let mut body = EcmBody::new(0.0, 40.0, 10.0, 10.0);
        body.hsp = 2000.0;
        assert_eq!(probe.move_axis(&mut body, Axis::Horizontal), AxisMove::Diverged);
        assert_eq!(body.x, 0.0);
        assert_eq!(body.hsp, 2000.0);
    }

    #[test]
    fn timestep_scales_displacement() {
        let mut config = GameConfig::default();
        config.timestep = 0.5;
        let map = map_with_tiles(10, 4, &[]);
        let probe = TileProbe::new(&map, &config);
        let mut body = EcmBody::new(40.0, 40.0, 10.0, 10.0);
        body.vsp = 8.0;
        probe.move_axis(&mut body, Axis::Vertical);
        assert_eq!(body.y, 44.0);
    }

    #[test]
    fn swept_move_never_tunnels() {
        let config = GameConfig::default();
        let mut rng = SmallRng::seed_from_u64(11);
        let walls: Vec<(usize, usize, TileId)> = (0..8).map(|y| (12, y, GROUND)).collect();
        let map = map_with_tiles(16, 8, &walls);
        let probe = TileProbe::new(&map, &config);
        for _ in 0..400 {
            let w = rng.gen_range(4.0..31.0f32);
            let h = rng.gen_range(4.0..31.0f32);
            let start_x = rng.gen_range(32.0..(384.0 - w));
            let mut body = EcmBody::new(start_x, 96.0, w, h);
            body.hsp = rng.gen_range(0.5..90.0f32);
            let before = body.x;
            let result = probe.move_axis(&mut body, Axis::Horizontal);
            if result == AxisMove::Blocked {
                assert_eq!(probe.rect_collides_with_flag(body.hitbox(), TILE_SOLID), TileId::AIR);
                assert!(body.x + body.w < 384.0);
            }
            assert!((body.x - before).abs() <= body.hsp + 1e-3);
        }
    }

    #[test]
    fn gravity_caps_fall_speed() {
        let mut body = EcmBody::new(0.0, 0.0, 10.0, 10.0);
        for _ in 0..100 {
            apply_gravity(&mut body, 0.5, 12.0);
        }
        assert_eq!(body.vsp, 12.0);
        assert!(body.grav > 12.0);
        land(&mut body);
        assert_eq!(body.vsp, 0.0);
        assert_eq!(body.grav, 0.0);
    }

    #[test]
    fn horizontal_velocity_cancels_opposites() {
        assert_eq!(horizontal_velocity(true, true, 3.0), 0.0);
        assert_eq!(horizontal_velocity(true, false, 3.0), -3.0);
    }
}
