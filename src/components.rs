use std::fmt;

pub const TILE_SOLID: u8 = 0b0001;
pub const TILE_SPIKE: u8 = 0b0010;
pub const TILE_INVISIBLE: u8 = 0b0100;

/// Index into the [`TileTypeRegistry`]. Id 0 is always air.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TileId(pub u8);

impl TileId {
    pub const AIR: TileId = TileId(0);

    pub fn is_air(self) -> bool {
        self == TileId::AIR
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TileTypeDef {
    pub name: String,
    pub symbol: char,
    #[serde(default)]
    pub flags: u8,
    /// Quarter turns applied to the sprite.
    #[serde(default)]
    pub rotation: u8,
    #[serde(default)]
    pub sprite_offset: [i32; 2],
}

impl TileTypeDef {
    fn new(name: &str, symbol: char, flags: u8) -> Self {
        Self {
            name: name.to_string(),
            symbol,
            flags,
            rotation: 0,
            sprite_offset: [0, 0],
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TileTypeRegistry {
    pub types: Vec<TileTypeDef>,
}

impl Default for TileTypeRegistry {
    fn default() -> Self {
        let mut spike_down = TileTypeDef::new("spike_down", 'v', TILE_SPIKE);
        spike_down.rotation = 2;
        Self {
            types: vec![
                TileTypeDef::new("air", '.', 0),
                TileTypeDef::new("ground", '#', TILE_SOLID),
                TileTypeDef::new("brick", '=', TILE_SOLID),
                TileTypeDef::new("spike", '^', TILE_SPIKE),
                spike_down,
                TileTypeDef::new("ghost_block", '%', TILE_SOLID | TILE_INVISIBLE),
                TileTypeDef::new("barrier", 'X', TILE_SOLID),
            ],
        }
    }
}

impl TileTypeRegistry {
    pub fn get(&self, id: TileId) -> Option<&TileTypeDef> {
        self.types.get(id.0 as usize)
    }

    /// Unknown ids carry no flags.
    pub fn flags(&self, id: TileId) -> u8 {
        self.get(id).map_or(0, |def| def.flags)
    }

    pub fn has_flag(&self, id: TileId, mask: u8) -> bool {
        self.flags(id) & mask != 0
    }

    pub fn by_symbol(&self, symbol: char) -> Option<TileId> {
        self.types
            .iter()
            .position(|def| def.symbol == symbol)
            .and_then(|i| u8::try_from(i).ok())
            .map(TileId)
    }

    pub fn by_name(&self, name: &str) -> Option<TileId> {
        self.types
            .iter()
            .position(|def| def.name == name)
            .and_then(|i| u8::try_from(i).ok())
            .map(TileId)
    }

    pub fn symbol(&self, id: TileId) -> char {
        self.get(id).map_or('.', |def| def.symbol)
    }
}

/// Two symbol tables claimed the same character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolClash {
    pub symbol: char,
    pub first: String,
    pub second: String,
}

impl fmt::Display for SymbolClash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "map symbol '{}' is claimed by both {} and {}",
            self.symbol, self.first, self.second
        )
    }
}

impl std::error::Error for SymbolClash {}

fn default_tile_size() -> f32 {
    32.0
}

fn default_timestep() -> f32 {
    1.0
}

fn default_gravity() -> f32 {
    0.5
}

fn default_max_fall_speed() -> f32 {
    12.0
}

fn default_move_speed() -> f32 {
    3.0
}

fn default_jump_velocity() -> f32 {
    -9.0
}

fn default_max_hp() -> i32 {
    3
}

fn default_max_fireball_charges() -> i32 {
    3
}

fn default_invulnerable_frames() -> u32 {
    60
}

fn default_outside_symbol() -> char {
    '#'
}

fn default_barrier_tile() -> String {
    "barrier".to_string()
}

fn default_max_correction_steps() -> u32 {
    100
}

fn default_barrier_requests() -> usize {
    20
}

fn default_void_rects() -> usize {
    20
}

fn default_collector_maps() -> usize {
    100
}

fn default_seed() -> u64 {
    0x7115
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EntityCapacities {
    pub walkers: usize,
    pub crystals: usize,
    pub coins: usize,
    pub barriers: usize,
    pub doors: usize,
    pub fireballs: usize,
    pub particles: usize,
}

impl Default for EntityCapacities {
    fn default() -> Self {
        Self {
            walkers: 64,
            crystals: 32,
            coins: 256,
            barriers: 128,
            doors: 16,
            fireballs: 8,
            particles: 512,
        }
    }
}

/// Tunables for the whole simulation. Velocities are in pixels per tick.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    #[serde(default = "default_timestep")]
    pub timestep: f32,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_max_fall_speed")]
    pub max_fall_speed: f32,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_jump_velocity")]
    pub jump_velocity: f32,
    #[serde(default = "default_max_hp")]
    pub max_hp: i32,
    #[serde(default = "default_max_fireball_charges")]
    pub max_fireball_charges: i32,
    #[serde(default = "default_invulnerable_frames")]
    pub invulnerable_frames: u32,
    /// Tile used for cells beyond the grid when a map sets no `ot` option.
    #[serde(default = "default_outside_symbol")]
    pub outside_symbol: char,
    /// Name of the tile type a barrier writes into its cell.
    #[serde(default = "default_barrier_tile")]
    pub barrier_tile: String,
    #[serde(default = "default_max_correction_steps")]
    pub max_correction_steps: u32,
    #[serde(default = "default_barrier_requests")]
    pub max_barrier_requests: usize,
    #[serde(default = "default_void_rects")]
    pub max_void_rects: usize,
    #[serde(default = "default_collector_maps")]
    pub max_collector_maps: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub capacities: EntityCapacities,
    #[serde(default)]
    pub tile_types: TileTypeRegistry,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_size: default_tile_size(),
            timestep: default_timestep(),
            gravity: default_gravity(),
            max_fall_speed: default_max_fall_speed(),
            move_speed: default_move_speed(),
            jump_velocity: default_jump_velocity(),
            max_hp: default_max_hp(),
            max_fireball_charges: default_max_fireball_charges(),
            invulnerable_frames: default_invulnerable_frames(),
            outside_symbol: default_outside_symbol(),
            barrier_tile: default_barrier_tile(),
            max_correction_steps: default_max_correction_steps(),
            max_barrier_requests: default_barrier_requests(),
            max_void_rects: default_void_rects(),
            max_collector_maps: default_collector_maps(),
            seed: default_seed(),
            capacities: EntityCapacities::default(),
            tile_types: TileTypeRegistry::default(),
        }
    }
}

impl GameConfig {
    pub fn outside_tile(&self) -> TileId {
        self.tile_types
            .by_symbol(self.outside_symbol)
            .unwrap_or(TileId::AIR)
    }

    pub fn barrier_tile_id(&self) -> TileId {
        self.tile_types
            .by_name(&self.barrier_tile)
            .unwrap_or(TileId::AIR)
    }
}
