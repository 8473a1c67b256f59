use std::fmt;

use bevy::log::{debug, error, info, warn};
use bevy::prelude::Resource;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::barrier::{BarrierCheckRequestStack, BarrierTag, RequestRejected};
use crate::camera::CameraView;
use crate::collector::{ColMapData, Collector, MapLookup};
use crate::components::{GameConfig, SymbolClash};
use crate::entities::barrier::{self, Barrier};
use crate::entities::coin::{self, Coin};
use crate::entities::crystal::Crystal;
use crate::entities::door::{self, Door};
use crate::entities::fireball::{self, Fireball};
use crate::entities::player::{self, Player, PlayerInput};
use crate::entities::walker::{self, Walker};
use crate::entities::CARRIERS;
use crate::entity_array::{ArrayError, EntityArray};
use crate::events::{GameEventBus, GameEventKind};
use crate::map_format::{parse_map, read_map_file, LoadReport, MapError, MapLimits};
use crate::particles::{self, EffectKind, Particle};
use crate::spawn::{spawn_entity_tiles, validate_symbol_tables};
use crate::tilemap::TileMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Spawn state comes from the Collector when the map was seen before.
    #[default]
    Play,
    /// Raw file contents, simulation paused.
    Edit,
}

#[derive(Debug)]
pub enum WorldError {
    Array(ArrayError),
    Symbols(SymbolClash),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::Array(e) => write!(f, "{}", e),
            WorldError::Symbols(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for WorldError {}

impl From<ArrayError> for WorldError {
    fn from(e: ArrayError) -> Self {
        WorldError::Array(e)
    }
}

impl From<SymbolClash> for WorldError {
    fn from(e: SymbolClash) -> Self {
        WorldError::Symbols(e)
    }
}

/// Everything one running game owns. Systems take it as a single resource
/// so the tick order stays explicit.
#[derive(Resource)]
pub struct WorldState {
    pub config: GameConfig,
    pub mode: LoadMode,
    pub map: TileMap,
    pub player: Player,
    pub walkers: EntityArray<Walker>,
    pub crystals: EntityArray<Crystal>,
    pub coins: EntityArray<Coin>,
    pub barriers: EntityArray<Barrier>,
    pub doors: EntityArray<Door>,
    pub fireballs: EntityArray<Fireball>,
    pub particles: EntityArray<Particle>,
    pub barrier_requests: BarrierCheckRequestStack,
    pub collector: Collector,
    pub camera: CameraView,
    pub events: GameEventBus,
    /// Map to load once the current tick has finished.
    pub pending_map: Option<String>,
    pub rng: SmallRng,
}

impl WorldState {
    pub fn new(config: GameConfig) -> Result<Self, WorldError> {
        validate_symbol_tables(&config.tile_types)?;
        let caps = &config.capacities;
        Ok(Self {
            mode: LoadMode::Play,
            map: TileMap::default(),
            player: Player::new(&config),
            walkers: EntityArray::create("walker", caps.walkers)?,
            crystals: EntityArray::create("crystal", caps.crystals)?,
            coins: EntityArray::create("coin", caps.coins)?,
            barriers: EntityArray::create("barrier", caps.barriers)?,
            doors: EntityArray::create("door", caps.doors)?,
            fireballs: EntityArray::create("fireball", caps.fireballs)?,
            particles: EntityArray::create("particle", caps.particles)?,
            barrier_requests: BarrierCheckRequestStack::new(config.max_barrier_requests),
            collector: Collector::new(config.max_collector_maps),
            camera: CameraView::default(),
            events: GameEventBus::default(),
            pending_map: None,
            rng: SmallRng::seed_from_u64(config.seed),
            config,
        })
    }

    pub fn load_map(&mut self, path: &str, mode: LoadMode) -> Result<LoadReport, MapError> {
        let source = read_map_file(path)?;
        self.load_map_source(path, &source, mode)
    }

    /// Replaces the loaded map. On error the current map stays untouched.
    pub fn load_map_source(
        &mut self,
        path: &str,
        source: &str,
        mode: LoadMode,
    ) -> Result<LoadReport, MapError> {
        let limits = MapLimits {
            tiles: &self.config.tile_types,
            default_outside: self.config.outside_tile(),
            max_void_rects: self.config.max_void_rects,
        };
        let (mut map, diagnostics) = parse_map(path, source, &limits)?;
        let same_map = self.mode == LoadMode::Play
            && mode == LoadMode::Play
            && self.map.is_loaded()
            && self.map.path == path
            && (self.map.width(), self.map.height()) == (map.width(), map.height());
        if same_map {
            self.restart();
        } else {
            self.unload();
        }
        self.mode = mode;

        // Must happen before spawning so saved spawn state replaces the file's.
        let mut reused_record = false;
        match mode {
            LoadMode::Play => {
                let candidate = ColMapData::new(path, map.entity_tiles.clone());
                if let MapLookup::Existing(index) = self.collector.add_map(candidate) {
                    if let Some(record) = self.collector.get(index) {
                        map.entity_tiles = record.entity_tiles.clone();
                        reused_record = true;
                    }
                }
            }
            LoadMode::Edit => self.collector.detach(),
        }

        self.map = map;
        let spawn = spawn_entity_tiles(self, same_map);
        info!(
            "[Tileworld map] Loaded {} ({}x{}, {:?}): {} spawned, {} dropped, {} diagnostics",
            path,
            self.map.width(),
            self.map.height(),
            mode,
            spawn.spawned,
            spawn.dropped,
            diagnostics.len()
        );
        self.events.emit(GameEventKind::MapLoaded {
            path: path.to_string(),
            reused_record,
        });
        let (cx, cy) = self.player.body.center();
        let (mw, mh) = self.map_pixel_size();
        self.camera.snap(cx, cy, mw, mh);

        Ok(LoadReport {
            diagnostics,
            spawn,
            reused_record,
        })
    }

    /// Drops every entity, persistent kinds included.
    fn unload(&mut self) {
        self.restart();
        self.doors.reset();
    }

    /// Reloading the map that is already in play, e.g. after a death.
    fn restart(&mut self) {
        self.reset_temporary();
        self.barrier_requests.clear();
        self.pending_map = None;
    }

    /// Clears every kind that is rebuilt from the map on each transition.
    pub fn reset_temporary(&mut self) {
        self.walkers.reset();
        self.crystals.reset();
        self.coins.reset();
        self.barriers.reset();
        self.fireballs.reset();
        self.particles.reset();
    }

    pub fn map_pixel_size(&self) -> (f32, f32) {
        let ts = self.config.tile_size;
        (self.map.width() as f32 * ts, self.map.height() as f32 * ts)
    }

    /// Stops a spawn cell from producing its entity again on reload.
    pub fn consume_spawn_cell(&mut self, origin: Option<(usize, usize)>) {
        let Some((x, y)) = origin else {
            return;
        };
        self.map.entity_tiles.deactivate(x, y);
        if self.mode == LoadMode::Play {
            self.collector.deactivate(x, y);
        }
    }

    pub fn spawn_effect(&mut self, kind: EffectKind, x: f32, y: f32) -> u32 {
        particles::spawn_effect(&mut self.particles, &mut self.rng, kind, x, y)
    }

    pub fn send_check_request(&mut self, tag: BarrierTag) -> Result<(), RequestRejected> {
        self.barrier_requests.send(tag)
    }

    pub fn request_map(&mut self, path: impl Into<String>) {
        let path = path.into();
        if let Some(previous) = self.pending_map.replace(path.clone()) {
            debug!("[Tileworld map] Transition to {} replaced by {}", previous, path);
        }
    }

    /// Opens the barriers of every queued tag no live carrier holds, then
    /// empties the queue. Returns how many barriers were removed.
    pub fn handle_check_requests(&mut self) -> usize {
        let orphaned = self.barrier_requests.orphaned_tags(CARRIERS, self);
        self.barrier_requests.clear();
        orphaned
            .into_iter()
            .map(|tag| barrier::destroy_tagged(self, tag))
            .sum()
    }

    pub fn clean_entity_arrays(&mut self) -> usize {
        self.walkers.clean()
            + self.crystals.clean()
            + self.coins.clean()
            + self.barriers.clean()
            + self.doors.clean()
            + self.fireballs.clean()
    }

    /// Loads the queued map, if any. A failed load keeps the current map.
    pub fn apply_pending_map(&mut self) -> Option<Result<LoadReport, MapError>> {
        let path = self.pending_map.take()?;
        let result = self.load_map(&path, LoadMode::Play);
        match &result {
            Err(e) if e.is_recoverable() => {
                warn!("[Tileworld map] Skipped {}: {}", path, e);
            }
            Err(e) => error!("[Tileworld map] Could not load {}, staying on {}: {}", path, self.map.path, e),
            Ok(_) => {}
        }
        Some(result)
    }

    /// Per-kind updates for one tick. Deletions are only marked here.
    pub fn update_entities(&mut self, input: &PlayerInput) {
        player::update(self, input);
        walker::update(self);
        fireball::update(self);
        coin::update(self);
        door::update(self, input);
        particles::update_particles(&mut self.particles, self.config.gravity);

        let (cx, cy) = self.player.body.center();
        let (mw, mh) = self.map_pixel_size();
        self.camera.follow(cx, cy, mw, mh);
        self.events.tick();
    }
}
