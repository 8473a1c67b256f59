use bevy::log::{debug, warn};

use crate::tilemap::EntityTileGrid;

/// Saved spawn state for one map, keyed by path and size.
#[derive(Clone, Debug, PartialEq)]
pub struct ColMapData {
    pub path: String,
    pub width: usize,
    pub height: usize,
    pub entity_tiles: EntityTileGrid,
}

impl ColMapData {
    pub fn new(path: impl Into<String>, entity_tiles: EntityTileGrid) -> Self {
        Self {
            path: path.into(),
            width: entity_tiles.width(),
            height: entity_tiles.height(),
            entity_tiles,
        }
    }

    fn same_map(&self, other: &ColMapData) -> bool {
        self.width == other.width && self.height == other.height && self.path == other.path
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapLookup {
    Existing(usize),
    NotFound,
}

/// Remembers how each visited map's spawn cells were mutated this session.
#[derive(Debug, Clone)]
pub struct Collector {
    maps: Vec<ColMapData>,
    capacity: usize,
    active_index: Option<usize>,
}

impl Collector {
    pub fn new(capacity: usize) -> Self {
        Self {
            maps: Vec::new(),
            capacity,
            active_index: None,
        }
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn get(&self, index: usize) -> Option<&ColMapData> {
        self.maps.get(index)
    }

    pub fn records(&self) -> &[ColMapData] {
        &self.maps
    }

    /// Returns the index of a record with the same identity without
    /// inserting, otherwise appends (capacity permitting) and reports
    /// `NotFound`. The active index follows either way.
    pub fn add_map(&mut self, candidate: ColMapData) -> MapLookup {
        if let Some(index) = self.maps.iter().position(|m| m.same_map(&candidate)) {
            debug!("[Tileworld collector] Reusing record {} for {}", index, candidate.path);
            self.active_index = Some(index);
            return MapLookup::Existing(index);
        }
        if self.maps.len() >= self.capacity {
            warn!(
                "[Tileworld collector] Full ({} maps); {} will not be remembered",
                self.capacity, candidate.path
            );
            self.active_index = None;
            return MapLookup::NotFound;
        }
        self.maps.push(candidate);
        self.active_index = Some(self.maps.len() - 1);
        MapLookup::NotFound
    }

    /// Appends a record as-is, e.g. from a save file. Duplicates are ignored.
    pub fn restore(&mut self, record: ColMapData) -> bool {
        if self.maps.len() >= self.capacity || self.maps.iter().any(|m| m.same_map(&record)) {
            warn!("[Tileworld collector] Skipping saved record for {}", record.path);
            return false;
        }
        self.maps.push(record);
        true
    }

    /// The loaded map is not tracked, e.g. while editing.
    pub fn detach(&mut self) {
        self.active_index = None;
    }

    /// Drops every record for `path`, whatever its size, so the next
    /// `add_map` starts from the candidate grid. Returns how many went.
    pub fn forget(&mut self, path: &str) -> usize {
        let active = self
            .active_index
            .and_then(|i| self.maps.get(i))
            .filter(|m| m.path != path)
            .map(|m| (m.path.clone(), m.width, m.height));
        let before = self.maps.len();
        self.maps.retain(|m| m.path != path);
        self.active_index = active.and_then(|(p, w, h)| {
            self.maps
                .iter()
                .position(|m| m.path == p && m.width == w && m.height == h)
        });
        before - self.maps.len()
    }

    /// Consumes a spawn cell of the active map.
    pub fn deactivate(&mut self, x: usize, y: usize) {
        if let Some(record) = self.active_index.and_then(|i| self.maps.get_mut(i)) {
            record.entity_tiles.deactivate(x, y);
        }
    }

    pub fn free(&mut self) {
        self.maps.clear();
        self.active_index = None;
    }
}
