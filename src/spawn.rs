use bevy::log::{error, warn};

use crate::components::{SymbolClash, TileTypeRegistry};
use crate::entities::{barrier, coin, crystal, door, player, walker};
use crate::entity_array::ArrayError;
use crate::events::GameEventKind;
use crate::tilemap::VoidValue;
use crate::world::WorldState;

/// Map symbols that spawn an entity instead of setting terrain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum EntityTileKind {
    PlayerStart,
    Walker,
    Crystal,
    Coin,
    Barrier,
    Door,
}

impl EntityTileKind {
    pub const ALL: [EntityTileKind; 6] = [
        EntityTileKind::PlayerStart,
        EntityTileKind::Walker,
        EntityTileKind::Crystal,
        EntityTileKind::Coin,
        EntityTileKind::Barrier,
        EntityTileKind::Door,
    ];

    pub fn symbol(self) -> char {
        match self {
            EntityTileKind::PlayerStart => 'P',
            EntityTileKind::Walker => 'w',
            EntityTileKind::Crystal => 'c',
            EntityTileKind::Coin => 'o',
            EntityTileKind::Barrier => 'B',
            EntityTileKind::Door => 'D',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.symbol() == symbol)
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityTileKind::PlayerStart => "player_start",
            EntityTileKind::Walker => "walker",
            EntityTileKind::Crystal => "crystal",
            EntityTileKind::Coin => "coin",
            EntityTileKind::Barrier => "barrier",
            EntityTileKind::Door => "door",
        }
    }

    /// Persistent kinds survive a reload of the same map.
    pub fn is_persistent(self) -> bool {
        matches!(self, EntityTileKind::Door)
    }

    pub fn spawner(self) -> Spawner {
        match self {
            EntityTileKind::PlayerStart => player::spawn_start,
            EntityTileKind::Walker => walker::spawn,
            EntityTileKind::Crystal => crystal::spawn,
            EntityTileKind::Coin => coin::spawn,
            EntityTileKind::Barrier => barrier::spawn,
            EntityTileKind::Door => door::spawn,
        }
    }
}

/// Everything a spawner learns about the cell it was placed on.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnContext {
    /// Pixel-space top-left of the cell.
    pub x: f32,
    pub y: f32,
    pub cell: (usize, usize),
    pub aux: Option<VoidValue>,
}

pub type Spawner = fn(&mut WorldState, &SpawnContext) -> Result<(), ArrayError>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnSummary {
    pub spawned: usize,
    pub dropped: usize,
}

/// Terrain and entity-tile symbols must never overlap.
pub fn validate_symbol_tables(tiles: &TileTypeRegistry) -> Result<(), SymbolClash> {
    for (i, def) in tiles.types.iter().enumerate() {
        if let Some(other) = tiles.types[..i].iter().find(|d| d.symbol == def.symbol) {
            return Err(SymbolClash {
                symbol: def.symbol,
                first: format!("tile '{}'", other.name),
                second: format!("tile '{}'", def.name),
            });
        }
        if let Some(kind) = EntityTileKind::from_symbol(def.symbol) {
            return Err(SymbolClash {
                symbol: def.symbol,
                first: format!("tile '{}'", def.name),
                second: format!("entity tile '{}'", kind.name()),
            });
        }
    }
    Ok(())
}

/// Runs the spawner of every active entity-tile cell on the loaded map.
/// With `keep_persistent` the persistent kinds are assumed alive already.
pub fn spawn_entity_tiles(world: &mut WorldState, keep_persistent: bool) -> SpawnSummary {
    let ts = world.config.tile_size;
    let grid = &world.map.entity_tiles;
    let mut cells = Vec::new();
    for x in 0..grid.width() {
        for y in 0..grid.height() {
            match grid.active_kind(x, y) {
                Some(kind) if keep_persistent && kind.is_persistent() => {}
                Some(kind) => cells.push((x, y, kind)),
                None => {}
            }
        }
    }

    let mut summary = SpawnSummary::default();
    for (x, y, kind) in cells {
        let ctx = SpawnContext {
            x: x as f32 * ts,
            y: y as f32 * ts,
            cell: (x, y),
            aux: world.map.void_value_at(x, y).cloned(),
        };
        match (kind.spawner())(world, &ctx) {
            Ok(()) => summary.spawned += 1,
            Err(e) => {
                if e.is_recoverable() {
                    warn!("[Tileworld spawn] {} at ({}, {}) dropped: {}", kind.name(), x, y, e);
                } else {
                    error!("[Tileworld spawn] {} at ({}, {}) failed: {}", kind.name(), x, y, e);
                }
                world.events.emit(GameEventKind::SpawnDropped {
                    kind: kind.name().to_string(),
                    x,
                    y,
                });
                summary.dropped += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TileTypeDef;

    #[test]
    fn symbols_round_trip() {
        for kind in EntityTileKind::ALL {
            assert_eq!(EntityTileKind::from_symbol(kind.symbol()), Some(kind));
        }
        assert_eq!(EntityTileKind::from_symbol('.'), None);
    }

    #[test]
    fn only_doors_are_persistent() {
        let persistent: Vec<_> = EntityTileKind::ALL
            .into_iter()
            .filter(|k| k.is_persistent())
            .collect();
        assert_eq!(persistent, vec![EntityTileKind::Door]);
    }

    #[test]
    fn default_tables_are_disjoint() {
        assert!(validate_symbol_tables(&TileTypeRegistry::default()).is_ok());
    }

    #[test]
    fn clash_with_entity_symbol_is_reported() {
        let mut tiles = TileTypeRegistry::default();
        tiles.types.push(TileTypeDef {
            name: "bush".into(),
            symbol: 'o',
            flags: 0,
            rotation: 0,
            sprite_offset: [0, 0],
        });
        let clash = validate_symbol_tables(&tiles).unwrap_err();
        assert_eq!(clash.symbol, 'o');
        assert!(clash.second.contains("coin"));
    }

    #[test]
    fn duplicate_terrain_symbol_is_reported() {
        let mut tiles = TileTypeRegistry::default();
        tiles.types.push(TileTypeDef {
            name: "rock".into(),
            symbol: '#',
            flags: 1,
            rotation: 0,
            sprite_offset: [0, 0],
        });
        assert_eq!(validate_symbol_tables(&tiles).unwrap_err().symbol, '#');
    }
}
