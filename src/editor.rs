use std::fmt;
use std::path::Path;

use bevy::log::{info, warn};

use crate::components::TileId;
use crate::map_format::{save_map_file, write_map, LoadReport, MapError};
use crate::spawn::EntityTileKind;
use crate::tilemap::{EntityTileCell, GridError, VoidRect, VoidValue};
use crate::world::{LoadMode, WorldState};

/// What a single click of the editor writes into a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Brush {
    Terrain(TileId),
    Entity(EntityTileKind),
    Erase,
}

#[derive(Debug)]
pub enum EditError {
    NotEditing,
    OutOfBounds { x: usize, y: usize },
    UnknownTile(TileId),
    VoidRectOutOfBounds(VoidRect),
    VoidRectsFull,
    UnknownSymbol(String),
    BadCommand { line: usize, text: String },
    Grid(GridError),
    Map(MapError),
}

impl EditError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            EditError::Grid(e) => e.is_recoverable(),
            EditError::Map(e) => e.is_recoverable(),
            _ => true,
        }
    }
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::NotEditing => write!(f, "the loaded map is not in edit mode"),
            EditError::OutOfBounds { x, y } => write!(f, "cell ({}, {}) is outside the map", x, y),
            EditError::UnknownTile(id) => write!(f, "tile id {} is not registered", id.0),
            EditError::VoidRectOutOfBounds(r) => {
                write!(f, "void rect {}x{} at ({}, {}) does not fit the map", r.w, r.h, r.x, r.y)
            }
            EditError::VoidRectsFull => write!(f, "void rect limit reached"),
            EditError::UnknownSymbol(s) => write!(f, "'{}' is not a tile or entity symbol", s),
            EditError::BadCommand { line, text } => write!(f, "line {}: cannot run '{}'", line, text),
            EditError::Grid(e) => write!(f, "{}", e),
            EditError::Map(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EditError {}

impl From<GridError> for EditError {
    fn from(e: GridError) -> Self {
        EditError::Grid(e)
    }
}

impl From<MapError> for EditError {
    fn from(e: MapError) -> Self {
        EditError::Map(e)
    }
}

fn ensure_editing(world: &WorldState) -> Result<(), EditError> {
    if world.mode == LoadMode::Edit && world.map.is_loaded() {
        Ok(())
    } else {
        Err(EditError::NotEditing)
    }
}

/// A cell holds either terrain or an entity tile, never both.
pub fn paint(world: &mut WorldState, x: usize, y: usize, brush: Brush) -> Result<(), EditError> {
    ensure_editing(world)?;
    if !world.map.tiles.in_bounds(x, y) {
        return Err(EditError::OutOfBounds { x, y });
    }
    let (tile, cell) = match brush {
        Brush::Terrain(id) => {
            if world.config.tile_types.get(id).is_none() {
                return Err(EditError::UnknownTile(id));
            }
            (id, None)
        }
        Brush::Entity(kind) => (TileId::AIR, Some(EntityTileCell { active: true, kind })),
        Brush::Erase => (TileId::AIR, None),
    };
    world.map.tiles.set(x, y, tile);
    world.map.entity_tiles.set(x, y, cell);
    Ok(())
}

pub fn add_void_rect(world: &mut WorldState, rect: VoidRect) -> Result<(), EditError> {
    ensure_editing(world)?;
    if !rect.fits(world.map.width(), world.map.height()) {
        return Err(EditError::VoidRectOutOfBounds(rect));
    }
    if !world.map.add_void_rect(rect, world.config.max_void_rects) {
        return Err(EditError::VoidRectsFull);
    }
    Ok(())
}

/// Removes the rect that currently answers lookups for the cell.
pub fn remove_void_rect_at(
    world: &mut WorldState,
    x: usize,
    y: usize,
) -> Result<Option<VoidRect>, EditError> {
    ensure_editing(world)?;
    let index = world.map.void_rects.iter().position(|r| r.contains(x, y));
    Ok(index.map(|i| world.map.void_rects.remove(i)))
}

pub fn resize(world: &mut WorldState, width: usize, height: usize) -> Result<(), EditError> {
    ensure_editing(world)?;
    world.map.resize(width, height)?;
    info!(
        "[Tileworld editor] Resized {} to {}x{}",
        world.map.path, width, height
    );
    Ok(())
}

pub fn save(world: &WorldState, path: impl AsRef<Path>) -> Result<(), EditError> {
    ensure_editing(world)?;
    save_map_file(&world.map, &world.config.tile_types, path.as_ref())?;
    info!("[Tileworld editor] Saved {}", path.as_ref().display());
    Ok(())
}

/// Reloads the edited grids in play mode without touching the file on disk.
/// Spawn state saved for this path from earlier play is dropped first.
pub fn playtest(world: &mut WorldState) -> Result<LoadReport, EditError> {
    ensure_editing(world)?;
    let source = write_map(&world.map, &world.config.tile_types);
    let path = world.map.path.clone();
    let forgotten = world.collector.forget(&path);
    if forgotten > 0 {
        info!(
            "[Tileworld editor] Dropped {} saved record(s) for {} before playtest",
            forgotten, path
        );
    }
    Ok(world.load_map_source(&path, &source, LoadMode::Play)?)
}

fn brush_for(world: &WorldState, symbol: &str) -> Result<Brush, EditError> {
    let mut chars = symbol.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(EditError::UnknownSymbol(symbol.to_string()));
    };
    if let Some(id) = world.config.tile_types.by_symbol(c) {
        return Ok(Brush::Terrain(id));
    }
    EntityTileKind::from_symbol(c)
        .map(Brush::Entity)
        .ok_or_else(|| EditError::UnknownSymbol(symbol.to_string()))
}

fn run_command(world: &mut WorldState, line: &str, line_no: usize) -> Result<(), EditError> {
    let bad = || EditError::BadCommand {
        line: line_no,
        text: line.to_string(),
    };
    let words: Vec<&str> = line.split_whitespace().collect();
    let num = |i: usize| {
        words
            .get(i)
            .and_then(|w| w.parse::<usize>().ok())
            .ok_or_else(bad)
    };
    match words.as_slice() {
        ["paint", _, _, symbol] => {
            let brush = brush_for(world, symbol)?;
            paint(world, num(1)?, num(2)?, brush)
        }
        ["erase", _, _] => paint(world, num(1)?, num(2)?, Brush::Erase),
        ["vr", _, _, _, _, rest @ ..] if !rest.is_empty() => {
            let (value, truncated) = VoidValue::parse(&rest.join(" "));
            if truncated {
                warn!(
                    "[Tileworld editor] line {}: void rect text cut to {} characters",
                    line_no,
                    VoidValue::MAX_TEXT_LEN
                );
            }
            let rect = VoidRect {
                x: num(1)?,
                y: num(2)?,
                w: num(3)?,
                h: num(4)?,
                value,
            };
            add_void_rect(world, rect)
        }
        ["unvr", _, _] => remove_void_rect_at(world, num(1)?, num(2)?).map(|_| ()),
        ["resize", _, _] => resize(world, num(1)?, num(2)?),
        ["save", path] => save(world, path),
        ["playtest"] => playtest(world).map(|_| ()),
        _ => Err(bad()),
    }
}

/// Runs editor commands, one per line: `paint X Y SYMBOL`, `erase X Y`,
/// `vr X Y W H VALUE`, `unvr X Y`, `resize W H`, `save PATH`, `playtest`.
/// Blank lines and `//` comments are skipped. Recoverable failures are
/// logged and the script goes on; anything else stops it.
pub fn run_script(world: &mut WorldState, source: &str) -> Result<usize, EditError> {
    let mut applied = 0;
    for (i, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        match run_command(world, line, i + 1) {
            Ok(()) => applied += 1,
            Err(e) if e.is_recoverable() => {
                warn!("[Tileworld editor] Skipping line {}: {}", i + 1, e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(applied)
}
