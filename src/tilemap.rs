use std::collections::TryReserveError;
use std::fmt;

use crate::components::TileId;
use crate::spawn::EntityTileKind;

#[derive(Debug, Clone)]
pub enum GridError {
    BadDimensions { width: usize, height: usize },
    Allocation(TryReserveError),
}

impl GridError {
    pub fn is_recoverable(&self) -> bool {
        false
    }
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::BadDimensions { width, height } => {
                write!(f, "invalid grid dimensions {}x{}", width, height)
            }
            GridError::Allocation(e) => write!(f, "could not allocate grid: {}", e),
        }
    }
}

impl std::error::Error for GridError {}

impl From<TryReserveError> for GridError {
    fn from(e: TryReserveError) -> Self {
        GridError::Allocation(e)
    }
}

/// Column-major `width x height` storage addressed as `[x][y]`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize) -> Result<Self, GridError> {
        let len = width
            .checked_mul(height)
            .filter(|&n| n > 0)
            .ok_or(GridError::BadDimensions { width, height })?;
        let mut cells = Vec::new();
        cells.try_reserve_exact(len)?;
        cells.resize(len, T::default());
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Copy of this grid at the new size; cells outside the old bounds are default.
    pub fn resized(&self, width: usize, height: usize) -> Result<Self, GridError> {
        let mut out = Self::new(width, height)?;
        for x in 0..width.min(self.width) {
            for y in 0..height.min(self.height) {
                out.cells[x * height + y] = self.cells[x * self.height + y].clone();
            }
        }
        Ok(out)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.cells.get(x * self.height + y)
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.cells.get_mut(x * self.height + y)
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        if let Some(cell) = self.get_mut(x, y) {
            *cell = value;
        }
    }
}

pub type TileGrid = Grid<TileId>;

impl TileGrid {
    pub fn tile(&self, x: usize, y: usize) -> Option<TileId> {
        self.get(x, y).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityTileCell {
    pub active: bool,
    pub kind: EntityTileKind,
}

pub type EntityTileGrid = Grid<Option<EntityTileCell>>;

impl EntityTileGrid {
    pub fn active_kind(&self, x: usize, y: usize) -> Option<EntityTileKind> {
        self.get(x, y)
            .copied()
            .flatten()
            .filter(|cell| cell.active)
            .map(|cell| cell.kind)
    }

    /// Marks a spawn cell consumed so it is skipped on the next spawn pass.
    pub fn deactivate(&mut self, x: usize, y: usize) {
        if let Some(Some(cell)) = self.get_mut(x, y) {
            cell.active = false;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoidValue {
    Int(i32),
    Text(String),
}

impl VoidValue {
    pub const MAX_TEXT_LEN: usize = 31;

    pub fn as_int(&self) -> Option<i32> {
        match self {
            VoidValue::Int(v) => Some(*v),
            VoidValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            VoidValue::Text(s) => Some(s),
            VoidValue::Int(_) => None,
        }
    }

    /// Integers win; anything else is kept as text, cut to `MAX_TEXT_LEN`.
    /// The flag is set when text was cut.
    pub fn parse(raw: &str) -> (Self, bool) {
        match raw.parse::<i32>() {
            Ok(v) => (VoidValue::Int(v), false),
            Err(_) => {
                let text: String = raw.chars().take(Self::MAX_TEXT_LEN).collect();
                let truncated = text.len() < raw.len();
                (VoidValue::Text(text), truncated)
            }
        }
    }
}

impl fmt::Display for VoidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoidValue::Int(v) => write!(f, "{}", v),
            VoidValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Tile-space rectangle handing an auxiliary value to spawners inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoidRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
    pub value: VoidValue,
}

impl VoidRect {
    pub fn contains(&self, tx: usize, ty: usize) -> bool {
        tx >= self.x && tx - self.x < self.w && ty >= self.y && ty - self.y < self.h
    }

    /// Non-empty and entirely inside a `width x height` map.
    pub fn fits(&self, width: usize, height: usize) -> bool {
        self.w > 0
            && self.h > 0
            && self.x.checked_add(self.w).is_some_and(|right| right <= width)
            && self.y.checked_add(self.h).is_some_and(|bottom| bottom <= height)
    }
}

/// Everything a loaded map owns.
#[derive(Clone, Debug, Default)]
pub struct TileMap {
    pub path: String,
    pub tiles: TileGrid,
    pub entity_tiles: EntityTileGrid,
    pub void_rects: Vec<VoidRect>,
    pub outside: TileId,
}

impl TileMap {
    pub fn new(path: impl Into<String>, width: usize, height: usize, outside: TileId) -> Result<Self, GridError> {
        Ok(Self {
            path: path.into(),
            tiles: TileGrid::new(width, height)?,
            entity_tiles: EntityTileGrid::new(width, height)?,
            void_rects: Vec::new(),
            outside,
        })
    }

    pub fn width(&self) -> usize {
        self.tiles.width()
    }

    pub fn height(&self) -> usize {
        self.tiles.height()
    }

    pub fn is_loaded(&self) -> bool {
        self.width() > 0
    }

    /// First-added rectangle containing the cell wins.
    pub fn void_value_at(&self, tx: usize, ty: usize) -> Option<&VoidValue> {
        self.void_rects
            .iter()
            .find(|r| r.contains(tx, ty))
            .map(|r| &r.value)
    }

    /// Returns false when the list is already at `max`.
    pub fn add_void_rect(&mut self, rect: VoidRect, max: usize) -> bool {
        if self.void_rects.len() >= max {
            return false;
        }
        self.void_rects.push(rect);
        true
    }

    /// Reallocates both grids, keeping the overlapping region. Void rects that
    /// no longer fit are dropped.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), GridError> {
        let tiles = self.tiles.resized(width, height)?;
        let entity_tiles = self.entity_tiles.resized(width, height)?;
        self.tiles = tiles;
        self.entity_tiles = entity_tiles;
        self.void_rects.retain(|r| r.fits(width, height));
        Ok(())
    }
}
