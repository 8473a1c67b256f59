use std::fmt;
use std::fmt::Write as _;
use std::path::Path;

use bevy::log::{info, warn};

use crate::collector::ColMapData;
use crate::map_format::{LoadReport, MapError};
use crate::spawn::EntityTileKind;
use crate::tilemap::{EntityTileCell, EntityTileGrid, GridError};
use crate::world::{LoadMode, WorldState};

const EMPTY_CELL: char = '.';
const PLAYER_FIELDS: [&str; 6] = ["player x", "player y", "fireball charges", "max hp", "hp", "coins"];

#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Truncated { line: usize, expected: &'static str },
    BadNumber { line: usize, value: String },
    BadDimensions { line: usize, value: String },
    Grid(GridError),
    Map(MapError),
}

impl SaveError {
    /// A malformed save is rejected before anything is touched, so the
    /// caller can go on with a plain map instead.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SaveError::Truncated { .. } | SaveError::BadNumber { .. } | SaveError::BadDimensions { .. } => true,
            SaveError::Grid(e) => e.is_recoverable(),
            SaveError::Map(e) => e.is_recoverable(),
            SaveError::Io(_) => false,
        }
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "save I/O error: {}", e),
            SaveError::Truncated { line, expected } => {
                write!(f, "save ends at line {}, expected {}", line, expected)
            }
            SaveError::BadNumber { line, value } => {
                write!(f, "line {}: '{}' is not an integer", line, value)
            }
            SaveError::BadDimensions { line, value } => {
                write!(f, "line {}: bad record size '{}', expected HEIGHTxWIDTH", line, value)
            }
            SaveError::Grid(e) => write!(f, "{}", e),
            SaveError::Map(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<GridError> for SaveError {
    fn from(e: GridError) -> Self {
        SaveError::Grid(e)
    }
}

impl From<MapError> for SaveError {
    fn from(e: MapError) -> Self {
        SaveError::Map(e)
    }
}

/// The player fields a save game keeps, in file order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub x: i32,
    pub y: i32,
    pub fireball_charges: i32,
    pub max_hp: i32,
    pub hp: i32,
    pub coins: i32,
}

impl PlayerSnapshot {
    fn to_fields(self) -> [i32; 6] {
        [self.x, self.y, self.fireball_charges, self.max_hp, self.hp, self.coins]
    }

    fn from_fields(f: [i32; 6]) -> Self {
        Self {
            x: f[0],
            y: f[1],
            fireball_charges: f[2],
            max_hp: f[3],
            hp: f[4],
            coins: f[5],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaveGame {
    pub map_path: String,
    pub player: PlayerSnapshot,
    pub maps: Vec<ColMapData>,
}

impl SaveGame {
    pub fn capture(world: &WorldState) -> Self {
        let p = &world.player;
        Self {
            map_path: world.map.path.clone(),
            player: PlayerSnapshot {
                x: p.body.x as i32,
                y: p.body.y as i32,
                fireball_charges: p.fireball_charges,
                max_hp: p.max_hp,
                hp: p.hp,
                coins: p.coins,
            },
            maps: world.collector.records().to_vec(),
        }
    }

    /// Replaces the Collector, loads the saved map and puts the player back.
    /// On error the previous Collector is restored.
    pub fn apply(self, world: &mut WorldState) -> Result<LoadReport, SaveError> {
        let previous = world.collector.clone();
        world.collector.free();
        for record in self.maps {
            world.collector.restore(record);
        }
        let report = match world.load_map(&self.map_path, LoadMode::Play) {
            Ok(report) => report,
            Err(e) => {
                world.collector = previous;
                return Err(e.into());
            }
        };

        let s = self.player;
        let player = &mut world.player;
        player.place(s.x as f32, s.y as f32);
        player.max_hp = s.max_hp;
        player.hp = s.hp.clamp(1, s.max_hp.max(1));
        player.fireball_charges = s.fireball_charges;
        player.coins = s.coins;
        let (cx, cy) = player.body.center();
        let (mw, mh) = world.map_pixel_size();
        world.camera.snap(cx, cy, mw, mh);
        Ok(report)
    }
}

pub fn write_save(save: &SaveGame) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", save.map_path);
    for value in save.player.to_fields() {
        let _ = writeln!(out, "{}", value);
    }
    for record in &save.maps {
        let grid = &record.entity_tiles;
        let _ = writeln!(out, "{}", record.path);
        let _ = writeln!(out, "{}x{}", grid.height(), grid.width());
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                out.push(grid.active_kind(x, y).map_or(EMPTY_CELL, EntityTileKind::symbol));
            }
            out.push('\n');
        }
    }
    out
}

fn next_line<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    last: &mut usize,
    expected: &'static str,
) -> Result<&'a str, SaveError> {
    match lines.next() {
        Some((n, line)) => {
            *last = n;
            Ok(line)
        }
        None => Err(SaveError::Truncated {
            line: *last,
            expected,
        }),
    }
}

fn parse_record_size(line: &str) -> Option<(usize, usize)> {
    let (h, w) = line.trim().split_once('x')?;
    Some((h.trim().parse().ok()?, w.trim().parse().ok()?))
}

pub fn parse_save(source: &str) -> Result<SaveGame, SaveError> {
    let mut lines = source
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .enumerate()
        .map(|(i, l)| (i + 1, l));
    let mut last = 0;

    let map_path = next_line(&mut lines, &mut last, "map path")?.trim().to_string();
    let mut fields = [0i32; 6];
    for (slot, name) in fields.iter_mut().zip(PLAYER_FIELDS) {
        let raw = next_line(&mut lines, &mut last, name)?;
        *slot = raw.trim().parse().map_err(|_| SaveError::BadNumber {
            line: last,
            value: raw.to_string(),
        })?;
    }

    let mut maps = Vec::new();
    while let Some((n, path)) = lines.next() {
        last = n;
        if path.trim().is_empty() {
            continue;
        }
        let size = next_line(&mut lines, &mut last, "record size")?;
        let (height, width) = parse_record_size(size).ok_or_else(|| SaveError::BadDimensions {
            line: last,
            value: size.to_string(),
        })?;
        let mut grid = EntityTileGrid::new(width, height)?;
        for y in 0..height {
            let row = next_line(&mut lines, &mut last, "record row")?;
            for (x, symbol) in row.chars().take(width).enumerate() {
                match EntityTileKind::from_symbol(symbol) {
                    Some(kind) => grid.set(x, y, Some(EntityTileCell { active: true, kind })),
                    None if symbol == EMPTY_CELL => {}
                    None => warn!(
                        "[Tileworld save] line {}: unknown entity symbol '{}', treating as empty",
                        last, symbol
                    ),
                }
            }
        }
        maps.push(ColMapData::new(path.trim(), grid));
    }

    Ok(SaveGame {
        map_path,
        player: PlayerSnapshot::from_fields(fields),
        maps,
    })
}

pub fn save_game(world: &WorldState, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let save = SaveGame::capture(world);
    std::fs::write(path.as_ref(), write_save(&save))?;
    info!(
        "[Tileworld save] Wrote {} ({} map records)",
        path.as_ref().display(),
        save.maps.len()
    );
    Ok(())
}

pub fn load_game(world: &mut WorldState, path: impl AsRef<Path>) -> Result<LoadReport, SaveError> {
    let source = std::fs::read_to_string(path.as_ref())?;
    let save = parse_save(&source)?;
    info!(
        "[Tileworld save] Restoring {} from {}",
        save.map_path,
        path.as_ref().display()
    );
    save.apply(world)
}
