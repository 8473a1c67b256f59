use std::fmt;
use std::fmt::Write as _;
use std::path::Path;

use bevy::log::warn;

use crate::components::{TileId, TileTypeRegistry};
use crate::spawn::{EntityTileKind, SpawnSummary};
use crate::tilemap::{EntityTileCell, GridError, TileMap, VoidRect, VoidValue};

const OPTION_MARKER: char = '#';

#[derive(Debug)]
pub enum MapError {
    Io(std::io::Error),
    Header(String),
    Grid(GridError),
}

impl MapError {
    /// Grid failures follow `GridError`; file and header failures never recover.
    pub fn is_recoverable(&self) -> bool {
        match self {
            MapError::Grid(e) => e.is_recoverable(),
            MapError::Io(_) | MapError::Header(_) => false,
        }
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io(e) => write!(f, "map I/O error: {}", e),
            MapError::Header(line) => write!(f, "bad map header '{}', expected WIDTHxHEIGHT", line),
            MapError::Grid(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MapError {}

impl From<std::io::Error> for MapError {
    fn from(e: std::io::Error) -> Self {
        MapError::Io(e)
    }
}

impl From<GridError> for MapError {
    fn from(e: GridError) -> Self {
        MapError::Grid(e)
    }
}

/// Recoverable problems found while reading a map. The load still succeeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapDiagnostic {
    UnknownSymbol { x: usize, y: usize, symbol: char },
    ShortRow { y: usize, len: usize },
    MissingRows { found: usize, expected: usize },
    UnknownOption { line: usize, name: String },
    BadOption { line: usize, reason: String },
    VoidRectsFull { line: usize },
}

impl fmt::Display for MapDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapDiagnostic::UnknownSymbol { x, y, symbol } => {
                write!(f, "unknown symbol '{}' at ({}, {}), using air", symbol, x, y)
            }
            MapDiagnostic::ShortRow { y, len } => write!(f, "row {} has only {} cells", y, len),
            MapDiagnostic::MissingRows { found, expected } => {
                write!(f, "found {} of {} rows", found, expected)
            }
            MapDiagnostic::UnknownOption { line, name } => {
                write!(f, "line {}: unknown option '{}', ignoring the rest", line, name)
            }
            MapDiagnostic::BadOption { line, reason } => write!(f, "line {}: {}", line, reason),
            MapDiagnostic::VoidRectsFull { line } => {
                write!(f, "line {}: void rect limit reached", line)
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub diagnostics: Vec<MapDiagnostic>,
    pub spawn: SpawnSummary,
    /// The Collector already knew this map and its saved spawn state was used.
    pub reused_record: bool,
}

pub struct MapLimits<'a> {
    pub tiles: &'a TileTypeRegistry,
    pub default_outside: TileId,
    pub max_void_rects: usize,
}

pub fn read_map_file(path: impl AsRef<Path>) -> Result<String, MapError> {
    Ok(std::fs::read_to_string(path)?)
}

fn parse_header(line: &str) -> Option<(usize, usize)> {
    let (w, h) = line.trim().split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

/// Parses map text into grids without spawning anything.
pub fn parse_map(
    path: &str,
    source: &str,
    limits: &MapLimits,
) -> Result<(TileMap, Vec<MapDiagnostic>), MapError> {
    let mut lines = source.lines().map(|l| l.trim_end_matches('\r'));
    let header = lines.next().unwrap_or_default();
    let (width, height) = parse_header(header).ok_or_else(|| MapError::Header(header.to_string()))?;
    let mut map = TileMap::new(path, width, height, limits.default_outside)?;
    let mut diagnostics = Vec::new();

    for y in 0..height {
        let Some(row) = lines.next() else {
            diagnostics.push(MapDiagnostic::MissingRows {
                found: y,
                expected: height,
            });
            break;
        };
        let mut len = 0;
        for (x, symbol) in row.chars().take(width).enumerate() {
            len += 1;
            if let Some(id) = limits.tiles.by_symbol(symbol) {
                map.tiles.set(x, y, id);
            } else if let Some(kind) = EntityTileKind::from_symbol(symbol) {
                map.entity_tiles.set(x, y, Some(EntityTileCell { active: true, kind }));
            } else {
                diagnostics.push(MapDiagnostic::UnknownSymbol { x, y, symbol });
            }
        }
        if len < width {
            diagnostics.push(MapDiagnostic::ShortRow { y, len });
        }
    }

    for (offset, line) in lines.enumerate() {
        let line_no = height + 2 + offset;
        if line.trim().is_empty() {
            continue;
        }
        let Some(body) = line.strip_prefix(OPTION_MARKER) else {
            diagnostics.push(MapDiagnostic::UnknownOption {
                line: line_no,
                name: line.to_string(),
            });
            break;
        };
        let mut parts = body.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let args = parts.next().unwrap_or_default().trim();
        match name {
            "ot" => match args.chars().next().and_then(|c| limits.tiles.by_symbol(c)) {
                Some(id) => map.outside = id,
                None => diagnostics.push(MapDiagnostic::BadOption {
                    line: line_no,
                    reason: format!("unknown outside tile '{}'", args),
                }),
            },
            "vr" => match parse_void_rect(args, map.width(), map.height()) {
                Ok((rect, truncated)) => {
                    if truncated {
                        diagnostics.push(MapDiagnostic::BadOption {
                            line: line_no,
                            reason: format!(
                                "void rect text cut to {} characters: '{}'",
                                VoidValue::MAX_TEXT_LEN,
                                rect.value
                            ),
                        });
                    }
                    if !map.add_void_rect(rect, limits.max_void_rects) {
                        diagnostics.push(MapDiagnostic::VoidRectsFull { line: line_no });
                    }
                }
                Err(reason) => diagnostics.push(MapDiagnostic::BadOption {
                    line: line_no,
                    reason,
                }),
            },
            _ => {
                diagnostics.push(MapDiagnostic::UnknownOption {
                    line: line_no,
                    name: name.to_string(),
                });
                break;
            }
        }
    }

    for diagnostic in &diagnostics {
        warn!("[Tileworld map] {}: {}", path, diagnostic);
    }
    Ok((map, diagnostics))
}

/// `x y w h value`. The rect must lie inside the map. The flag reports a
/// text value that was cut.
fn parse_void_rect(args: &str, width: usize, height: usize) -> Result<(VoidRect, bool), String> {
    let malformed = || format!("malformed void rect '{}'", args);
    let mut parts = args.splitn(5, char::is_whitespace);
    let mut dims = [0usize; 4];
    for dim in &mut dims {
        *dim = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
    }
    let raw = parts.next().map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(malformed());
    }
    let [x, y, w, h] = dims;
    let (value, truncated) = VoidValue::parse(raw);
    let rect = VoidRect { x, y, w, h, value };
    if !rect.fits(width, height) {
        return Err(format!(
            "void rect {}x{} at ({}, {}) does not fit the {}x{} map",
            w, h, x, y, width, height
        ));
    }
    Ok((rect, truncated))
}

/// Serializes a map back to text. Active entity tiles win over terrain.
pub fn write_map(map: &TileMap, tiles: &TileTypeRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}x{}", map.width(), map.height());
    for y in 0..map.height() {
        for x in 0..map.width() {
            let symbol = match map.entity_tiles.active_kind(x, y) {
                Some(kind) => kind.symbol(),
                None => tiles.symbol(map.tiles.tile(x, y).unwrap_or(TileId::AIR)),
            };
            out.push(symbol);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "{}ot {}", OPTION_MARKER, tiles.symbol(map.outside));
    for rect in &map.void_rects {
        let value = rect.value.to_string().replace(['\n', '\r'], " ");
        let _ = writeln!(
            out,
            "{}vr {} {} {} {} {}",
            OPTION_MARKER, rect.x, rect.y, rect.w, rect.h, value
        );
    }
    out
}

pub fn save_map_file(map: &TileMap, tiles: &TileTypeRegistry, path: impl AsRef<Path>) -> Result<(), MapError> {
    std::fs::write(path, write_map(map, tiles))?;
    Ok(())
}
