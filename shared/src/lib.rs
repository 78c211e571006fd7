use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_PLAYER_COLOR: &str = "White";
pub const DEFAULT_GRID_DIVISIONS: usize = 8;
pub const EMPTY_CELL_GLYPH: &str = "=====";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),
    #[error("failed to encode command: {0}")]
    Encode(#[source] serde_json::Error),
}

/// 24-bit colour packed into an integer, as the server sends it.
///
/// The server may encode the value either as a JSON number or as a decimal
/// string; both decode to the same colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawColor", into = "u32")]
pub struct Rgb(u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColor {
    Number(u32),
    Text(String),
}

impl TryFrom<RawColor> for Rgb {
    type Error = String;

    fn try_from(raw: RawColor) -> Result<Self, Self::Error> {
        match raw {
            RawColor::Number(value) => Ok(Rgb(value)),
            RawColor::Text(text) => text
                .trim()
                .parse::<u32>()
                .map(Rgb)
                .map_err(|_| format!("invalid colour value {:?}", text)),
        }
    }
}

impl From<Rgb> for u32 {
    fn from(color: Rgb) -> Self {
        color.0
    }
}

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFFFFFF);
    pub const BLACK: Rgb = Rgb(0x000000);

    pub const fn new(value: u32) -> Self {
        Rgb(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn components(&self) -> (u8, u8, u8) {
        let v = self.0 & 0xFFFFFF;
        ((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    /// CSS-style `#rrggbb` label; bits above 24 are ignored.
    pub fn hex(&self) -> String {
        format!("#{:06x}", self.0 & 0xFFFFFF)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// A player's piece occupying one grid position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub color: Rgb,
    #[serde(default)]
    pub score: i64,
}

impl Piece {
    pub fn new(color: Rgb, score: i64) -> Self {
        Self { color, score }
    }
}

/// One grid position. `None` is the empty sentinel, encoded as JSON `null`.
pub type Cell = Option<Piece>;

/// Row-major grid of cells with the origin in the top-left corner.
///
/// Dimensions are whatever the server last sent; rows are not required to be
/// the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldMap(Vec<Vec<Cell>>);

impl WorldMap {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self(rows)
    }

    pub fn empty(width: usize, height: usize) -> Self {
        Self(vec![vec![None; width]; height])
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.0
    }

    pub fn height(&self) -> usize {
        self.0.len()
    }

    /// Length of the longest row.
    pub fn width(&self) -> usize {
        self.0.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Piece> {
        self.0.get(y).and_then(|row| row.get(x)).and_then(Option::as_ref)
    }

    /// Occupied cells as `(x, y, piece)` in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, &Piece)> {
        self.0.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(x, cell)| cell.as_ref().map(|piece| (x, y, piece)))
        })
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied().count()
    }
}

/// Identity token of the local player: a colour name or a session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerIdentity(String);

impl PlayerIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// Resolves the optional colour parameter, falling back to the default colour.
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            Some(color) if !color.is_empty() => Self::new(color),
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PlayerIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYER_COLOR)
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Client-originated move intent. Never part of the local game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCommand {
    #[serde(rename = "player_id")]
    pub actor: PlayerIdentity,
    pub direction: Direction,
}

impl MoveCommand {
    pub fn new(actor: PlayerIdentity, direction: Direction) -> Self {
        Self { actor, direction }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Inbound frame carrying a full board snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFrame {
    pub world_map: WorldMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

impl SnapshotFrame {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::MalformedFrame)
    }

    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(ProtocolError::MalformedFrame)
    }
}
