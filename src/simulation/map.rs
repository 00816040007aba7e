//! Static map description
//!
//! A rectangular grid of single-character cells. Four glyphs are recognised:
//! `x` node, `=` horizontal road, `|` vertical road and `#` empty.

use std::fs;
use std::path::Path;

use super::error::MapError;
use super::types::GridPos;

pub const NODE_GLYPH: char = 'x';
pub const H_ROAD_GLYPH: char = '=';
pub const V_ROAD_GLYPH: char = '|';
pub const EMPTY_GLYPH: char = '#';

const SAMPLE_MAP: &str = include_str!("../../maps/sample_map.txt");

/// Contents of one map cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Node,
    HorizontalRoad,
    VerticalRoad,
    Empty,
}

impl Tile {
    pub fn from_glyph(glyph: char) -> Option<Tile> {
        match glyph {
            NODE_GLYPH => Some(Tile::Node),
            H_ROAD_GLYPH => Some(Tile::HorizontalRoad),
            V_ROAD_GLYPH => Some(Tile::VerticalRoad),
            EMPTY_GLYPH => Some(Tile::Empty),
            _ => None,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Tile::Node => NODE_GLYPH,
            Tile::HorizontalRoad => H_ROAD_GLYPH,
            Tile::VerticalRoad => V_ROAD_GLYPH,
            Tile::Empty => EMPTY_GLYPH,
        }
    }

    pub fn is_road(self) -> bool {
        matches!(self, Tile::HorizontalRoad | Tile::VerticalRoad)
    }
}

/// Parsed map grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapGrid {
    tiles: Vec<Vec<Tile>>,
    width: usize,
}

impl MapGrid {
    /// Parse a map from text. Rows are whitespace separated, blank lines
    /// are ignored.
    pub fn parse(text: &str) -> Result<Self, MapError> {
        let mut tiles = Vec::new();
        let mut width = None;

        for (row, line) in text.split_whitespace().enumerate() {
            let mut tile_row = Vec::with_capacity(line.len());
            for (col, glyph) in line.chars().enumerate() {
                let tile = Tile::from_glyph(glyph).ok_or(MapError::UnknownGlyph {
                    glyph,
                    pos: GridPos::new(col, row),
                })?;
                tile_row.push(tile);
            }

            let expected = *width.get_or_insert(tile_row.len());
            if tile_row.len() != expected {
                return Err(MapError::RaggedRow {
                    row,
                    found: tile_row.len(),
                    expected,
                });
            }
            tiles.push(tile_row);
        }

        let width = width.ok_or(MapError::Empty)?;
        Ok(Self { tiles, width })
    }

    /// Load a map from a text file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// The bundled sample map
    pub fn sample() -> Result<Self, MapError> {
        Self::parse(SAMPLE_MAP)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.tiles.len()
    }

    /// Tile at a cell, `None` outside the grid
    pub fn tile(&self, pos: GridPos) -> Option<Tile> {
        self.tiles.get(pos.y).and_then(|row| row.get(pos.x)).copied()
    }

    /// All cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (GridPos, Tile)> + '_ {
        self.tiles.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .map(move |(x, tile)| (GridPos::new(x, y), *tile))
        })
    }

    /// Render the grid back to text, one row per line
    pub fn render(&self) -> String {
        self.tiles
            .iter()
            .map(|row| row.iter().map(|t| t.glyph()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
