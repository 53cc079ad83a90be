//! Grid map model.
//!
//! Maps load from a rectangular text grid: `#` is a wall, `.` is an
//! empty cell, `@` marks a respawn point (stored as empty, with the
//! coordinate recorded). Rows of unequal width and unknown symbols fail
//! the load. After loading, the grid is immutable except for wall cells
//! cleared by terrain-destructive explosions.
//!
//! Player coordinates are 1-indexed and map-relative; anything outside
//! the grid behaves like a wall.

use std::fs;
use std::path::Path;
use thiserror::Error;

pub const WALL_SYMBOL: char = '#';
pub const EMPTY_SYMBOL: char = '.';
pub const RESPAWN_SYMBOL: char = '@';

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),
    #[error("map has no rows")]
    Empty,
    #[error("row {line} has width {got}, expected {expected}")]
    RaggedRow {
        line: usize,
        got: usize,
        expected: usize,
    },
    #[error("unknown symbol '{symbol}' on row {line}")]
    UnknownSymbol { line: usize, symbol: char },
    #[error("map has no respawn points")]
    NoRespawns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Wall,
}

#[derive(Debug, Clone)]
pub struct Map {
    name: String,
    width: u16,
    height: u16,
    grid: Vec<Cell>,
    respawns: Vec<(u16, u16)>,
}

impl Map {
    /// Parses a map from its text grid.
    pub fn parse(name: &str, text: &str) -> Result<Self, MapError> {
        let mut width = None;
        let mut grid = Vec::new();
        let mut respawns = Vec::new();
        let mut height = 0u16;

        for (row, line) in text.lines().enumerate() {
            let row_width = line.chars().count();
            match width {
                None => width = Some(row_width),
                Some(expected) if expected != row_width => {
                    return Err(MapError::RaggedRow {
                        line: row + 1,
                        got: row_width,
                        expected,
                    });
                }
                Some(_) => {}
            }

            for (col, symbol) in line.chars().enumerate() {
                let cell = match symbol {
                    WALL_SYMBOL => Cell::Wall,
                    EMPTY_SYMBOL => Cell::Empty,
                    RESPAWN_SYMBOL => {
                        // 1-indexed, matching player coordinates.
                        respawns.push((col as u16 + 1, row as u16 + 1));
                        Cell::Empty
                    }
                    other => {
                        return Err(MapError::UnknownSymbol {
                            line: row + 1,
                            symbol: other,
                        });
                    }
                };
                grid.push(cell);
            }

            height += 1;
        }

        let width = width.ok_or(MapError::Empty)? as u16;
        if height == 0 || width == 0 {
            return Err(MapError::Empty);
        }
        if respawns.is_empty() {
            return Err(MapError::NoRespawns);
        }

        Ok(Map {
            name: name.to_string(),
            width,
            height,
            grid,
            respawns,
        })
    }

    /// Loads a map file; the map name is the file stem.
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let text = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Map::parse(&name, &text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Cell at a 1-indexed coordinate; off-map reads as a wall.
    pub fn cell(&self, x: u16, y: u16) -> Cell {
        if x == 0 || y == 0 || x > self.width || y > self.height {
            return Cell::Wall;
        }
        self.grid[(y as usize - 1) * self.width as usize + (x as usize - 1)]
    }

    /// The cheap grid-only occupancy check used for client prediction.
    pub fn is_blocked(&self, x: u16, y: u16) -> bool {
        self.cell(x, y) == Cell::Wall
    }

    /// Clears a wall cell after an explosion. Returns false if the
    /// coordinate held no destructible wall (off-map edges included).
    pub fn destroy_wall(&mut self, x: u16, y: u16) -> bool {
        if x == 0 || y == 0 || x > self.width || y > self.height {
            return false;
        }
        let index = (y as usize - 1) * self.width as usize + (x as usize - 1);
        if self.grid[index] == Cell::Wall {
            self.grid[index] = Cell::Empty;
            true
        } else {
            false
        }
    }

    /// Respawn coordinates gathered at load time (server-side only use).
    pub fn respawns(&self) -> &[(u16, u16)] {
        &self.respawns
    }
}
