//! Core domain types for tic-tac-toe.

use crate::GameError;
use crate::rules;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Number of cells on the board.
pub const CELLS: usize = 9;

/// A player's mark.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Symbol {
    /// Player one's mark (moves first).
    X,
    /// Player two's mark.
    O,
}

impl Symbol {
    /// Returns the opposing symbol.
    pub fn opponent(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }

    /// Parses a raw symbol string, rejecting anything but `X` or `O`.
    #[instrument]
    pub fn parse(raw: &str) -> Result<Self, GameError> {
        raw.parse()
            .map_err(|_| GameError::InvalidSymbol(raw.to_string()))
    }
}

/// A cell on the tic-tac-toe board.
///
/// Serializes as `""`, `"X"` or `"O"` so snapshots read naturally on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Square {
    /// Empty cell.
    Empty,
    /// Cell holding a mark.
    Occupied(Symbol),
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        match square {
            Square::Empty => String::new(),
            Square::Occupied(symbol) => symbol.to_string(),
        }
    }
}

impl TryFrom<String> for Square {
    type Error = GameError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw.is_empty() {
            Ok(Square::Empty)
        } else {
            Symbol::parse(&raw).map(Square::Occupied)
        }
    }
}

/// 3x3 board snapshot, row-major.
pub type Grid = [[Square; 3]; 3];

/// 3x3 tic-tac-toe board.
///
/// Cells only ever go from empty to occupied; there is no way to clear or
/// overwrite a mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Squares in row-major order (0-8).
    squares: [Square; CELLS],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self {
            squares: [Square::Empty; CELLS],
        }
    }

    /// Gets the square at the given position (0-8).
    pub fn get(&self, pos: usize) -> Option<Square> {
        self.squares.get(pos).copied()
    }

    /// Places `symbol` at `position`.
    ///
    /// # Errors
    ///
    /// - [`GameError::InvalidPosition`] if `position` is not in 0-8
    /// - [`GameError::CellOccupied`] if the cell already holds a mark
    #[instrument(skip(self))]
    pub fn apply_move(&mut self, position: usize, symbol: Symbol) -> Result<(), GameError> {
        let square = self
            .squares
            .get_mut(position)
            .ok_or_else(|| {
                GameError::InvalidPosition(i64::try_from(position).unwrap_or(i64::MAX))
            })?;

        if *square != Square::Empty {
            return Err(GameError::CellOccupied(position));
        }

        *square = Square::Occupied(symbol);
        Ok(())
    }

    /// Checks whether any row, column or diagonal is complete.
    pub fn has_winner(&self) -> bool {
        rules::check_winner(self).is_some()
    }

    /// Returns the symbol owning a complete line, if any.
    pub fn winner(&self) -> Option<Symbol> {
        rules::check_winner(self)
    }

    /// Checks if every cell is occupied.
    pub fn is_full(&self) -> bool {
        rules::is_full(self)
    }

    /// Checks if a position is on the board and empty. Never fails.
    pub fn is_position_open(&self, position: usize) -> bool {
        matches!(self.get(position), Some(Square::Empty))
    }

    /// Positions that can still be played, ascending.
    pub fn open_positions(&self) -> Vec<usize> {
        (0..CELLS).filter(|&pos| self.is_position_open(pos)).collect()
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.squares
            .iter()
            .filter(|s| **s != Square::Empty)
            .count()
    }

    /// Returns all squares as a slice.
    pub fn squares(&self) -> &[Square; CELLS] {
        &self.squares
    }

    /// Read-only 3x3 copy for transmission.
    pub fn snapshot(&self) -> Grid {
        let mut grid = [[Square::Empty; 3]; 3];
        for (pos, square) in self.squares.iter().enumerate() {
            grid[pos / 3][pos % 3] = *square;
        }
        grid
    }

    /// Formats the board as a human-readable string.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let pos = row * 3 + col;
                let symbol = match self.squares[pos] {
                    Square::Empty => (pos + 1).to_string(),
                    Square::Occupied(symbol) => symbol.to_string(),
                };
                result.push_str(&symbol);
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n-+-+-\n");
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
