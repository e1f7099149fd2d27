//! First-class move values.
//!
//! A [`Move`] can only be built through its validating factories, so holding
//! one means the position is on the board and the symbol is X or O.

use crate::{GameError, PlayerId, Symbol, types::CELLS};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A validated play: a symbol placed at a position by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Move {
    /// Board position (0-8).
    position: usize,
    /// Mark being placed.
    symbol: Symbol,
    /// Player making the move.
    player_id: PlayerId,
    /// When the move was constructed.
    timestamp: DateTime<Utc>,
}

impl Move {
    /// Validates a candidate play.
    ///
    /// # Errors
    ///
    /// - [`GameError::InvalidPosition`] if `position` is not in 0-8
    /// - [`GameError::InvalidSymbol`] if no symbol is given
    #[instrument(skip(player_id))]
    pub fn new(
        position: i64,
        symbol: Option<Symbol>,
        player_id: impl Into<PlayerId>,
    ) -> Result<Self, GameError> {
        let position = usize::try_from(position)
            .ok()
            .filter(|&pos| pos < CELLS)
            .ok_or(GameError::InvalidPosition(position))?;
        let symbol = symbol.ok_or_else(|| GameError::InvalidSymbol(String::new()))?;

        Ok(Self {
            position,
            symbol,
            player_id: player_id.into(),
            timestamp: Utc::now(),
        })
    }

    /// Validates a candidate play given as raw wire values.
    #[instrument(skip(player_id))]
    pub fn parse(
        position: i64,
        symbol: &str,
        player_id: impl Into<PlayerId>,
    ) -> Result<Self, GameError> {
        // Position is checked first so the error order matches `new`.
        if !(0..CELLS as i64).contains(&position) {
            return Err(GameError::InvalidPosition(position));
        }
        Self::new(position, Some(Symbol::parse(symbol)?), player_id)
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {} ({})", self.symbol, self.position, self.player_id)
    }
}
