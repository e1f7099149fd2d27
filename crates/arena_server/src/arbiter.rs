//! Game-backed move validation for the chat hub.

use crate::GameStore;
use arena_hub::{ClientInfo, MoveArbiter, MoveVerdict};
use arena_tictactoe::{Game, GameId, Transition};
use std::str::FromStr;
use tracing::{debug, instrument};

/// Human-readable result of a finishing move, `None` while the game goes on.
pub fn outcome_text(game: &Game, transition: Transition) -> Option<String> {
    match transition {
        Transition::InProgress => None,
        Transition::Won(symbol) => Some(match game.winner() {
            Some(winner) => format!("{} wins as {}", winner.name(), symbol),
            None => format!("{} wins", symbol),
        }),
        Transition::Draw => Some("Draw".to_string()),
    }
}

/// Applies moves sent over a session's socket to the stored game.
///
/// The session id is the game id; the connection's player id must hold a
/// seat in that game.
#[derive(Debug, Clone)]
pub struct GameArbiter {
    store: GameStore,
}

impl GameArbiter {
    /// Arbitrates against `store`.
    pub fn new(store: GameStore) -> Self {
        Self { store }
    }
}

impl MoveArbiter for GameArbiter {
    #[instrument(skip(self, origin), fields(session_id = %origin.session_id(), player_id = %origin.player_id()))]
    fn arbitrate(&self, origin: &ClientInfo, position: i64) -> Result<MoveVerdict, String> {
        let game_id = GameId::from_str(origin.session_id())
            .map_err(|_| format!("Session {} is not a game", origin.session_id()))?;

        let (game, transition) = self
            .store
            .play(&game_id, origin.player_id(), position)
            .map_err(|e| e.to_string())?;

        let symbol = game
            .participant(origin.player_id())
            .and_then(|p| *p.symbol())
            .map(|s| s.to_string())
            .unwrap_or_default();
        let move_number = game.history().len();
        debug!(%symbol, ?transition, move_number, "Move arbitrated");

        Ok(MoveVerdict::new(
            symbol,
            outcome_text(&game, transition),
            move_number,
        ))
    }
}
