//! Validation failures returned by the board, game and service layers.

use tracing::instrument;

/// A rejected game operation.
///
/// Every variant is a validation failure: the operation had no effect and the
/// game is exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum GameError {
    /// Position outside the 0-8 board range.
    #[display("Position {} is outside the board (0-8)", _0)]
    InvalidPosition(i64),

    /// Symbol that is neither X nor O, or a seat without an assigned symbol.
    #[display("Invalid symbol {:?} (must be X or O)", _0)]
    InvalidSymbol(String),

    /// Target cell already holds a mark.
    #[display("Cell {} is already occupied", _0)]
    CellOccupied(usize),

    /// Join attempted on a game that is not waiting for an opponent.
    #[display("Game is not waiting for players")]
    NotWaiting,

    /// Player tried to join their own game.
    #[display("Player {} cannot join their own game", _0)]
    SelfJoin(String),

    /// Move attempted on a game that is not active.
    #[display("Game is not active")]
    NotActive,

    /// Move attempted out of turn.
    #[display("It is not {}'s turn", _0)]
    WrongTurn(String),

    /// Move attempted by someone who holds neither seat.
    #[display("Player {} is not in this game", _0)]
    NotAParticipant(String),

    /// Second seat is already taken.
    #[display("Game is already full")]
    GameFull,
}

impl std::error::Error for GameError {}

impl GameError {
    /// Stable machine-readable code for wire and HTTP responses.
    #[instrument]
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidPosition(_) => "INVALID_POSITION",
            GameError::InvalidSymbol(_) => "INVALID_SYMBOL",
            GameError::CellOccupied(_) => "CELL_OCCUPIED",
            GameError::NotWaiting => "NOT_WAITING",
            GameError::SelfJoin(_) => "SELF_JOIN",
            GameError::NotActive => "NOT_ACTIVE",
            GameError::WrongTurn(_) => "WRONG_TURN",
            GameError::NotAParticipant(_) => "NOT_A_PARTICIPANT",
            GameError::GameFull => "GAME_FULL",
        }
    }

    /// Whether the failure is a conflict with the game's current state
    /// rather than a malformed request.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            GameError::NotWaiting
                | GameError::NotActive
                | GameError::WrongTurn(_)
                | GameError::GameFull
                | GameError::CellOccupied(_)
        )
    }
}
