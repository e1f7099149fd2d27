//! Hook through which the hub asks the game whether a move stands.

use crate::ClientInfo;
use derive_getters::Getters;
use derive_new::new;

/// Outcome of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct MoveVerdict {
    /// Symbol the game placed, which replaces whatever the client claimed.
    symbol: String,
    /// Human-readable result when the move ended the game.
    outcome: Option<String>,
    /// 1-based place of the move in the game's history.
    move_number: usize,
}

/// Authority over move legality for a session.
///
/// Implemented by the server on top of its game store. The hub calls it from
/// the sending client's task, never from the control loop.
pub trait MoveArbiter: Send + Sync {
    /// Applies `position` for the player behind `origin`.
    ///
    /// # Errors
    ///
    /// A human-readable rejection reason, delivered to `origin` only as an
    /// `INVALID_MOVE` error.
    fn arbitrate(&self, origin: &ClientInfo, position: i64) -> Result<MoveVerdict, String>;
}
