//! First-class invariants for a two-seat game.
//!
//! Invariants are logical properties that must hold after every transition.
//! They are testable independently and back [`GameService::validate_game_state`].
//!
//! [`GameService::validate_game_state`]: crate::GameService::validate_game_state

use crate::{Game, GameStatus};
use tracing::warn;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{}", description)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2, I3, I4> InvariantSet<S> for (I1, I2, I3, I4)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
    I4: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let violations: Vec<_> = [
            (I1::holds(state), I1::description()),
            (I2::holds(state), I2::description()),
            (I3::holds(state), I3::description()),
            (I4::holds(state), I4::description()),
        ]
        .into_iter()
        .filter(|(holds, _)| !holds)
        .map(|(_, description)| InvariantViolation::new(description))
        .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// The turn is unset while waiting, set while active, and after the game
/// finishes stays with the seat that made the last move.
pub struct TurnMatchesStatus;

impl Invariant<Game> for TurnMatchesStatus {
    fn holds(game: &Game) -> bool {
        match game.status() {
            GameStatus::Waiting => game.turn_seat().is_none(),
            GameStatus::Active => game.turn_seat().is_some(),
            GameStatus::Finished => {
                let last_mover = game
                    .history()
                    .last()
                    .and_then(|mv| game.seat_of(mv.player_id()));
                last_mover.is_some() && game.turn_seat() == last_mover
            }
        }
    }

    fn description() -> &'static str {
        "Turn must be unset while waiting, set while active, and frozen on the finishing mover"
    }
}

/// A started game has both seats filled.
pub struct SeatsFilledOnceStarted;

impl Invariant<Game> for SeatsFilledOnceStarted {
    fn holds(game: &Game) -> bool {
        *game.status() == GameStatus::Waiting || game.player2().is_some()
    }

    fn description() -> &'static str {
        "Active or finished game must have two players"
    }
}

/// A winner exists only on a finished board with a complete line.
pub struct WinnerHasLine;

impl Invariant<Game> for WinnerHasLine {
    fn holds(game: &Game) -> bool {
        match game.winner() {
            Some(winner) => {
                *game.status() == GameStatus::Finished
                    && game.board().winner().is_some()
                    && game.board().winner() == *winner.symbol()
            }
            None => {
                *game.status() != GameStatus::Finished || !game.board().has_winner()
            }
        }
    }

    fn description() -> &'static str {
        "Winner must be set exactly when a finished board has a line"
    }
}

/// The two seats belong to different players.
pub struct DistinctSeats;

impl Invariant<Game> for DistinctSeats {
    fn holds(game: &Game) -> bool {
        game.player2()
            .as_ref()
            .is_none_or(|p2| p2.id() != game.player1().id())
    }

    fn description() -> &'static str {
        "A player cannot hold both seats"
    }
}

/// Every invariant a [`Game`] maintains.
pub type GameInvariants = (
    TurnMatchesStatus,
    SeatsFilledOnceStarted,
    WinnerHasLine,
    DistinctSeats,
);

/// Logs any violated invariant. Used after transitions in debug builds.
pub(crate) fn assert_invariants(game: &Game) {
    if let Err(violations) = GameInvariants::check_all(game) {
        for violation in &violations {
            warn!(game_id = %game.id(), %violation, "Game invariant violated");
        }
        debug_assert!(violations.is_empty(), "Game invariants violated: {violations:?}");
    }
}
