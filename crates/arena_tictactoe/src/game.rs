//! Two-seat game aggregate and its status state machine.
//!
//! A game moves `Waiting -> Active -> Finished` and never back. The board is
//! owned by the game; the seated players are identity values the game holds
//! copies of, and the turn and winner refer to a [`Seat`] rather than a player.

use crate::invariants::assert_invariants;
use crate::{Board, GameError, Grid, Move, Player, PlayerId, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Unique, collision-resistant game identifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(transparent)]
pub struct GameId(Uuid);

impl GameId {
    /// Generates a fresh time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle status of a game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameStatus {
    /// Waiting for a second player.
    Waiting,
    /// Both seats filled, moves accepted.
    Active,
    /// Won or drawn; terminal.
    Finished,
}

/// One of the two seats at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    /// Player one, always X.
    One,
    /// Player two, always O.
    Two,
}

impl Seat {
    /// Returns the other seat.
    pub fn other(self) -> Self {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }
}

/// What a successful move did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Game continues; the other seat is now to move.
    InProgress,
    /// The mover completed a line.
    Won(Symbol),
    /// The board filled with no line.
    Draw,
}

impl Transition {
    /// Whether the move ended the game.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Transition::InProgress)
    }
}

/// A tic-tac-toe game between two seats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    id: GameId,
    player1: Player,
    player2: Option<Player>,
    board: Board,
    status: GameStatus,
    current_turn: Option<Seat>,
    winner: Option<Seat>,
    history: Vec<Move>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Game {
    /// Creates a game waiting for an opponent.
    ///
    /// `player1` should already be seated with X; see
    /// [`GameService::create_game`](crate::GameService::create_game).
    #[instrument(skip(player1), fields(player1 = %player1.id()))]
    pub fn new(id: GameId, player1: Player) -> Self {
        info!(game_id = %id, "Creating new game");
        Self {
            id,
            player1,
            player2: None,
            board: Board::new(),
            status: GameStatus::Waiting,
            current_turn: None,
            winner: None,
            history: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Seats the second player and starts the game with player one to move.
    ///
    /// # Errors
    ///
    /// - [`GameError::NotWaiting`] unless the game is waiting
    /// - [`GameError::SelfJoin`] if `player2` is player one
    #[instrument(skip(self, player2), fields(game_id = %self.id, player2 = %player2.id()))]
    pub fn join(&mut self, player2: Player) -> Result<(), GameError> {
        if self.status != GameStatus::Waiting {
            warn!(status = %self.status, "Join rejected");
            return Err(GameError::NotWaiting);
        }

        if player2.id() == self.player1.id() {
            warn!("Player tried to join their own game");
            return Err(GameError::SelfJoin(player2.id().clone()));
        }

        self.player2 = Some(player2);
        self.status = GameStatus::Active;
        self.current_turn = Some(Seat::One);
        self.started_at = Some(Utc::now());

        info!("Game started");
        assert_invariants(self);
        Ok(())
    }

    /// Plays `position` for `player`.
    ///
    /// A winning move finishes the game with the mover as winner; otherwise a
    /// move that fills the board finishes it as a draw; otherwise the turn
    /// passes to the other seat. The turn never changes on a finishing move.
    ///
    /// # Errors
    ///
    /// - [`GameError::NotActive`] unless the game is active
    /// - [`GameError::NotAParticipant`] if `player` holds neither seat
    /// - [`GameError::WrongTurn`] if it is the other seat's turn
    /// - [`GameError::InvalidSymbol`] if the seat has no symbol
    /// - board failures ([`GameError::InvalidPosition`], [`GameError::CellOccupied`])
    #[instrument(skip(self, player), fields(game_id = %self.id, player = %player.id()))]
    pub fn play(&mut self, player: &Player, position: usize) -> Result<Transition, GameError> {
        if self.status != GameStatus::Active {
            warn!(status = %self.status, "Move rejected, game not active");
            return Err(GameError::NotActive);
        }

        let seat = self
            .seat_of(player.id())
            .ok_or_else(|| GameError::NotAParticipant(player.id().clone()))?;

        if Some(seat) != self.current_turn {
            warn!(?seat, current = ?self.current_turn, "Player tried to move out of turn");
            return Err(GameError::WrongTurn(player.id().clone()));
        }

        let seated = self
            .seat(seat)
            .ok_or_else(|| GameError::NotAParticipant(player.id().clone()))?;
        let symbol = seated
            .symbol()
            .ok_or_else(|| GameError::InvalidSymbol(String::new()))?;
        let mover = seated.id().clone();

        let mv = Move::new(
            i64::try_from(position).unwrap_or(i64::MAX),
            Some(symbol),
            mover,
        )?;
        self.board.apply_move(position, symbol)?;
        self.history.push(mv);

        let transition = if self.board.has_winner() {
            self.finish(Some(seat));
            Transition::Won(symbol)
        } else if self.board.is_full() {
            self.finish(None);
            Transition::Draw
        } else {
            self.current_turn = Some(seat.other());
            Transition::InProgress
        };

        debug!(?transition, board = %self.board.display(), "Move applied");
        assert_invariants(self);
        Ok(transition)
    }

    fn finish(&mut self, winner: Option<Seat>) {
        self.status = GameStatus::Finished;
        self.winner = winner;
        self.finished_at = Some(Utc::now());
        info!(game_id = %self.id, ?winner, "Game finished");
    }

    /// Returns which seat `player_id` holds, if any.
    pub fn seat_of(&self, player_id: &str) -> Option<Seat> {
        if self.player1.is(player_id) {
            Some(Seat::One)
        } else if self.player2.as_ref().is_some_and(|p| p.is(player_id)) {
            Some(Seat::Two)
        } else {
            None
        }
    }

    /// Returns the player in `seat`, if seated.
    pub fn seat(&self, seat: Seat) -> Option<&Player> {
        match seat {
            Seat::One => Some(&self.player1),
            Seat::Two => self.player2.as_ref(),
        }
    }

    /// Returns the seated player with the given id.
    pub fn participant(&self, player_id: &str) -> Option<&Player> {
        self.seat_of(player_id).and_then(|seat| self.seat(seat))
    }

    /// Checks whether `player_id` holds either seat.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.seat_of(player_id).is_some()
    }

    /// Returns the game id.
    pub fn id(&self) -> &GameId {
        &self.id
    }

    /// Returns player one.
    pub fn player1(&self) -> &Player {
        &self.player1
    }

    /// Returns player two, once joined.
    pub fn player2(&self) -> &Option<Player> {
        &self.player2
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the status.
    pub fn status(&self) -> &GameStatus {
        &self.status
    }

    /// Returns the player to move while active.
    ///
    /// A finishing move leaves the turn where it was; it is simply no longer
    /// anyone's turn once the game is over.
    pub fn current_turn(&self) -> Option<&Player> {
        if self.status != GameStatus::Active {
            return None;
        }
        self.current_turn.and_then(|seat| self.seat(seat))
    }

    /// Returns the seat holding the turn.
    ///
    /// Unlike [`Game::current_turn`], this still names a seat once the game
    /// is finished: the finishing move does not pass the turn, so it stays
    /// with the seat that made the last move.
    pub fn turn_seat(&self) -> Option<Seat> {
        self.current_turn
    }

    /// Returns the winner of a won game.
    pub fn winner(&self) -> Option<&Player> {
        self.winner.and_then(|seat| self.seat(seat))
    }

    /// Checks whether the game finished without a winner.
    pub fn is_draw(&self) -> bool {
        self.status == GameStatus::Finished && self.winner.is_none()
    }

    /// Returns the applied moves in order.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Returns the creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the second player joined.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the game ended.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Serializable projection for clients.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn state(&self) -> GameState {
        GameState {
            id: self.id,
            status: self.status,
            board: self.board.snapshot(),
            current_turn: self.current_turn().cloned(),
            winner: self.winner().cloned(),
            player1: self.player1.clone(),
            player2: self.player2.clone(),
            move_count: self.history.len(),
        }
    }
}

/// Read-only game projection, safe to send to any client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Game id.
    pub id: GameId,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Board snapshot, row-major.
    pub board: Grid,
    /// Player to move, while active.
    pub current_turn: Option<Player>,
    /// Winner, once won.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Player>,
    /// Player one (X).
    pub player1: Player,
    /// Player two (O), once joined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player2: Option<Player>,
    /// Number of moves played.
    pub move_count: usize,
}

/// Ids of both seated players, for lookups by player.
pub(crate) fn player_ids(game: &Game) -> impl Iterator<Item = &PlayerId> {
    std::iter::once(game.player1.id()).chain(game.player2.as_ref().map(Player::id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::{Invariant, TurnMatchesStatus};

    fn active_game() -> (Game, Player, Player) {
        let alice = Player::new("alice", "Alice").seated(Symbol::X);
        let bob = Player::new("bob", "Bob").seated(Symbol::O);
        let mut game = Game::new(GameId::new(), alice.clone());
        game.join(bob.clone()).expect("Join succeeds");
        (game, alice, bob)
    }

    #[test]
    fn test_finished_game_keeps_turn_with_last_mover() {
        let (mut game, alice, bob) = active_game();
        for (player, pos) in [(&alice, 0), (&bob, 3), (&alice, 1), (&bob, 4), (&alice, 2)] {
            game.play(player, pos).expect("Valid move");
        }
        assert_eq!(*game.status(), GameStatus::Finished);
        assert_eq!(game.turn_seat(), Some(Seat::One));
        assert!(game.current_turn().is_none());
        assert!(TurnMatchesStatus::holds(&game));

        game.current_turn = Some(Seat::Two);
        assert!(!TurnMatchesStatus::holds(&game));
        game.current_turn = None;
        assert!(!TurnMatchesStatus::holds(&game));
    }

    #[test]
    fn test_turn_invariant_tracks_waiting_and_active() {
        let (mut game, _, _) = active_game();
        assert!(TurnMatchesStatus::holds(&game));
        game.current_turn = None;
        assert!(!TurnMatchesStatus::holds(&game));

        let alice = Player::new("alice", "Alice").seated(Symbol::X);
        let mut waiting = Game::new(GameId::new(), alice);
        assert!(TurnMatchesStatus::holds(&waiting));
        waiting.current_turn = Some(Seat::One);
        assert!(!TurnMatchesStatus::holds(&waiting));
    }

    #[test]
    fn test_new_game_is_waiting() {
        let alice = Player::new("alice", "Alice").seated(Symbol::X);
        let game = Game::new(GameId::new(), alice);
        assert_eq!(*game.status(), GameStatus::Waiting);
        assert!(game.current_turn().is_none());
        assert!(game.started_at().is_none());
    }

    #[test]
    fn test_join_starts_game() {
        let (game, alice, _) = active_game();
        assert_eq!(*game.status(), GameStatus::Active);
        assert_eq!(game.current_turn(), Some(&alice));
        assert!(game.started_at().is_some());
    }

    #[test]
    fn test_self_join_rejected() {
        let alice = Player::new("alice", "Alice").seated(Symbol::X);
        let mut game = Game::new(GameId::new(), alice.clone());
        assert_eq!(
            game.join(alice.seated(Symbol::O)),
            Err(GameError::SelfJoin("alice".to_string()))
        );
        assert_eq!(*game.status(), GameStatus::Waiting);
        assert!(game.player2().is_none());
    }

    #[test]
    fn test_second_join_leaves_game_unchanged() {
        let (mut game, _, bob) = active_game();
        let carol = Player::new("carol", "Carol").seated(Symbol::O);
        assert_eq!(game.join(carol), Err(GameError::NotWaiting));
        assert_eq!(game.player2().as_ref(), Some(&bob));
        assert_eq!(*game.status(), GameStatus::Active);
    }

    #[test]
    fn test_move_before_join_rejected() {
        let alice = Player::new("alice", "Alice").seated(Symbol::X);
        let mut game = Game::new(GameId::new(), alice.clone());
        assert_eq!(game.play(&alice, 4), Err(GameError::NotActive));
    }

    #[test]
    fn test_turn_alternates() {
        let (mut game, alice, bob) = active_game();
        assert_eq!(game.play(&alice, 4), Ok(Transition::InProgress));
        assert_eq!(game.current_turn(), Some(&bob));
        assert_eq!(game.play(&bob, 0), Ok(Transition::InProgress));
        assert_eq!(game.current_turn(), Some(&alice));
    }

    #[test]
    fn test_wrong_turn_rejected() {
        let (mut game, _, bob) = active_game();
        assert_eq!(
            game.play(&bob, 4),
            Err(GameError::WrongTurn("bob".to_string()))
        );
        assert_eq!(game.board().occupied_count(), 0);
    }

    #[test]
    fn test_outsider_rejected() {
        let (mut game, _, _) = active_game();
        let mallory = Player::new("mallory", "Mallory");
        assert_eq!(
            game.play(&mallory, 4),
            Err(GameError::NotAParticipant("mallory".to_string()))
        );
    }

    #[test]
    fn test_board_error_propagates_without_turn_change() {
        let (mut game, alice, bob) = active_game();
        game.play(&alice, 4).expect("Valid move");
        assert_eq!(game.play(&bob, 4), Err(GameError::CellOccupied(4)));
        assert_eq!(game.play(&bob, 9), Err(GameError::InvalidPosition(9)));
        assert_eq!(game.current_turn(), Some(&bob));
        assert_eq!(game.history().len(), 1);
    }

    #[test]
    fn test_unseated_symbol_rejected() {
        let alice = Player::new("alice", "Alice");
        let mut game = Game::new(GameId::new(), alice.clone());
        game.join(Player::new("bob", "Bob")).expect("Join succeeds");
        assert!(matches!(
            game.play(&alice, 0),
            Err(GameError::InvalidSymbol(_))
        ));
    }

    #[test]
    fn test_state_projection() {
        let (mut game, alice, bob) = active_game();
        game.play(&alice, 4).expect("Valid move");
        let state = game.state();
        assert_eq!(state.status, GameStatus::Active);
        assert_eq!(state.current_turn, Some(bob));
        assert_eq!(state.move_count, 1);
        assert_eq!(state.board[1][1], crate::Square::Occupied(Symbol::X));

        let json = serde_json::to_value(&state).expect("Serializable");
        assert_eq!(json["status"], "active");
        assert!(json.get("winner").is_none());
    }

    #[test]
    fn test_game_id_round_trips_through_string() {
        let id = GameId::new();
        let parsed: GameId = id.to_string().parse().expect("Parses");
        assert_eq!(parsed, id);
    }
}
