//! Stateless coordination of game creation, joining and moves.
//!
//! The service holds no games itself. Callers own the collection (see the
//! server's in-memory store) and pass games or slices of games in.

use crate::invariants::{GameInvariants, InvariantSet, InvariantViolation};
use crate::{Game, GameError, GameId, GameStatus, Move, Player, Symbol, Transition, game};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Per-game statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct GameStatistics {
    /// Game id.
    game_id: GameId,
    /// Status at the time of computation.
    status: GameStatus,
    /// Occupied cells.
    total_moves: usize,
    /// Milliseconds from start to finish, or to now while still running.
    duration_ms: i64,
}

/// Domain service for game orchestration. Adds no rules of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameService;

impl GameService {
    /// Creates a new game service.
    pub fn new() -> Self {
        Self
    }

    /// Seats `player1` as X and creates a waiting game.
    #[instrument(skip(self, player1), fields(player1 = %player1.id()))]
    pub fn create_game(&self, player1: Player) -> Game {
        let game = Game::new(GameId::new(), player1.seated(Symbol::X));
        info!(game_id = %game.id(), "Game created");
        game
    }

    /// Seats `player2` as O and joins the game.
    ///
    /// # Errors
    ///
    /// [`GameError::GameFull`] if the second seat is taken, otherwise any
    /// failure of [`Game::join`].
    #[instrument(skip(self, game, player2), fields(game_id = %game.id(), player2 = %player2.id()))]
    pub fn join_game(&self, game: &mut Game, player2: Player) -> Result<(), GameError> {
        if game.player2().is_some() {
            debug!("Second seat already taken");
            return Err(GameError::GameFull);
        }
        game.join(player2.seated(Symbol::O))
    }

    /// Validates the move shape, then plays it.
    ///
    /// # Errors
    ///
    /// The first failure of [`Move::new`] or [`Game::play`].
    #[instrument(skip(self, game, player), fields(game_id = %game.id(), player = %player.id()))]
    pub fn make_move(
        &self,
        game: &mut Game,
        player: &Player,
        position: i64,
    ) -> Result<Transition, GameError> {
        let mv = Move::new(position, *player.symbol(), player.id().clone())?;
        debug!(%mv, "Move validated");
        game.play(player, *mv.position())
    }

    /// Games still waiting for an opponent.
    pub fn available_games<'a>(&self, games: impl IntoIterator<Item = &'a Game>) -> Vec<&'a Game> {
        games
            .into_iter()
            .filter(|g| *g.status() == GameStatus::Waiting)
            .collect()
    }

    /// Games in which `player_id` holds a seat.
    pub fn player_games<'a>(
        &self,
        games: impl IntoIterator<Item = &'a Game>,
        player_id: &str,
    ) -> Vec<&'a Game> {
        games
            .into_iter()
            .filter(|g| game::player_ids(g).any(|id| id == player_id))
            .collect()
    }

    /// Looks a game up by id.
    pub fn find_game<'a>(
        &self,
        games: impl IntoIterator<Item = &'a Game>,
        game_id: &GameId,
    ) -> Option<&'a Game> {
        games.into_iter().find(|g| g.id() == game_id)
    }

    /// Checks whether the game reached its terminal state.
    pub fn is_finished(&self, game: &Game) -> bool {
        *game.status() == GameStatus::Finished
    }

    /// Returns the winner of a finished game.
    pub fn winner<'a>(&self, game: &'a Game) -> Option<&'a Player> {
        game.winner()
    }

    /// Checks whether the game ended in a draw.
    pub fn is_draw(&self, game: &Game) -> bool {
        game.is_draw()
    }

    /// Returns the player to move.
    pub fn current_turn<'a>(&self, game: &'a Game) -> Option<&'a Player> {
        game.current_turn()
    }

    /// Checks every game invariant.
    ///
    /// # Errors
    ///
    /// Returns all violated invariants.
    pub fn validate_game_state(&self, game: &Game) -> Result<(), Vec<InvariantViolation>> {
        GameInvariants::check_all(game)
    }

    /// Computes statistics with the duration measured up to now.
    pub fn statistics(&self, game: &Game) -> GameStatistics {
        self.statistics_at(game, Utc::now())
    }

    /// Computes statistics with an explicit clock reading.
    pub fn statistics_at(&self, game: &Game, now: DateTime<Utc>) -> GameStatistics {
        let duration_ms = game
            .started_at()
            .map(|start| {
                let end = game.finished_at().unwrap_or(now);
                (end - start).num_milliseconds()
            })
            .unwrap_or(0);

        GameStatistics::new(
            *game.id(),
            *game.status(),
            game.board().occupied_count(),
            duration_ms,
        )
    }

    /// Picks a random open position, or `None` on a full board.
    ///
    /// The caller supplies the random source so it can be seeded once per
    /// process, or deterministically in tests.
    pub fn random_available_position<R: Rng + ?Sized>(
        &self,
        game: &Game,
        rng: &mut R,
    ) -> Option<usize> {
        let open = game.board().open_positions();
        if open.is_empty() {
            return None;
        }
        Some(open[rng.random_range(0..open.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn alice() -> Player {
        Player::new("alice", "Alice")
    }

    fn bob() -> Player {
        Player::new("bob", "Bob")
    }

    #[test]
    fn test_create_assigns_x() {
        let game = GameService::new().create_game(alice());
        assert_eq!(*game.player1().symbol(), Some(Symbol::X));
        assert_eq!(*game.status(), GameStatus::Waiting);
    }

    #[test]
    fn test_join_assigns_o() {
        let service = GameService::new();
        let mut game = service.create_game(alice());
        service.join_game(&mut game, bob()).expect("Join succeeds");
        let p2 = game.player2().as_ref().expect("Seated");
        assert_eq!(*p2.symbol(), Some(Symbol::O));
    }

    #[test]
    fn test_join_full_game() {
        let service = GameService::new();
        let mut game = service.create_game(alice());
        service.join_game(&mut game, bob()).expect("Join succeeds");
        let before = game.clone();
        assert_eq!(
            service.join_game(&mut game, Player::new("carol", "Carol")),
            Err(GameError::GameFull)
        );
        assert_eq!(game, before);
    }

    #[test]
    fn test_make_move_requires_seated_symbol() {
        let service = GameService::new();
        let mut game = service.create_game(alice());
        service.join_game(&mut game, bob()).expect("Join succeeds");
        // Bare identity without a symbol fails the move factory.
        assert!(matches!(
            service.make_move(&mut game, &alice(), 4),
            Err(GameError::InvalidSymbol(_))
        ));
        let seated = game.player1().clone();
        assert_eq!(
            service.make_move(&mut game, &seated, 11),
            Err(GameError::InvalidPosition(11))
        );
        assert_eq!(
            service.make_move(&mut game, &seated, 4),
            Ok(Transition::InProgress)
        );
    }

    #[test]
    fn test_listing() {
        let service = GameService::new();
        let waiting = service.create_game(alice());
        let mut active = service.create_game(Player::new("carol", "Carol"));
        service.join_game(&mut active, bob()).expect("Join succeeds");
        let games = vec![waiting.clone(), active.clone()];

        let available = service.available_games(&games);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id(), waiting.id());

        let bobs = service.player_games(&games, "bob");
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].id(), active.id());
        assert!(service.player_games(&games, "nobody").is_empty());

        assert!(service.find_game(&games, active.id()).is_some());
        assert!(service.find_game(&games, &GameId::new()).is_none());
    }

    #[test]
    fn test_statistics_before_start() {
        let service = GameService::new();
        let game = service.create_game(alice());
        let stats = service.statistics(&game);
        assert_eq!(*stats.total_moves(), 0);
        assert_eq!(*stats.duration_ms(), 0);
        assert_eq!(*stats.status(), GameStatus::Waiting);
    }

    #[test]
    fn test_statistics_runs_to_now() {
        let service = GameService::new();
        let mut game = service.create_game(alice());
        service.join_game(&mut game, bob()).expect("Join succeeds");
        let seated = game.player1().clone();
        service.make_move(&mut game, &seated, 0).expect("Valid move");

        let started = game.started_at().expect("Started");
        let stats = service.statistics_at(&game, started + chrono::Duration::seconds(5));
        assert_eq!(*stats.total_moves(), 1);
        assert_eq!(*stats.duration_ms(), 5_000);
    }

    #[test]
    fn test_random_position_is_open_and_deterministic() {
        let service = GameService::new();
        let mut game = service.create_game(alice());
        service.join_game(&mut game, bob()).expect("Join succeeds");
        let seated = game.player1().clone();
        service.make_move(&mut game, &seated, 4).expect("Valid move");

        let first = service.random_available_position(&game, &mut StdRng::seed_from_u64(7));
        let second = service.random_available_position(&game, &mut StdRng::seed_from_u64(7));
        assert_eq!(first, second);
        let pos = first.expect("Open cells remain");
        assert!(game.board().is_position_open(pos));
    }

    #[test]
    fn test_validate_fresh_game() {
        let service = GameService::new();
        let game = service.create_game(alice());
        assert!(service.validate_game_state(&game).is_ok());
    }
}
