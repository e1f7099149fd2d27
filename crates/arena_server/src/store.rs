//! In-memory game collection shared by every request.

use arena_tictactoe::{
    Game, GameError, GameId, GameService, GameStatistics, Player, Transition,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument, warn};

/// A store operation that failed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From)]
pub enum StoreError {
    /// No game with this id.
    #[display("Game {} not found", _0)]
    #[from(ignore)]
    NotFound(GameId),
    /// The game refused the operation.
    #[display("{}", _0)]
    Game(GameError),
}

impl std::error::Error for StoreError {}

/// Thread-safe map of games by id.
///
/// Every operation takes the lock once, so a read-modify-write on one game is
/// atomic with respect to other requests.
#[derive(Debug, Clone, Default)]
pub struct GameStore {
    games: Arc<RwLock<HashMap<GameId, Game>>>,
    service: GameService,
}

impl GameStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating game store");
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<GameId, Game>> {
        self.games.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<GameId, Game>> {
        self.games.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a game with `player1` as X.
    #[instrument(skip(self, player1), fields(player1 = %player1.id()))]
    pub fn create(&self, player1: Player) -> Game {
        let game = self.service.create_game(player1);
        self.write().insert(*game.id(), game.clone());
        game
    }

    /// Looks a game up by id.
    pub fn get(&self, id: &GameId) -> Option<Game> {
        let game = self.read().get(id).cloned();
        if game.is_none() {
            debug!(game_id = %id, "Game not found");
        }
        game
    }

    /// Seats `player2` as O and starts the game.
    #[instrument(skip(self, player2), fields(game_id = %id, player2 = %player2.id()))]
    pub fn join(&self, id: &GameId, player2: Player) -> Result<Game, StoreError> {
        let mut games = self.write();
        let game = games.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        self.service.join_game(game, player2)?;
        Ok(game.clone())
    }

    /// Plays `position` for the seated player with `player_id`.
    ///
    /// Outsiders are refused before the game is consulted, so the move factory
    /// always sees a seated player with a symbol.
    #[instrument(skip(self), fields(game_id = %id))]
    pub fn play(
        &self,
        id: &GameId,
        player_id: &str,
        position: i64,
    ) -> Result<(Game, Transition), StoreError> {
        let mut games = self.write();
        let game = games.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        let player = game
            .participant(player_id)
            .cloned()
            .ok_or_else(|| GameError::NotAParticipant(player_id.to_string()))?;

        let transition = self.service.make_move(game, &player, position).map_err(|e| {
            warn!(player_id, position, error = %e, "Invalid move");
            e
        })?;
        Ok((game.clone(), transition))
    }

    /// Games waiting for an opponent, oldest first.
    pub fn available(&self) -> Vec<Game> {
        let games = self.read();
        let mut available: Vec<Game> = self
            .service
            .available_games(games.values())
            .into_iter()
            .cloned()
            .collect();
        available.sort_by_key(|g| *g.id());
        available
    }

    /// Games in which `player_id` holds a seat, oldest first.
    pub fn player_games(&self, player_id: &str) -> Vec<Game> {
        let games = self.read();
        let mut found: Vec<Game> = self
            .service
            .player_games(games.values(), player_id)
            .into_iter()
            .cloned()
            .collect();
        found.sort_by_key(|g| *g.id());
        found
    }

    /// Statistics for one game.
    pub fn statistics(&self, id: &GameId) -> Result<GameStatistics, StoreError> {
        let games = self.read();
        let game = games.get(id).ok_or(StoreError::NotFound(*id))?;
        Ok(self.service.statistics(game))
    }

    /// Number of stored games.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store holds no games.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
