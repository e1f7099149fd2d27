//! Authoritative tic-tac-toe rules for two-seat online games.
//!
//! # Architecture
//!
//! - **Board**: 3x3 value type with move legality and win/draw detection
//! - **Move**: validated play, only constructible through its factories
//! - **Player**: identity plus the symbol assigned when seated
//! - **Game**: `Waiting -> Active -> Finished` state machine owning turn order
//! - **GameService**: stateless orchestration over caller-owned games
//!
//! # Example
//!
//! ```
//! use arena_tictactoe::{GameService, GameStatus, Player, Transition};
//!
//! let service = GameService::new();
//! let mut game = service.create_game(Player::new("a", "Alice"));
//! service.join_game(&mut game, Player::new("b", "Bob")).unwrap();
//!
//! let alice = game.player1().clone();
//! assert_eq!(service.make_move(&mut game, &alice, 4), Ok(Transition::InProgress));
//! assert_eq!(*game.status(), GameStatus::Active);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod error;
mod game;
pub mod invariants;
mod player;
pub mod rules;
mod service;
mod types;

pub use action::Move;
pub use error::GameError;
pub use game::{Game, GameId, GameState, GameStatus, Seat, Transition};
pub use player::{Player, PlayerId};
pub use service::{GameService, GameStatistics};
pub use types::{Board, CELLS, Grid, Square, Symbol};
