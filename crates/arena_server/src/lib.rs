//! HTTP and WebSocket front end for arena games.
//!
//! Games live in a [`GameStore`]. Each game id doubles as the id of a chat
//! session in the [`arena_hub`] hub; moves sent over a session's socket are
//! applied to the stored game by [`GameArbiter`], and moves made over REST are
//! announced to the session.
//!
//! # Example
//!
//! ```no_run
//! use arena_server::{AppState, ServerConfig, router};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ServerConfig::default();
//! let (state, _hub) = AppState::start(config.hub().clone());
//! let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//! axum::serve(listener, router(state)).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod arbiter;
mod cli;
mod config;
mod error;
mod routes;
mod state;
mod store;
mod ws;

pub use arbiter::{GameArbiter, outcome_text};
pub use cli::{Cli, Command};
pub use config::{ConfigError, ENV_HOST, ENV_LOG, ENV_PORT, ServerConfig};
pub use error::{ApiError, ErrorBody};
pub use routes::{Health, MoveRequest, MoveResponse, PlayerRequest, SessionSummary, router};
pub use state::AppState;
pub use store::{GameStore, StoreError};
pub use ws::{WsParams, WsSink, WsStream, WsTransport};
