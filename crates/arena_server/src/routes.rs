//! REST routes over the game store.

use crate::{ApiError, AppState, StoreError, outcome_text, ws};
use arena_hub::Message;
use arena_tictactoe::{GameId, GameState, GameStatistics, Player, Transition};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tracing::{info, instrument};

// ─── Request and response bodies ────────────────────────────────────────────

/// A player creating or joining a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRequest {
    /// Stable player id.
    pub player_id: String,
    /// Display name.
    pub name: String,
}

/// A move submitted over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Mover's player id.
    pub player_id: String,
    /// Cell index, 0..=8 row-major.
    pub position: i64,
}

/// Result of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    /// Game after the move.
    pub game: GameState,
    /// What the move did.
    pub transition: Transition,
    /// 1-based place of the move in the game's history.
    pub move_number: usize,
    /// Winner or draw text once the game ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

/// One live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id, the game id for game sessions.
    pub session_id: String,
    /// Connected clients.
    pub clients: usize,
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Always `"ok"` when served.
    pub status: String,
    /// Stored games.
    pub games: usize,
    /// Sessions with at least one client.
    pub sessions: usize,
}

// ─── Router ─────────────────────────────────────────────────────────────────

/// Builds the application router with request logging.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/join", post(join_game))
        .route("/games/{id}/moves", post(make_move))
        .route("/games/{id}/stats", get(game_stats))
        .route("/players/{id}/games", get(player_games))
        .route("/sessions", get(sessions))
        .route("/ws/{id}", get(ws::ws_handler))
        .layer(ServiceBuilder::new().map_request(log_request))
        .with_state(state)
}

fn log_request(req: Request<Body>) -> Request<Body> {
    info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
    req
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        games: state.store().len(),
        sessions: state.hub().active_sessions().len(),
    })
}

async fn list_games(State(state): State<AppState>) -> Json<Vec<GameState>> {
    Json(state.store().available().iter().map(|g| g.state()).collect())
}

#[instrument(skip(state, body), fields(player_id = %body.player_id))]
async fn create_game(
    State(state): State<AppState>,
    Json(body): Json<PlayerRequest>,
) -> (StatusCode, Json<GameState>) {
    let game = state.store().create(Player::new(body.player_id, body.name));
    info!(game_id = %game.id(), "Game created");
    (StatusCode::CREATED, Json(game.state()))
}

async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<GameState>, ApiError> {
    let game = state.store().get(&id).ok_or(StoreError::NotFound(id))?;
    Ok(Json(game.state()))
}

#[instrument(skip(state, body), fields(game_id = %id, player_id = %body.player_id))]
async fn join_game(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(body): Json<PlayerRequest>,
) -> Result<Json<GameState>, ApiError> {
    let name = body.name.clone();
    let game = state.store().join(&id, Player::new(body.player_id, body.name))?;
    info!("Game started");

    state
        .announce(Message::system(
            "game_started",
            format!("{} joined; {} moves first", name, game.player1().name()),
            id.to_string(),
        ))
        .await;
    Ok(Json(game.state()))
}

#[instrument(skip(state, body), fields(game_id = %id, player_id = %body.player_id, position = body.position))]
async fn make_move(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
    Json(body): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, ApiError> {
    let (game, transition) = state.store().play(&id, &body.player_id, body.position)?;
    let outcome = outcome_text(&game, transition);
    let move_number = game.history().len();

    if let Some(mover) = game.participant(&body.player_id) {
        let symbol = mover.symbol().map(|s| s.to_string()).unwrap_or_default();
        state
            .announce(
                Message::game_move(body.position, symbol, mover.name().as_str(), id.to_string())
                    .with_move_number(move_number),
            )
            .await;
    }
    if let Some(text) = &outcome {
        info!(outcome = %text, "Game finished");
        state
            .announce(Message::system("game_over", text.clone(), id.to_string()))
            .await;
    }

    Ok(Json(MoveResponse {
        game: game.state(),
        transition,
        move_number,
        outcome,
    }))
}

async fn game_stats(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<GameStatistics>, ApiError> {
    Ok(Json(state.store().statistics(&id)?))
}

async fn player_games(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Json<Vec<GameState>> {
    Json(
        state
            .store()
            .player_games(&player_id)
            .iter()
            .map(|g| g.state())
            .collect(),
    )
}

async fn sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(
        state
            .hub()
            .session_counts()
            .into_iter()
            .map(|(session_id, clients)| SessionSummary {
                session_id,
                clients,
            })
            .collect(),
    )
}
