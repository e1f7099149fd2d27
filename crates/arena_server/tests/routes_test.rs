//! REST routes driven in-process with `oneshot`.

use arena_hub::{ClientHandle, ClientInfo, ClientQueue, HubConfig, Message, MessageKind, MessageType};
use arena_server::{AppState, ErrorBody, Health, MoveResponse, SessionSummary, router};
use arena_tictactoe::{GameState, GameStatistics, GameStatus, Transition};
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::timeout;
use tower::ServiceExt;

fn app() -> (Router, AppState) {
    let (state, _hub_loop) = AppState::start(HubConfig::default());
    (router(state.clone()), state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Valid request");

    let response = app.clone().oneshot(request).await.expect("Infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Body readable")
        .to_bytes();
    (status, bytes.to_vec())
}

async fn next(queue: &mut ClientQueue) -> Message {
    let payload = timeout(Duration::from_secs(5), queue.recv())
        .await
        .expect("Message within deadline")
        .expect("Queue open");
    Message::decode(payload.as_bytes()).expect("Valid message")
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).expect("Valid JSON body")
}

async fn create(app: &Router, player_id: &str, name: &str) -> GameState {
    let (status, body) = call(
        app,
        Method::POST,
        "/games",
        Some(json!({ "player_id": player_id, "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    parse(&body)
}

async fn join(app: &Router, game: &GameState, player_id: &str, name: &str) -> (StatusCode, Vec<u8>) {
    call(
        app,
        Method::POST,
        &format!("/games/{}/join", game.id),
        Some(json!({ "player_id": player_id, "name": name })),
    )
    .await
}

async fn play(app: &Router, game: &GameState, player_id: &str, position: i64) -> (StatusCode, Vec<u8>) {
    call(
        app,
        Method::POST,
        &format!("/games/{}/moves", game.id),
        Some(json!({ "player_id": player_id, "position": position })),
    )
    .await
}

#[tokio::test]
async fn test_health_reports_counts() {
    let (app, _) = app();
    create(&app, "alice", "Alice").await;

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let health: Health = parse(&body);
    assert_eq!(health.status, "ok");
    assert_eq!(health.games, 1);
    assert_eq!(health.sessions, 0);
}

#[tokio::test]
async fn test_create_list_and_join() {
    let (app, _) = app();
    let game = create(&app, "alice", "Alice").await;
    assert_eq!(game.status, GameStatus::Waiting);

    let (_, body) = call(&app, Method::GET, "/games", None).await;
    let waiting: Vec<GameState> = parse(&body);
    assert_eq!(waiting.len(), 1);

    let (status, body) = join(&app, &game, "bob", "Bob").await;
    assert_eq!(status, StatusCode::OK);
    let started: GameState = parse(&body);
    assert_eq!(started.status, GameStatus::Active);
    assert_eq!(started.current_turn.map(|p| p.id().clone()), Some("alice".to_string()));

    let (_, body) = call(&app, Method::GET, "/games", None).await;
    assert!(parse::<Vec<GameState>>(&body).is_empty());

    let (status, body) = join(&app, &game, "carol", "Carol").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse::<ErrorBody>(&body).error_code, "GAME_FULL");
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let (app, _) = app();
    let missing = "0190b3b0-0000-7000-8000-000000000000";

    for uri in [format!("/games/{missing}"), format!("/games/{missing}/stats")] {
        let (status, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(parse::<ErrorBody>(&body).error_code, "GAME_NOT_FOUND");
    }
}

#[tokio::test]
async fn test_moves_to_a_win() {
    let (app, _) = app();
    let game = create(&app, "alice", "Alice").await;
    join(&app, &game, "bob", "Bob").await;

    for (number, (player, position)) in [("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4)]
        .into_iter()
        .enumerate()
    {
        let (status, body) = play(&app, &game, player, position).await;
        assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
        let response: MoveResponse = parse(&body);
        assert_eq!(response.transition, Transition::InProgress);
        assert_eq!(response.move_number, number + 1);
    }

    let (status, body) = play(&app, &game, "alice", 2).await;
    assert_eq!(status, StatusCode::OK);
    let finished: MoveResponse = parse(&body);
    assert_eq!(finished.game.status, GameStatus::Finished);
    assert_eq!(finished.outcome.as_deref(), Some("Alice wins as X"));
    assert_eq!(finished.move_number, 5);

    let (status, body) = play(&app, &game, "bob", 5).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse::<ErrorBody>(&body).error_code, "NOT_ACTIVE");

    let (_, body) = call(&app, Method::GET, &format!("/games/{}/stats", game.id), None).await;
    let stats: GameStatistics = parse(&body);
    assert_eq!(*stats.total_moves(), 5);
}

#[tokio::test]
async fn test_rejected_moves() {
    let (app, _) = app();
    let game = create(&app, "alice", "Alice").await;

    let (status, body) = play(&app, &game, "alice", 0).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse::<ErrorBody>(&body).error_code, "NOT_ACTIVE");

    join(&app, &game, "bob", "Bob").await;

    let (status, body) = play(&app, &game, "bob", 0).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse::<ErrorBody>(&body).error_code, "WRONG_TURN");

    let (status, body) = play(&app, &game, "alice", 9).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse::<ErrorBody>(&body).error_code, "INVALID_POSITION");

    let (status, _) = play(&app, &game, "mallory", 4).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, Method::GET, &format!("/games/{}", game.id), None).await;
    assert_eq!(parse::<GameState>(&body).move_count, 0);
}

#[tokio::test]
async fn test_player_games() {
    let (app, _) = app();
    let first = create(&app, "alice", "Alice").await;
    create(&app, "bob", "Bob").await;
    join(&app, &first, "bob", "Bob").await;

    let (_, body) = call(&app, Method::GET, "/players/bob/games", None).await;
    assert_eq!(parse::<Vec<GameState>>(&body).len(), 2);
    let (_, body) = call(&app, Method::GET, "/players/alice/games", None).await;
    assert_eq!(parse::<Vec<GameState>>(&body).len(), 1);
}

#[tokio::test]
async fn test_rest_moves_are_announced_to_the_session() {
    let (app, state) = app();
    let game = create(&app, "alice", "Alice").await;
    let session = game.id.to_string();

    let (watcher, mut queue) = ClientHandle::new(ClientInfo::new("eve", "Eve", &session), 16);
    state.hub().register(watcher).await.expect("Hub running");

    assert_eq!(next(&mut queue).await.message_type(), MessageType::Join);

    join(&app, &game, "bob", "Bob").await;
    let started = next(&mut queue).await;
    assert!(matches!(started.kind(), MessageKind::System { action } if action == "game_started"));

    play(&app, &game, "alice", 4).await;
    let moved = next(&mut queue).await;
    assert_eq!(
        moved.kind(),
        &MessageKind::GameMove {
            position: 4,
            symbol: "X".to_string()
        }
    );
    assert_eq!(moved.username(), "Alice");
    assert_eq!(moved.game_id(), &session);
    assert_eq!(moved.move_number(), Some(1));

    play(&app, &game, "bob", 0).await;
    assert_eq!(next(&mut queue).await.move_number(), Some(2));

    let (_, body) = call(&app, Method::GET, "/sessions", None).await;
    let sessions: Vec<SessionSummary> = parse(&body);
    assert_eq!(
        sessions,
        vec![SessionSummary {
            session_id: session,
            clients: 1
        }]
    );
}

#[tokio::test]
async fn test_socket_route_requires_upgrade() {
    let (app, _) = app();
    let game = create(&app, "alice", "Alice").await;

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/ws/{}?player_id=alice", game.id),
        None,
    )
    .await;
    assert!(status.is_client_error(), "{status}");
}
