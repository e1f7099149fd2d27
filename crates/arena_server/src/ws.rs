//! WebSocket upgrade and frame adapter for the hub.

use crate::{ApiError, AppState, StoreError};
use arena_hub::{Client, ClientInfo, Frame, FrameSink, FrameStream, Transport, TransportError};
use arena_tictactoe::GameId;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{error, info, instrument};

/// Query string of the upgrade request.
#[derive(Debug, Clone, Deserialize)]
pub struct WsParams {
    /// Player identity; need not hold a seat to watch and chat.
    pub player_id: String,
    /// Display name, defaulting to the player id.
    #[serde(default)]
    pub username: Option<String>,
}

/// `GET /ws/{game_id}`: joins the game's session.
#[instrument(skip(ws, state, params), fields(game_id = %game_id, player_id = %params.player_id))]
pub async fn ws_handler(
    Path(game_id): Path<GameId>,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if state.store().get(&game_id).is_none() {
        return Err(StoreError::NotFound(game_id).into());
    }

    let username = params.username.unwrap_or_else(|| params.player_id.clone());
    let info = ClientInfo::new(params.player_id, username, game_id.to_string());
    let hub = state.hub().clone();
    info!(client_id = %info.id(), "Upgrading to WebSocket");

    let max_frame = *hub.config().max_frame_bytes();
    Ok(ws
        .max_message_size(max_frame.saturating_mul(4))
        .on_upgrade(move |socket| async move {
            if let Err(e) = Client::new(info, WsTransport(socket)).run(hub).await {
                error!(error = %e, "Client ended without hub");
            }
        }))
}

/// An upgraded socket, ready to be split for the hub.
#[derive(Debug)]
pub struct WsTransport(pub WebSocket);

/// Outbound half of [`WsTransport`].
#[derive(Debug)]
pub struct WsSink(SplitSink<WebSocket, WsMessage>);

/// Inbound half of [`WsTransport`].
#[derive(Debug)]
pub struct WsStream(SplitStream<WebSocket>);

impl Transport for WsTransport {
    type Sink = WsSink;
    type Stream = WsStream;

    fn split(self) -> (WsSink, WsStream) {
        let (sink, stream) = self.0.split();
        (WsSink(sink), WsStream(stream))
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Data(bytes) => match String::from_utf8(bytes) {
                Ok(text) => WsMessage::Text(text.into()),
                Err(e) => WsMessage::Binary(Bytes::from(e.into_bytes())),
            },
            Frame::Ping => WsMessage::Ping(Bytes::new()),
            Frame::Pong => WsMessage::Pong(Bytes::new()),
            Frame::Close => WsMessage::Close(None),
        };
        self.0
            .send(message)
            .await
            .map_err(|e| TransportError::new(format!("WebSocket write failed: {}", e)))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.0
            .close()
            .await
            .map_err(|e| TransportError::new(format!("WebSocket close failed: {}", e)))
    }
}

#[async_trait]
impl FrameStream for WsStream {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        let message = self.0.next().await?;
        Some(
            message
                .map(|m| match m {
                    WsMessage::Text(text) => Frame::Data(text.as_str().as_bytes().to_vec()),
                    WsMessage::Binary(bytes) => Frame::Data(bytes.to_vec()),
                    WsMessage::Ping(_) => Frame::Ping,
                    WsMessage::Pong(_) => Frame::Pong,
                    WsMessage::Close(_) => Frame::Close,
                })
                .map_err(|e| TransportError::new(format!("WebSocket read failed: {}", e))),
        )
    }
}
