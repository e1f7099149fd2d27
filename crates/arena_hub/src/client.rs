//! One connected participant.
//!
//! A client is split across two owners. The hub registry holds the
//! [`ClientHandle`], which carries the only strong sender into the client's
//! outbound queue, so removing the handle from the registry closes the queue.
//! The client's own tasks hold a [`ClientRef`] with a weak sender, enough to
//! reply to the client without keeping the queue alive.

use crate::{
    Frame, FrameSink, FrameStream, HubConfig, HubError, HubHandle, SessionId, Transport,
    TransportError,
};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Instant, interval_at, timeout};
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

/// Receiving end of a client's outbound queue.
pub type ClientQueue = mpsc::Receiver<Arc<str>>;

/// Per-connection identifier. The same player may hold several connections.
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
)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Generates a fresh time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who is on the other end of a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ClientInfo {
    /// Connection id.
    id: ClientId,
    /// Player identity supplied at upgrade time.
    player_id: String,
    /// Display name stamped on everything this client sends.
    username: String,
    /// Session the client is registered under.
    session_id: SessionId,
}

impl ClientInfo {
    /// Describes a new connection with a fresh [`ClientId`].
    pub fn new(
        player_id: impl Into<String>,
        username: impl Into<String>,
        session_id: impl Into<SessionId>,
    ) -> Self {
        Self {
            id: ClientId::new(),
            player_id: player_id.into(),
            username: username.into(),
            session_id: session_id.into(),
        }
    }
}

/// Result of offering a frame to a client queue without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Sent,
    Full,
    Closed,
}

fn offer(tx: &mpsc::Sender<Arc<str>>, payload: Arc<str>) -> Delivery {
    match tx.try_send(payload) {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Full(_)) => Delivery::Full,
        Err(TrySendError::Closed(_)) => Delivery::Closed,
    }
}

/// Registry-side ownership of a client's queue.
///
/// Not `Clone`; dropping it closes the queue.
#[derive(Debug)]
pub struct ClientHandle {
    info: Arc<ClientInfo>,
    tx: mpsc::Sender<Arc<str>>,
}

impl ClientHandle {
    /// Creates a handle and the queue it feeds, buffering `capacity` frames
    /// (at least one).
    pub fn new(info: ClientInfo, capacity: usize) -> (Self, ClientQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                info: Arc::new(info),
                tx,
            },
            rx,
        )
    }

    /// Connection details.
    pub fn info(&self) -> &ClientInfo {
        &self.info
    }

    pub(crate) fn offer(&self, payload: Arc<str>) -> Delivery {
        offer(&self.tx, payload)
    }

    pub(crate) fn downgrade(&self) -> ClientRef {
        ClientRef {
            info: Arc::clone(&self.info),
            tx: self.tx.downgrade(),
        }
    }
}

/// Non-owning reference to a registered client.
#[derive(Debug, Clone)]
pub struct ClientRef {
    info: Arc<ClientInfo>,
    tx: mpsc::WeakSender<Arc<str>>,
}

impl ClientRef {
    /// Connection details.
    pub fn info(&self) -> &ClientInfo {
        &self.info
    }

    /// Whether the hub still holds this client.
    pub fn is_registered(&self) -> bool {
        self.tx.strong_count() > 0
    }

    pub(crate) fn offer(&self, payload: Arc<str>) -> Delivery {
        match self.tx.upgrade() {
            Some(tx) => offer(&tx, payload),
            None => Delivery::Closed,
        }
    }
}

// ─── Connection tasks ───────────────────────────────────────────────────────

/// A connection waiting to be attached to the hub.
#[derive(Debug)]
pub struct Client<T> {
    info: ClientInfo,
    transport: T,
}

impl<T: Transport> Client<T> {
    /// Pairs identity with a connection.
    pub fn new(info: ClientInfo, transport: T) -> Self {
        Self { info, transport }
    }

    /// Registers with the hub and serves the connection until either side ends.
    ///
    /// The inbound flow dispatches frames through the hub; the outbound flow
    /// drains the queue and sends keepalive pings. When either stops, the
    /// connection is closed once and the client unregistered.
    ///
    /// # Errors
    ///
    /// [`HubError`] if the hub loop is gone. Transport failures end this
    /// client only and are logged, not returned.
    #[instrument(skip(self, hub), fields(client_id = %self.info.id(), session_id = %self.info.session_id()))]
    pub async fn run(self, hub: HubHandle) -> Result<(), HubError> {
        let (handle, mut queue) = ClientHandle::new(self.info, *hub.config().queue_capacity());
        let client = hub.register(handle).await?;
        let (mut sink, mut stream) = self.transport.split();

        let outcome = tokio::select! {
            result = write_pump(&mut sink, &mut queue, hub.config()) => result,
            result = read_pump(&mut stream, &client, &hub) => result,
        };

        match outcome {
            Ok(()) => debug!("Connection ended"),
            Err(e) => error!(error = %e, "Connection failed"),
        }

        if let Err(e) = sink.close().await {
            debug!(error = %e, "Close after disconnect failed");
        }
        drop(queue);

        hub.unregister(client.info()).await?;
        info!(username = %client.info().username(), "Client disconnected");
        Ok(())
    }
}

async fn write_frame<S: FrameSink>(
    sink: &mut S,
    frame: Frame,
    config: &HubConfig,
) -> Result<(), TransportError> {
    timeout(config.write_wait(), sink.send(frame))
        .await
        .map_err(|_| TransportError::new("write deadline exceeded"))?
}

async fn write_pump<S: FrameSink>(
    sink: &mut S,
    queue: &mut ClientQueue,
    config: &HubConfig,
) -> Result<(), TransportError> {
    let period = config.ping_period();
    let mut keepalive = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            next = queue.recv() => match next {
                Some(payload) => {
                    write_frame(sink, Frame::Data(payload.as_bytes().to_vec()), config).await?;
                }
                None => {
                    debug!("Queue closed by hub");
                    return Ok(());
                }
            },
            _ = keepalive.tick() => {
                trace!("Sending ping");
                write_frame(sink, Frame::Ping, config).await?;
            }
        }
    }
}

async fn read_pump<R: FrameStream>(
    stream: &mut R,
    client: &ClientRef,
    hub: &HubHandle,
) -> Result<(), TransportError> {
    let config = hub.config();

    loop {
        let frame = match timeout(config.pong_wait(), stream.recv()).await {
            Err(_) => return Err(TransportError::new("read deadline exceeded")),
            Ok(None) => return Ok(()),
            Ok(Some(frame)) => frame?,
        };

        match frame {
            Frame::Data(bytes) => {
                if bytes.len() > *config.max_frame_bytes() {
                    warn!(len = bytes.len(), limit = config.max_frame_bytes(), "Oversized frame");
                    return Err(TransportError::new(format!(
                        "frame of {} bytes exceeds limit of {}",
                        bytes.len(),
                        config.max_frame_bytes()
                    )));
                }
                hub.dispatch(client, &bytes)
                    .await
                    .map_err(|e| TransportError::new(e.to_string()))?;
            }
            Frame::Ping | Frame::Pong => trace!("Keepalive received"),
            Frame::Close => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> ClientInfo {
        ClientInfo::new("p1", "alice", "g1")
    }

    #[tokio::test]
    async fn test_dropping_handle_closes_queue() {
        let (handle, mut queue) = ClientHandle::new(info(), 2);
        let client = handle.downgrade();
        assert!(client.is_registered());

        assert_eq!(client.offer(Arc::from("hi")), Delivery::Sent);
        drop(handle);

        assert!(!client.is_registered());
        assert_eq!(client.offer(Arc::from("late")), Delivery::Closed);
        assert_eq!(queue.recv().await.as_deref(), Some("hi"));
        assert!(queue.recv().await.is_none());
    }

    #[test]
    fn test_full_queue_reports_full() {
        let (handle, _queue) = ClientHandle::new(info(), 1);
        assert_eq!(handle.offer(Arc::from("one")), Delivery::Sent);
        assert_eq!(handle.offer(Arc::from("two")), Delivery::Full);
    }

    #[test]
    fn test_client_ids_are_unique() {
        assert_ne!(info().id(), info().id());
    }
}
