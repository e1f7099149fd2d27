//! Session registry and fan-out.
//!
//! [`Hub`] is an actor: one task owns every registry mutation and consumes a
//! single inbox, so registrations, removals and broadcasts from one sender are
//! applied in the order they were sent. [`HubHandle`] is the cheap, cloneable
//! front door. Point queries read the registry under a shared lock without
//! going through the inbox.

use crate::client::Delivery;
use crate::{
    ClientHandle, ClientId, ClientInfo, ClientRef, ErrorCode, HubConfig, HubError, Message,
    MessageKind, MoveArbiter, ProtocolError,
};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Session identifier: the game id the clients are attached to.
pub type SessionId = String;

type Sessions = HashMap<SessionId, HashMap<ClientId, ClientHandle>>;

/// Shared view of the session registry.
#[derive(Debug, Clone, Default)]
struct Registry(Arc<RwLock<Sessions>>);

impl Registry {
    fn read(&self) -> RwLockReadGuard<'_, Sessions> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Sessions> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn count(&self, session_id: &str) -> usize {
        self.read().get(session_id).map_or(0, HashMap::len)
    }
}

/// Control events consumed by the hub loop.
#[derive(Debug)]
enum HubEvent {
    Register(ClientHandle),
    Unregister {
        session_id: SessionId,
        client_id: ClientId,
    },
    Broadcast(Message),
}

// ─── Hub loop ───────────────────────────────────────────────────────────────

/// The control loop. Construct with [`Hub::new`], then [`Hub::spawn`] it.
#[derive(Debug)]
pub struct Hub {
    inbox: mpsc::Receiver<HubEvent>,
    registry: Registry,
}

impl Hub {
    /// Creates a hub that re-broadcasts moves without validation.
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        Self::build(config, None)
    }

    /// Creates a hub that runs every move past `arbiter` first.
    pub fn with_arbiter(config: HubConfig, arbiter: Arc<dyn MoveArbiter>) -> (Self, HubHandle) {
        Self::build(config, Some(arbiter))
    }

    fn build(config: HubConfig, arbiter: Option<Arc<dyn MoveArbiter>>) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel((*config.inbox_capacity()).max(1));
        let registry = Registry::default();
        let handle = HubHandle {
            inbox: tx,
            registry: registry.clone(),
            config: Arc::new(config),
            arbiter,
        };
        (Self { inbox: rx, registry }, handle)
    }

    /// Runs the loop on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Processes events until every [`HubHandle`] is dropped.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("Hub loop started");
        while let Some(event) = self.inbox.recv().await {
            match event {
                HubEvent::Register(handle) => self.register(handle),
                HubEvent::Unregister {
                    session_id,
                    client_id,
                } => {
                    if let Some(leave) = self.remove(&session_id, &client_id) {
                        self.broadcast(leave);
                    }
                }
                HubEvent::Broadcast(message) => self.broadcast(message),
            }
        }
        info!("Hub loop stopped");
    }

    fn register(&self, handle: ClientHandle) {
        let info = handle.info().clone();
        let count = {
            let mut sessions = self.registry.write();
            let clients = sessions.entry(info.session_id().clone()).or_default();
            clients.insert(*info.id(), handle);
            clients.len()
        };
        info!(
            client_id = %info.id(),
            session_id = %info.session_id(),
            username = %info.username(),
            count,
            "Client joined session"
        );
        self.broadcast(Message::join(info.username(), info.session_id().clone(), count));
    }

    /// Removes a client, closing its queue. Returns the leave notice to send.
    fn remove(&self, session_id: &str, client_id: &ClientId) -> Option<Message> {
        let (handle, count) = {
            let mut sessions = self.registry.write();
            let clients = sessions.get_mut(session_id)?;
            let handle = clients.remove(client_id)?;
            let count = clients.len();
            if count == 0 {
                sessions.remove(session_id);
                debug!(session_id, "Session emptied");
            }
            (handle, count)
        };

        let username = handle.info().username().clone();
        drop(handle);
        info!(%client_id, session_id, %username, count, "Client left session");
        Some(Message::leave(&username, session_id, count))
    }

    /// Fans `message` out to its session, then handles any clients whose
    /// queue was full or closed.
    ///
    /// Every stalled client is removed and its leave notice queued for the
    /// same session, so removal can cascade without recursion.
    fn broadcast(&self, message: Message) {
        let mut pending = VecDeque::from([message]);

        while let Some(message) = pending.pop_front() {
            let session_id = message.game_id().clone();
            for client_id in self.fan_out(&message) {
                if let Some(leave) = self.remove(&session_id, &client_id) {
                    pending.push_back(leave);
                }
            }
        }
    }

    /// Offers `message` to every client of its session without waiting.
    /// Returns the clients that could not take it.
    fn fan_out(&self, message: &Message) -> Vec<ClientId> {
        let payload: Arc<str> = match message.encode() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!(error = %e, "Failed to serialize message");
                return Vec::new();
            }
        };

        let sessions = self.registry.read();
        let Some(clients) = sessions.get(message.game_id()) else {
            debug!(session_id = %message.game_id(), "Broadcast to unknown session");
            return Vec::new();
        };

        let mut stalled = Vec::new();
        for (client_id, handle) in clients {
            match handle.offer(Arc::clone(&payload)) {
                Delivery::Sent => {}
                Delivery::Full => {
                    warn!(%client_id, session_id = %message.game_id(), "Client queue full, dropping client");
                    stalled.push(*client_id);
                }
                Delivery::Closed => {
                    debug!(%client_id, "Client queue already closed");
                    stalled.push(*client_id);
                }
            }
        }
        debug!(
            session_id = %message.game_id(),
            kind = %message.message_type(),
            recipients = clients.len() - stalled.len(),
            "Broadcast"
        );
        stalled
    }
}

// ─── Handle ─────────────────────────────────────────────────────────────────

/// Cloneable entry point to a running [`Hub`].
#[derive(Clone)]
pub struct HubHandle {
    inbox: mpsc::Sender<HubEvent>,
    registry: Registry,
    config: Arc<HubConfig>,
    arbiter: Option<Arc<dyn MoveArbiter>>,
}

impl fmt::Debug for HubHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubHandle")
            .field("config", &self.config)
            .field("arbiter", &self.arbiter.is_some())
            .finish_non_exhaustive()
    }
}

impl HubHandle {
    /// Hub configuration.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    async fn send(&self, event: HubEvent) -> Result<(), HubError> {
        self.inbox.send(event).await.map_err(|_| HubError::stopped())
    }

    /// Adds a client to its session. Everyone in the session, the new client
    /// included, receives a `join` with the updated count.
    ///
    /// # Errors
    ///
    /// [`HubError`] if the hub loop has stopped.
    #[instrument(skip(self, handle), fields(client_id = %handle.info().id()))]
    pub async fn register(&self, handle: ClientHandle) -> Result<ClientRef, HubError> {
        let client = handle.downgrade();
        self.send(HubEvent::Register(handle)).await?;
        Ok(client)
    }

    /// Removes a client and closes its queue. Unknown clients are ignored.
    ///
    /// # Errors
    ///
    /// [`HubError`] if the hub loop has stopped.
    #[instrument(skip(self, info), fields(client_id = %info.id()))]
    pub async fn unregister(&self, info: &ClientInfo) -> Result<(), HubError> {
        self.send(HubEvent::Unregister {
            session_id: info.session_id().clone(),
            client_id: *info.id(),
        })
        .await
    }

    /// Delivers `message` to every client registered under its `game_id`.
    ///
    /// # Errors
    ///
    /// [`HubError`] if the hub loop has stopped.
    pub async fn broadcast(&self, message: Message) -> Result<(), HubError> {
        self.send(HubEvent::Broadcast(message)).await
    }

    /// Clients currently registered under `session_id`.
    pub fn client_count(&self, session_id: &str) -> usize {
        self.registry.count(session_id)
    }

    /// Sessions with at least one client, sorted.
    pub fn active_sessions(&self) -> Vec<SessionId> {
        let mut sessions: Vec<_> = self.registry.read().keys().cloned().collect();
        sessions.sort();
        sessions
    }

    /// Sessions with their client counts, sorted by session.
    pub fn session_counts(&self) -> Vec<(SessionId, usize)> {
        let mut counts: Vec<_> = self
            .registry
            .read()
            .iter()
            .map(|(id, clients)| (id.clone(), clients.len()))
            .collect();
        counts.sort();
        counts
    }

    /// Handles one inbound frame from `client`.
    ///
    /// The decoded message is stamped with the client's name and session and
    /// the current time, whatever the client sent. Chat is re-broadcast unless
    /// it is too long; moves go through the arbiter when one is installed;
    /// join/leave are re-broadcast with a fresh count. Anything malformed or
    /// not client-originated is answered with an error to `client` only.
    ///
    /// # Errors
    ///
    /// [`HubError`] if the hub loop has stopped.
    #[instrument(skip(self, client, raw), fields(client_id = %client.info().id(), session_id = %client.info().session_id()))]
    pub async fn dispatch(&self, client: &ClientRef, raw: &[u8]) -> Result<(), HubError> {
        let info = client.info();

        let mut message = match Message::decode(raw) {
            Ok(message) => message,
            Err(e) => return self.reject(client, e).await,
        };
        message.stamp(info.username(), info.session_id());

        match message.kind_mut() {
            MessageKind::Chat { .. } => {
                let length = message.content().chars().count();
                let limit = *self.config.max_content_chars();
                if length > limit {
                    return self
                        .reject(client, ProtocolError::MessageTooLong { length, limit })
                        .await;
                }
                self.broadcast(message).await
            }
            MessageKind::GameMove { position, .. } => {
                let position = *position;
                self.handle_move(client, message, position).await
            }
            MessageKind::Join { player_count } | MessageKind::Leave { player_count } => {
                *player_count = self.client_count(info.session_id());
                self.broadcast(message).await
            }
            MessageKind::System { .. } | MessageKind::Error { .. } => {
                let kind = message.message_type().to_string();
                self.reject(client, ProtocolError::UnknownType(kind)).await
            }
        }
    }

    async fn handle_move(
        &self,
        client: &ClientRef,
        message: Message,
        position: i64,
    ) -> Result<(), HubError> {
        let Some(arbiter) = &self.arbiter else {
            return self.broadcast(message).await;
        };

        let info = client.info();
        match arbiter.arbitrate(info, position) {
            Ok(verdict) => {
                debug!(
                    position,
                    symbol = %verdict.symbol(),
                    move_number = *verdict.move_number(),
                    "Move accepted"
                );
                let announcement = Message::game_move(
                    position,
                    verdict.symbol().clone(),
                    info.username().clone(),
                    info.session_id().clone(),
                )
                .with_move_number(*verdict.move_number());
                self.broadcast(announcement).await?;
                if let Some(outcome) = verdict.outcome() {
                    self.broadcast(Message::system(
                        "game_over",
                        outcome.clone(),
                        info.session_id().clone(),
                    ))
                    .await?;
                }
                Ok(())
            }
            Err(reason) => {
                warn!(position, %reason, "Move rejected");
                let error =
                    Message::error(ErrorCode::InvalidMove, reason, info.session_id().clone());
                self.reply(client, error).await
            }
        }
    }

    async fn reject(&self, client: &ClientRef, error: ProtocolError) -> Result<(), HubError> {
        warn!(error = %error, "Rejected client message");
        let session_id = client.info().session_id().clone();
        self.reply(client, Message::error(error.code(), error.to_string(), session_id))
            .await
    }

    /// Sends `message` to `client` only. A full queue drops the client.
    async fn reply(&self, client: &ClientRef, message: Message) -> Result<(), HubError> {
        let payload = match message.encode() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!(error = %e, "Failed to serialize reply");
                return Ok(());
            }
        };

        match client.offer(payload) {
            Delivery::Sent => Ok(()),
            Delivery::Closed => {
                debug!("Reply to closed client discarded");
                Ok(())
            }
            Delivery::Full => {
                warn!("Client queue full on reply, dropping client");
                self.unregister(client.info()).await
            }
        }
    }
}
