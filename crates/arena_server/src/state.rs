//! Shared request state.

use crate::{GameArbiter, GameStore};
use arena_hub::{Hub, HubConfig, HubHandle, Message};
use derive_getters::Getters;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Everything a handler needs: the games and the hub announcing them.
#[derive(Debug, Clone, Getters)]
pub struct AppState {
    /// Game collection.
    store: GameStore,
    /// Session hub.
    hub: HubHandle,
}

impl AppState {
    /// Wraps an existing store and hub.
    pub fn new(store: GameStore, hub: HubHandle) -> Self {
        Self { store, hub }
    }

    /// Creates an empty store and a hub arbitrating moves against it, and
    /// spawns the hub loop.
    #[instrument(skip(config))]
    pub fn start(config: HubConfig) -> (Self, JoinHandle<()>) {
        let store = GameStore::new();
        let arbiter = Arc::new(GameArbiter::new(store.clone()));
        let (hub, handle) = Hub::with_arbiter(config, arbiter);
        let hub_loop = hub.spawn();
        info!("Hub started");
        (Self::new(store, handle), hub_loop)
    }

    /// Broadcasts to a session. A stopped hub only costs the announcement.
    pub async fn announce(&self, message: Message) {
        if let Err(e) = self.hub.broadcast(message).await {
            warn!(error = %e, "Announcement dropped");
        }
    }
}
