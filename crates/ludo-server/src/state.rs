//! Shared application state for the HTTP and `WebSocket` handlers.

use std::sync::Arc;

use ludo_core::ServerConfig;

use crate::coordinator::SessionCoordinator;
use crate::store::RoomStore;

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    /// Registry of live rooms.
    pub store: Arc<RoomStore>,
    /// Serialized access to rooms.
    pub coordinator: SessionCoordinator,
    /// The configuration the server was started with.
    pub config: ServerConfig,
}

impl AppState {
    /// Build state with an empty room store sized by `config`.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(RoomStore::new(config.rooms.clone()));
        Self {
            coordinator: SessionCoordinator::new(Arc::clone(&store)),
            store,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
