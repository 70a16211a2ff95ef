//! Process-wide registry of rooms.
//!
//! [`RoomStore`] maps each [`RoomId`] to a [`RoomSlot`]. A slot owns the
//! authoritative [`Room`] behind a `tokio` mutex plus the set of live
//! connections viewing it. Nothing else keeps a long-lived reference to a
//! room: the coordinator and the hub borrow a slot for the duration of
//! one serialized operation.
//!
//! The store is an ordinary value handed around in an [`Arc`]. It starts
//! empty; [`RoomStore::clear`] drops every room, and the idle sweeper
//! evicts rooms nobody has touched for a while.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ludo_core::config::RoomsConfig;
use ludo_types::{Color, Player, PlayerId, Room, RoomId, RoomIdError};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::hub::{ConnectionId, ConnectionSet};

/// Attempts at finding an unused room code before giving up.
const MAX_CODE_ATTEMPTS: usize = 16;

/// Errors from room lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No room is registered under this code.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// Every seat is taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The room has left the lobby.
    #[error("game in room {0} has already started")]
    GameAlreadyStarted(RoomId),

    /// The room was quarantined after an invariant violation.
    #[error("room {0} is unavailable")]
    RoomUnavailable(RoomId),

    /// Malformed name or room code.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Could not find a free room code.
    #[error("could not allocate a room code")]
    CodeSpaceExhausted,
}

impl From<RoomIdError> for StoreError {
    fn from(err: RoomIdError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Mutable state of one room, guarded by the slot's mutex.
#[derive(Debug)]
pub struct RoomState {
    /// The authoritative game state.
    pub room: Room,
    /// Set after an invariant violation; the room accepts no more actions.
    pub faulted: bool,
    last_activity: Instant,
}

impl RoomState {
    fn new(room: Room) -> Self {
        Self {
            room,
            faulted: false,
            last_activity: Instant::now(),
        }
    }

    /// Record activity for the idle sweeper.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// How long since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

/// One room plus its connection set.
#[derive(Debug)]
pub struct RoomSlot {
    id: RoomId,
    state: Mutex<RoomState>,
    pub(crate) connections: Mutex<ConnectionSet>,
}

impl RoomSlot {
    fn new(room: Room) -> Self {
        Self {
            id: room.id.clone(),
            state: Mutex::new(RoomState::new(room)),
            connections: Mutex::new(ConnectionSet::default()),
        }
    }

    /// The room's code.
    pub const fn id(&self) -> &RoomId {
        &self.id
    }

    /// Acquire exclusive access to the room.
    ///
    /// Waiters are served in FIFO order, so actions for one room queue up
    /// behind the one in flight and never interleave with it.
    pub async fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().await
    }

    /// Copy of the current committed room state.
    pub async fn snapshot(&self) -> Room {
        self.state.lock().await.room.clone()
    }
}

/// Registry of every room in the process.
#[derive(Debug)]
pub struct RoomStore {
    rooms: RwLock<HashMap<RoomId, Arc<RoomSlot>>>,
    settings: RoomsConfig,
    next_connection: AtomicU64,
}

impl RoomStore {
    /// Create an empty store.
    pub fn new(settings: RoomsConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            settings,
            next_connection: AtomicU64::new(1),
        }
    }

    /// Room limits this store was created with.
    pub const fn settings(&self) -> &RoomsConfig {
        &self.settings
    }

    /// Validate and normalize a player name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] if the trimmed name is empty,
    /// too long, or contains control characters.
    pub fn validate_name(&self, raw: &str) -> Result<String, StoreError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("player name is empty".to_owned()));
        }
        if name.chars().count() > self.settings.max_name_length {
            return Err(StoreError::InvalidInput(format!(
                "player name is longer than {} characters",
                self.settings.max_name_length
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(StoreError::InvalidInput(
                "player name contains control characters".to_owned(),
            ));
        }
        Ok(name.to_owned())
    }

    /// Open a new room with `player_name` seated as red.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] for a bad name, or
    /// [`StoreError::CodeSpaceExhausted`] if no free code was found.
    pub async fn create_room(&self, player_name: &str) -> Result<(RoomId, PlayerId), StoreError> {
        let name = self.validate_name(player_name)?;
        let host = Player::new(name, Color::Red);
        let player_id = host.id;

        let mut rooms = self.rooms.write().await;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let id = RoomId::generate(self.settings.code_length);
            if rooms.contains_key(&id) {
                continue;
            }
            let room = Room::new(id.clone(), host, self.settings.max_players);
            rooms.insert(id.clone(), Arc::new(RoomSlot::new(room)));
            info!(room_id = %id, %player_id, rooms = rooms.len(), "Room created");
            return Ok((id, player_id));
        }
        Err(StoreError::CodeSpaceExhausted)
    }

    /// Look up a room's slot.
    pub async fn get(&self, id: &RoomId) -> Option<Arc<RoomSlot>> {
        self.rooms.read().await.get(id).cloned()
    }

    /// Look up a room's slot, failing with [`StoreError::RoomNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RoomNotFound`] if no such room exists.
    pub async fn slot(&self, id: &RoomId) -> Result<Arc<RoomSlot>, StoreError> {
        self.get(id)
            .await
            .ok_or_else(|| StoreError::RoomNotFound(id.clone()))
    }

    /// Current snapshot of a room.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RoomNotFound`] if no such room exists.
    pub async fn snapshot(&self, id: &RoomId) -> Result<Room, StoreError> {
        Ok(self.slot(id).await?.snapshot().await)
    }

    /// Number of registered rooms.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Whether no rooms are registered.
    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    /// Remove one room. Its connections' queues are dropped with it.
    pub async fn remove(&self, id: &RoomId) -> bool {
        self.rooms.write().await.remove(id).is_some()
    }

    /// Drop every room.
    pub async fn clear(&self) {
        let mut rooms = self.rooms.write().await;
        let count = rooms.len();
        rooms.clear();
        info!(count, "Room store cleared");
    }

    /// Allocate a connection identifier.
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed))
    }

    /// Evict rooms idle for longer than `max_idle`. Returns the evicted codes.
    ///
    /// A room whose lock is currently held is busy, not idle, and is
    /// skipped.
    pub async fn evict_idle(&self, max_idle: Duration) -> Vec<RoomId> {
        let mut rooms = self.rooms.write().await;
        let mut evicted = Vec::new();
        rooms.retain(|id, slot| {
            let idle = slot
                .state
                .try_lock()
                .is_ok_and(|state| state.idle_for() > max_idle);
            if idle {
                evicted.push(id.clone());
            }
            !idle
        });
        for id in &evicted {
            info!(room_id = %id, "Evicted idle room");
        }
        evicted
    }

    /// Run [`evict_idle`](Self::evict_idle) on a timer.
    ///
    /// Returns `None` when `idle_timeout_secs` is zero (eviction disabled).
    pub fn spawn_idle_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.settings.idle_timeout_secs == 0 {
            debug!("Idle room eviction disabled");
            return None;
        }
        let max_idle = Duration::from_secs(self.settings.idle_timeout_secs);
        let period = Duration::from_secs(self.settings.sweep_interval_secs.max(1));
        let store = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(max_idle).await;
                if !evicted.is_empty() {
                    debug!(count = evicted.len(), "Idle sweep finished");
                }
            }
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use ludo_types::RoomPhase;

    fn store() -> RoomStore {
        RoomStore::new(RoomsConfig::default())
    }

    #[tokio::test]
    async fn create_room_seats_host_as_red() {
        let store = store();
        let (id, player_id) = store.create_room("  Ana ").await.unwrap();
        let room = store.snapshot(&id).await.unwrap();
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.players[0].id, player_id);
        assert_eq!(room.players[0].display_name, "Ana");
        assert_eq!(room.players[0].color, Color::Red);
        assert_eq!(room.phase, RoomPhase::Waiting);
        assert_eq!(id.as_str().len(), 8);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let store = store();
        let (id, _) = store.create_room("Ana").await.unwrap();
        let lower = RoomId::parse(&id.as_str().to_ascii_lowercase()).unwrap();
        assert!(store.get(&lower).await.is_some());
    }

    #[tokio::test]
    async fn rejects_bad_names() {
        let store = store();
        assert!(matches!(
            store.create_room("   ").await,
            Err(StoreError::InvalidInput(_))
        ));
        let long = "x".repeat(33);
        assert!(matches!(
            store.create_room(&long).await,
            Err(StoreError::InvalidInput(_))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let store = store();
        let id = RoomId::parse("NOPE1234").unwrap();
        assert_eq!(
            store.snapshot(&id).await,
            Err(StoreError::RoomNotFound(id))
        );
    }

    #[tokio::test]
    async fn evicts_only_idle_rooms() {
        let store = store();
        let (id, _) = store.create_room("Ana").await.unwrap();
        assert!(store.evict_idle(Duration::from_secs(60)).await.is_empty());
        tokio::time::sleep(Duration::from_millis(20)).await;
        let evicted = store.evict_idle(Duration::from_millis(5)).await;
        assert_eq!(evicted, vec![id]);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn busy_room_is_not_evicted() {
        let store = store();
        let (id, _) = store.create_room("Ana").await.unwrap();
        let slot = store.get(&id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let guard = slot.lock().await;
        assert!(store.evict_idle(Duration::from_millis(5)).await.is_empty());
        drop(guard);
        assert_eq!(store.evict_idle(Duration::from_millis(5)).await.len(), 1);
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let store = store();
        store.create_room("Ana").await.unwrap();
        store.create_room("Ben").await.unwrap();
        store.clear().await;
        assert_eq!(store.len().await, 0);
    }

    #[test]
    fn connection_ids_are_unique() {
        let store = store();
        assert_ne!(store.next_connection_id(), store.next_connection_id());
    }
}
