//! REST endpoint handlers for room lifecycle.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Plain-text banner |
//! | `GET` | `/health` | Liveness and room count |
//! | `POST` | `/create-room` | Open a room, seat the creator as red |
//! | `POST` | `/join-room` | Take the next free seat in a waiting room |
//! | `GET` | `/room/{room_id}` | Current room snapshot |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use ludo_types::{PlayerId, Room, RoomId};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameters and response bodies
// ---------------------------------------------------------------------------

/// Query parameters for `POST /create-room`.
#[derive(Debug, Deserialize)]
pub struct CreateRoomQuery {
    /// Display name of the creating player.
    #[serde(default)]
    pub player_name: String,
}

/// Query parameters for `POST /join-room`.
#[derive(Debug, Deserialize)]
pub struct JoinRoomQuery {
    /// Room code, case-insensitive.
    #[serde(default)]
    pub room_id: String,
    /// Display name of the joining player.
    #[serde(default)]
    pub player_name: String,
}

/// Body returned when a player is seated.
#[derive(Debug, Serialize)]
pub struct SeatResponse {
    /// The room's code.
    pub room_id: RoomId,
    /// The seated player's identifier, used in later actions.
    pub player_id: PlayerId,
    /// Human-readable confirmation.
    pub message: String,
}

/// Body of `GET /room/{room_id}`.
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    /// The room snapshot.
    pub room: Room,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: &'static str,
    /// Number of live rooms.
    pub rooms: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` -- plain-text banner.
pub async fn index(State(state): State<Arc<AppState>>) -> String {
    format!(
        "Ludo game server is running\nrooms: {}\n",
        state.store.len().await
    )
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        rooms: state.store.len().await,
    })
}

/// `POST /create-room?player_name=NAME`
///
/// # Errors
///
/// 400 if the name is empty or too long.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CreateRoomQuery>,
) -> Result<Json<SeatResponse>, ApiError> {
    let (room_id, player_id) = state
        .store
        .create_room(&query.player_name)
        .await
        .inspect_err(|e| warn!(error = %e, "Create room rejected"))?;
    Ok(Json(SeatResponse {
        message: format!("Room {room_id} created"),
        room_id,
        player_id,
    }))
}

/// `POST /join-room?room_id=ID&player_name=NAME`
///
/// A successful join is broadcast to the room as a `room_update`.
///
/// # Errors
///
/// 404 for an unknown room, 400 for a full room or bad input, 409 once
/// the game has started.
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JoinRoomQuery>,
) -> Result<Json<SeatResponse>, ApiError> {
    let room_id = RoomId::parse(&query.room_id)?;
    let player_id = state
        .coordinator
        .join_room(&room_id, &query.player_name)
        .await
        .inspect_err(|e| warn!(%room_id, error = %e, "Join rejected"))?;
    Ok(Json(SeatResponse {
        message: format!("Joined room {room_id}"),
        room_id,
        player_id,
    }))
}

/// `GET /room/{room_id}`
///
/// # Errors
///
/// 404 if the room does not exist, 400 for a malformed code.
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room_id = RoomId::parse(&raw)?;
    let room = state.store.snapshot(&room_id).await?;
    Ok(Json(RoomResponse { room }))
}
