//! Axum router construction.
//!
//! Assembles the REST and `WebSocket` routes into a single [`Router`]
//! with CORS and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete router for the Ludo server.
///
/// The router includes:
/// - `GET /` -- plain-text banner
/// - `GET /health` -- liveness and room count
/// - `POST /create-room` -- open a room
/// - `POST /join-room` -- join a waiting room
/// - `GET /room/{room_id}` -- room snapshot
/// - `GET /ws/{room_id}` -- live game session
///
/// CORS allows the configured origins, or any origin if none are set.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.config.server.allowed_origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // Room lifecycle
        .route("/create-room", post(handlers::create_room))
        .route("/join-room", post(handlers::join_room))
        .route("/room/{room_id}", get(handlers::get_room))
        // WebSocket
        .route("/ws/{room_id}", get(ws::ws_room))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn allowed_origins(origins: &[String]) -> AllowOrigin {
    if origins.is_empty() {
        return AllowOrigin::from(Any);
    }
    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!(%origin, "Ignoring invalid CORS origin: {e}"))
                .ok()
        })
        .collect();
    AllowOrigin::list(values)
}
