//! Authoritative Ludo game server.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Room lifecycle endpoints** (`/create-room`, `/join-room`,
//!   `/room/{room_id}`, `/health`)
//! - **`WebSocket` endpoint** (`/ws/{room_id}`) through which players
//!   send game actions and every viewer receives the resulting updates
//!
//! # Architecture
//!
//! The [`RoomStore`] owns every room. The [`SessionCoordinator`] runs
//! each inbound action against the rules engine while holding that
//! room's lock, then fans the result out through the room's broadcast
//! hub before releasing it. Actions for one room are therefore applied
//! strictly one at a time and every viewer sees them in the same order;
//! different rooms never contend.
//!
//! [`RoomStore`]: store::RoomStore
//! [`SessionCoordinator`]: coordinator::SessionCoordinator

pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod router;
pub mod server;
pub mod state;
pub mod store;
pub mod ws;

// Re-export primary types for convenience.
pub use coordinator::{Connection, Dispatch, SessionCoordinator};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
pub use store::{RoomStore, StoreError};
