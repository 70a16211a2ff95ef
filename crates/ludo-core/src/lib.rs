//! Board model, rules engine, and configuration for the Ludo game server.
//!
//! Everything here is synchronous and free of I/O (apart from reading
//! the config file). The server crate wraps these functions in its
//! per-room serialization and broadcast machinery.
//!
//! # Modules
//!
//! - [`board`] -- Ring topology, safe cells, entry cells, and
//!   [`compute_next_index`](board::compute_next_index).
//! - [`engine`] -- `start_game`, `roll_dice`, and `move_piece` against a
//!   single [`Room`](ludo_types::Room).
//! - [`config`] -- Configuration loading from `ludo-config.yaml` into
//!   strongly-typed structs.

pub mod board;
pub mod config;
pub mod engine;

pub use config::{ConfigError, ServerConfig};
pub use engine::{EngineError, Rejection};
