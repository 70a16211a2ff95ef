//! Type-safe identifiers for rooms, players, and pieces.
//!
//! Players get a strongly-typed UUID wrapper so they cannot be mixed up
//! with other identifiers at compile time. Rooms use a short uppercase
//! code instead, because the code is typed by humans and shared between
//! friends: it is the routing key for both the REST API and the
//! `WebSocket` endpoint.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Longest room code accepted from a client.
pub const MAX_ROOM_CODE_LENGTH: usize = 16;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a player seated in a room.
    PlayerId
}

/// Index of a piece within its owner's set of four (0 through 3).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct PieceId(pub u8);

impl core::fmt::Display for PieceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors produced when parsing a room code supplied by a client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomIdError {
    /// The code was empty after trimming whitespace.
    #[error("room code is empty")]
    Empty,

    /// The code exceeded [`MAX_ROOM_CODE_LENGTH`] characters.
    #[error("room code is longer than {MAX_ROOM_CODE_LENGTH} characters")]
    TooLong,

    /// The code contained something other than ASCII letters and digits.
    #[error("room code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Canonical (uppercase) room code.
///
/// Codes are case-insensitive on the way in: [`RoomId::parse`] trims and
/// uppercases, so `ab12cd34` and `AB12CD34` address the same room.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct RoomId(String);

impl RoomId {
    /// Generate a fresh room code of `length` uppercase hex characters.
    ///
    /// The characters come from a random v4 UUID. `length` is clamped to
    /// the 32 hex digits a UUID provides and to at least one character.
    pub fn generate(length: usize) -> Self {
        let code: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(length.max(1))
            .collect();
        Self(code.to_ascii_uppercase())
    }

    /// Parse and normalize a client-supplied room code.
    ///
    /// # Errors
    ///
    /// Returns [`RoomIdError`] if the code is empty, too long, or contains
    /// characters other than ASCII alphanumerics.
    pub fn parse(raw: &str) -> Result<Self, RoomIdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RoomIdError::Empty);
        }
        if trimmed.chars().count() > MAX_ROOM_CODE_LENGTH {
            return Err(RoomIdError::TooLong);
        }
        if let Some(bad) = trimmed.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(RoomIdError::InvalidCharacter(bad));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Borrow the canonical code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoomId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn player_ids_are_unique() {
        let a = PlayerId::new();
        let b = PlayerId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn room_code_is_normalized_to_uppercase() {
        let id = RoomId::parse("  ab12Cd34 ").unwrap();
        assert_eq!(id.as_str(), "AB12CD34");
        assert_eq!(id, RoomId::parse("AB12CD34").unwrap());
    }

    #[test]
    fn room_code_rejects_bad_input() {
        assert_eq!(RoomId::parse("   "), Err(RoomIdError::Empty));
        assert_eq!(RoomId::parse("AB-12"), Err(RoomIdError::InvalidCharacter('-')));
        assert_eq!(
            RoomId::parse("ABCDEFGHIJKLMNOPQ"),
            Err(RoomIdError::TooLong)
        );
    }

    #[test]
    fn generated_code_has_requested_length() {
        let id = RoomId::generate(8);
        assert_eq!(id.as_str().len(), 8);
        assert_eq!(id.as_str(), id.as_str().to_ascii_uppercase());
        assert!(RoomId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn serializes_as_plain_values() {
        let json = serde_json::to_string(&PieceId(3)).unwrap();
        assert_eq!(json, "3");
        let room = RoomId::parse("abc").unwrap();
        assert_eq!(serde_json::to_string(&room).unwrap(), "\"ABC\"");
    }
}
