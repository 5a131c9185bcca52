//! Room code generation and parsing
//!
//! This module provides the short join codes that identify rooms. Codes
//! are six characters drawn from uppercase letters and digits so they
//! can be read out loud or typed on a phone without ambiguity about
//! case.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

use crate::constants;

/// Alphabet used for generated codes
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A unique join code identifying a room
///
/// Codes serialize as their string form (e.g. `"ABC123"`) so clients can
/// treat them as opaque strings.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct RoomCode([u8; constants::room::CODE_LENGTH]);

/// Errors that can occur when parsing a room code
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The string is not exactly [`constants::room::CODE_LENGTH`] characters
    #[error("room code must be exactly {} characters", constants::room::CODE_LENGTH)]
    WrongLength,
    /// The string contains a character outside `A-Z0-9`
    #[error("room code may only contain uppercase letters and digits")]
    InvalidCharacter,
}

impl RoomCode {
    /// Creates a new random room code
    ///
    /// Uniqueness across live rooms is the caller's responsibility; the
    /// code space (36^6) makes collisions rare but not impossible.
    pub fn new() -> Self {
        let mut code = [0u8; constants::room::CODE_LENGTH];
        for c in &mut code {
            *c = ALPHABET[fastrand::usize(..ALPHABET.len())];
        }
        Self(code)
    }

    /// Returns the code as a string slice
    pub fn as_str(&self) -> &str {
        // The alphabet is pure ASCII, so the bytes are always valid UTF-8.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Default for RoomCode {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomCode {
    type Err = Error;

    /// Parses a room code, normalizing lowercase input to uppercase
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongLength`] or [`Error::InvalidCharacter`] when
    /// the string does not look like a code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut code = [0u8; constants::room::CODE_LENGTH];
        if s.len() != constants::room::CODE_LENGTH {
            return Err(Error::WrongLength);
        }
        for (slot, c) in code.iter_mut().zip(s.bytes()) {
            let c = c.to_ascii_uppercase();
            if !ALPHABET.contains(&c) {
                return Err(Error::InvalidCharacter);
            }
            *slot = c;
        }
        Ok(Self(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_codes_are_well_formed() {
        for _ in 0..100 {
            let code = RoomCode::new();
            let s = code.to_string();
            assert_eq!(s.len(), constants::room::CODE_LENGTH);
            assert!(s.bytes().all(|c| ALPHABET.contains(&c)));
        }
    }

    #[test]
    fn test_from_str_round_trip() {
        let code = RoomCode::from_str("ABC123").unwrap();
        assert_eq!(code.to_string(), "ABC123");
    }

    #[test]
    fn test_from_str_normalizes_case() {
        let code = RoomCode::from_str("abc123").unwrap();
        assert_eq!(code.to_string(), "ABC123");
    }

    #[test]
    fn test_from_str_rejects_wrong_length() {
        assert_eq!(RoomCode::from_str("ABC12"), Err(Error::WrongLength));
        assert_eq!(RoomCode::from_str("ABC1234"), Err(Error::WrongLength));
        assert_eq!(RoomCode::from_str(""), Err(Error::WrongLength));
    }

    #[test]
    fn test_from_str_rejects_invalid_characters() {
        assert_eq!(RoomCode::from_str("ABC12!"), Err(Error::InvalidCharacter));
        assert_eq!(RoomCode::from_str("ABC 12"), Err(Error::InvalidCharacter));
    }

    #[test]
    fn test_serialization_is_string_form() {
        let code = RoomCode::from_str("XYZ789").unwrap();
        let serialized = serde_json::to_string(&code).unwrap();
        assert_eq!(serialized, "\"XYZ789\"");

        let deserialized: RoomCode = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, code);
    }
}
