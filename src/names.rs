//! Display-name validation
//!
//! Players and rooms carry caller-chosen display names. This module
//! checks them once, at the boundary: trimming, length bounds, and
//! content filtering. Uniqueness within a room is the room's concern,
//! not this module's, but the error variant lives here so every naming
//! failure is reported through one vocabulary.

use rustrict::CensorStr;
use serde::Serialize;
use thiserror::Error;

use crate::constants;

/// Errors that can occur when validating a display name
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The name is empty after trimming whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Inappropriate,
    /// Another member of the room already uses this name
    #[error("name is already in use")]
    Used,
}

/// Validates a player display name and returns its canonical form
///
/// The canonical form is the input with surrounding whitespace removed;
/// interior casing and spacing are preserved.
///
/// # Errors
///
/// Returns an [`Error`] when the name is empty, too long, or filtered.
pub fn clean_player_name(name: &str) -> Result<String, Error> {
    clean(name, constants::player::MAX_NAME_LENGTH)
}

/// Validates a room display name and returns its canonical form
///
/// # Errors
///
/// Returns an [`Error`] when the name is empty, too long, or filtered.
pub fn clean_room_name(name: &str) -> Result<String, Error> {
    clean(name, constants::room::MAX_NAME_LENGTH)
}

fn clean(name: &str, max_length: usize) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Empty);
    }
    if name.len() > max_length {
        return Err(Error::TooLong);
    }
    if name.is_inappropriate() {
        return Err(Error::Inappropriate);
    }
    Ok(name.to_owned())
}
