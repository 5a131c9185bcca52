//! Durable result store boundary
//!
//! The engine writes the final leaderboard once, on game completion,
//! and never reads or writes the store mid-round. A failed write is
//! logged and swallowed: losing a historical record must not break the
//! live room.

use thiserror::Error;

use crate::{leaderboard::LeaderboardEntry, room_code::RoomCode};

/// The store rejected or failed a write
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store was unreachable
    #[error("result store unavailable: {0}")]
    Unavailable(String),
    /// The store rejected the record
    #[error("result store rejected the record: {0}")]
    Rejected(String),
}

/// Persists final game results for later retrieval
pub trait ResultStore {
    /// Records the final leaderboard of a completed game
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails; callers log and
    /// continue.
    fn record_results(
        &mut self,
        room: RoomCode,
        results: &[LeaderboardEntry],
    ) -> Result<(), StoreError>;
}
