//! Player identity and connection registry
//!
//! This module tracks the live transport connections of a single room.
//! It guarantees at most one active connection per player: admitting a
//! new tunnel for a player closes and replaces any previous one, which
//! makes duplicate client reconnect attempts idempotent.
//!
//! The registry carries its own interior lock because connection
//! admission and eviction may race the room's serialized event
//! processing; everything else in the engine is mutated only by the
//! room's single owner.

use std::{
    collections::HashMap,
    fmt::Display,
    str::FromStr,
    sync::{Mutex, PoisonError},
};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;
use web_time::SystemTime;

use crate::{protocol::ServerMessage, session::Tunnel};

/// A unique identifier for a player
///
/// Issued by the external identity service; the engine treats it as an
/// opaque UUID that persists across reconnections.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random player ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A live connection entry: the tunnel plus its last-seen timestamp
struct Entry<T> {
    tunnel: T,
    last_seen: SystemTime,
}

/// Tracks the live connections of one room
///
/// `T` is the transport tunnel type; production embedders wrap their
/// WebSocket sinks, tests use a recording double.
pub struct Registry<T: Tunnel> {
    connections: Mutex<HashMap<Id, Entry<T>>>,
}

impl<T: Tunnel> Default for Registry<T> {
    fn default() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Tunnel> Registry<T> {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Id, Entry<T>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits a connection for a player, replacing any existing one
    ///
    /// The previous tunnel, if any, is closed before the new one is
    /// registered, so the room never holds two live handles for one
    /// player.
    pub fn admit(&self, player: Id, tunnel: T) {
        let previous = self.lock().insert(
            player,
            Entry {
                tunnel,
                last_seen: SystemTime::now(),
            },
        );
        if let Some(previous) = previous {
            log::debug!("replacing existing connection for player {player}");
            previous.tunnel.close();
        }
    }

    /// Removes and closes a player's connection, if one is live
    pub fn evict(&self, player: Id) {
        if let Some(entry) = self.lock().remove(&player) {
            log::debug!("evicting connection for player {player}");
            entry.tunnel.close();
        }
    }

    /// Returns whether a player currently has a live connection
    pub fn is_live(&self, player: Id) -> bool {
        self.lock().contains_key(&player)
    }

    /// Returns the number of live connections
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    /// Refreshes a player's last-seen timestamp
    ///
    /// Called when a keepalive ping arrives.
    pub fn touch(&self, player: Id) {
        if let Some(entry) = self.lock().get_mut(&player) {
            entry.last_seen = SystemTime::now();
        }
    }

    /// Returns a player's last-seen timestamp, if they are connected
    pub fn last_seen(&self, player: Id) -> Option<SystemTime> {
        self.lock().get(&player).map(|entry| entry.last_seen)
    }

    /// Sends an event to a single player
    ///
    /// Delivery failure evicts the dead connection and reports the
    /// player's id so the caller can update liveness; it is never
    /// surfaced as an error.
    pub fn send_to(&self, player: Id, message: &ServerMessage) -> Option<Id> {
        let failed = {
            let guard = self.lock();
            match guard.get(&player) {
                Some(entry) => entry.tunnel.send(message).is_err(),
                None => false,
            }
        };
        if failed {
            self.evict(player);
            return Some(player);
        }
        None
    }

    /// Broadcasts an event to every live connection in the room
    ///
    /// Failed deliveries are swallowed: the dead connections are
    /// evicted and their player ids returned so the caller can mark
    /// them disconnected and notify the remaining members.
    pub fn broadcast(&self, message: &ServerMessage) -> Vec<Id> {
        let dead: Vec<Id> = {
            let guard = self.lock();
            guard
                .iter()
                .filter(|(_, entry)| entry.tunnel.send(message).is_err())
                .map(|(id, _)| *id)
                .collect()
        };
        for id in &dead {
            self.evict(*id);
        }
        dead
    }

    /// Closes every connection and empties the registry
    ///
    /// Used when a room completes or is abandoned.
    pub fn close_all(&self) {
        let entries = {
            let mut guard = self.lock();
            std::mem::take(&mut *guard)
        };
        for (_, entry) in entries {
            entry.tunnel.close();
        }
    }
}
