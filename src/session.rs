//! Communication session management
//!
//! This module defines the trait for tunneling messages between the
//! engine and connected clients. The tunnel abstraction allows for
//! different transports (WebSockets in production, recording doubles in
//! tests) while keeping the engine free of socket code.

use thiserror::Error;

use crate::protocol::ServerMessage;

/// Delivery to a client failed because its connection is gone
///
/// Senders treat this as a liveness signal, never as a fatal error: the
/// registry collects failed deliveries and evicts the dead connections
/// lazily.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("connection closed")]
pub struct TransportFailure;

/// Trait for sending messages through a communication tunnel
///
/// One tunnel corresponds to one live transport connection for one
/// player in one room.
pub trait Tunnel {
    /// Sends a server event to the client
    ///
    /// # Errors
    ///
    /// Returns [`TransportFailure`] if the underlying connection is
    /// closed or closing. Callers must not surface this to the room.
    fn send(&self, message: &ServerMessage) -> Result<(), TransportFailure>;

    /// Closes the tunnel
    ///
    /// Called when the connection is replaced by a newer one for the
    /// same player, or when the room shuts down.
    fn close(self);
}
