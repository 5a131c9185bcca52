//! # Quizlink Engine Library
//!
//! This library provides the real-time session synchronization engine
//! for a multiplayer connection-quiz game: room membership and
//! lifecycle, the wire protocol, authoritative question rounds with
//! server-side deadlines, exactly-once answer acceptance, deterministic
//! scoring and leaderboards, and client reconnection with
//! resync-by-snapshot.
//!
//! The engine is transport-agnostic. The embedding server supplies a
//! [`session::Tunnel`] per connection, decodes inbound frames with
//! [`protocol::decode`], drives a [`game::GameSession`] with the
//! decoded messages, and schedules the `(AlarmMessage, Duration)` pairs
//! the session hands out, delivering them back through
//! [`game::GameSession::receive_alarm`] when they fire. All events for
//! one room must be processed sequentially; the
//! [`registry::Registry`] is the only piece that carries its own lock.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;

pub mod game;
pub mod leaderboard;
pub mod names;
pub mod protocol;
pub mod provider;
pub mod question;
pub mod reconnect;
pub mod registry;
pub mod room;
pub mod room_code;
pub mod session;
pub mod store;
