//! Client reconnection management
//!
//! A pure state machine the client embedder drives with connection
//! lifecycle events. It decides whether and when to retry after a
//! drop, with linearly growing backoff and a bounded attempt budget,
//! and it owns the client's authoritative view of the session as an
//! explicit versioned snapshot that is replaced wholesale on every
//! resync. The wire protocol has no sequence numbers, so a snapshot
//! replacement after every (re)connection is the only correctness
//! guarantee.
//!
//! Handler attachment is guarded by a token issued per connection:
//! re-running the attach step with a stale token attaches nothing, so
//! a reconnect loop can never stack duplicate callbacks.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::{constants, question::QuestionView, room::RoomSnapshot};

/// Retry behavior knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay before the first retry; attempt `n` waits `n` times this
    pub base_delay: Duration,
    /// Retries attempted before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(constants::reconnect::BASE_DELAY_MS),
            max_attempts: constants::reconnect::MAX_ATTEMPTS,
        }
    }
}

/// Token issued per successful connection, required to attach handlers
///
/// Comparing tokens is how [`ReconnectManager::attach_handlers`]
/// detects a stale attach step from a superseded connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachToken(u64);

/// The client's versioned view of the session
///
/// Replaced wholesale on every resync; the version only moves forward,
/// so consumers can detect that their borrowed view went stale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Bumped on every snapshot replacement
    pub version: u64,
    /// The latest authoritative room snapshot
    pub room: Option<RoomSnapshot>,
    /// The current question, when a round is underway
    pub question: Option<QuestionView>,
}

/// Where the logical connection currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No connection has been opened yet
    Idle,
    /// A connection is live
    Connected,
    /// Waiting out a backoff delay before retry number `attempt`
    Retrying(u32),
    /// The attempt budget ran out
    Failed,
}

/// What the embedder should do after a lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Reconnect after the given delay; `attempt` is one-based
    Retry {
        /// Wait this long before dialing again
        after: Duration,
        /// Which retry this is
        attempt: u32,
    },
    /// Terminal failure; surface it to the user and stop retrying
    GiveUp,
    /// The peer closed normally; do not retry
    Stop,
}

/// Drives one logical connection for one (room, player) pair
#[derive(Debug)]
pub struct ReconnectManager {
    policy: ReconnectPolicy,
    phase: Phase,
    attempts: u32,
    token: u64,
    attached: bool,
    state: SessionState,
}

impl Default for ReconnectManager {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

impl ReconnectManager {
    /// Creates a manager with the given retry policy
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            phase: Phase::Idle,
            attempts: 0,
            token: 0,
            attached: false,
            state: SessionState::default(),
        }
    }

    /// The client's current view of the session
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether retrying has been given up on
    pub fn has_failed(&self) -> bool {
        self.phase == Phase::Failed
    }

    /// Records a successful (re)connection and issues the attach token
    ///
    /// Resets the attempt budget. The embedder must run its single
    /// attach-handlers step with the returned token and then request a
    /// resync; local state from before the drop is not trusted.
    pub fn connection_opened(&mut self) -> AttachToken {
        self.phase = Phase::Connected;
        self.attempts = 0;
        self.token += 1;
        self.attached = false;
        AttachToken(self.token)
    }

    /// Claims the attach step for the given connection token
    ///
    /// Returns whether handlers should be attached now. `false` means
    /// the token is stale or the step already ran; attaching again
    /// would duplicate callbacks.
    pub fn attach_handlers(&mut self, token: AttachToken) -> bool {
        if token.0 != self.token || self.attached {
            return false;
        }
        self.attached = true;
        true
    }

    /// Records a connection close and decides what happens next
    ///
    /// A normal closure stops the manager; anything else retries with
    /// linearly increasing backoff until the attempt budget runs out.
    pub fn connection_closed(&mut self, close_code: u16) -> Directive {
        if close_code == constants::reconnect::NORMAL_CLOSURE {
            self.phase = Phase::Idle;
            return Directive::Stop;
        }
        self.attempts += 1;
        if self.attempts > self.policy.max_attempts {
            self.phase = Phase::Failed;
            log::warn!("giving up after {} reconnect attempts", self.policy.max_attempts);
            return Directive::GiveUp;
        }
        self.phase = Phase::Retrying(self.attempts);
        Directive::Retry {
            after: self.policy.base_delay * self.attempts,
            attempt: self.attempts,
        }
    }

    /// Replaces the session view with a fresh authoritative snapshot
    ///
    /// Wholesale replacement: nothing from the previous view survives,
    /// and the version moves forward.
    pub fn apply_resync(&mut self, room: RoomSnapshot, question: Option<QuestionView>) {
        self.state = SessionState {
            version: self.state.version + 1,
            room: Some(room),
            question,
        };
    }
}
