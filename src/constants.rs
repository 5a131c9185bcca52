//! Configuration constants for the quiz session engine
//!
//! This module contains the limits and default values used throughout
//! the engine. Point values are intentionally data, not behavior: the
//! scoring algorithm reads a [`crate::leaderboard::ScoringConfig`] built
//! from these constants so either rule set can be selected without
//! touching the algorithm itself.

/// Room configuration constants
pub mod room {
    /// Number of characters in a room join code
    pub const CODE_LENGTH: usize = 6;
    /// Minimum number of members a room can be configured to hold
    pub const MIN_CAPACITY: usize = 2;
    /// Maximum number of members a room can be configured to hold
    pub const MAX_CAPACITY: usize = 10;
    /// Capacity used when a room is created without an explicit one
    pub const DEFAULT_CAPACITY: usize = 6;
    /// Maximum length of a room display name in characters
    pub const MAX_NAME_LENGTH: usize = 100;
    /// Minimum number of live members required to start a game
    pub const MIN_PLAYERS_TO_START: usize = 2;
}

/// Player configuration constants
pub mod player {
    /// Maximum length of a player display name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
}

/// Question configuration constants
pub mod question {
    /// Maximum length of the question text in characters
    pub const MAX_TEXT_LENGTH: usize = 500;
    /// Maximum number of displayed items per question
    pub const MAX_ITEMS: usize = 8;
    /// Maximum number of options for a multiple-choice answer
    pub const MAX_OPTIONS: usize = 8;
    /// Maximum length of an answer or option in characters
    pub const MAX_ANSWER_LENGTH: usize = 200;
    /// Maximum length of a hint in characters
    pub const MAX_HINT_LENGTH: usize = 500;
    /// Minimum time limit in seconds for answering a question
    pub const MIN_TIME_LIMIT: u64 = 5;
    /// Maximum time limit in seconds for answering a question
    pub const MAX_TIME_LIMIT: u64 = 240;
    /// Time limit used when a question does not carry one
    pub const DEFAULT_TIME_LIMIT: u64 = 30;
}

/// Game configuration constants
pub mod game {
    /// Number of questions requested from the content provider per game
    pub const DEFAULT_QUESTION_COUNT: usize = 10;
    /// Maximum number of questions a single game may hold
    pub const MAX_QUESTION_COUNT: usize = 100;
}

/// Default point values for the scoring rules
///
/// These are the values the engine uses unless a different
/// [`crate::leaderboard::ScoringConfig`] is supplied.
pub mod scoring {
    /// Points for a correct answer without a hint
    pub const CORRECT: i64 = 100;
    /// Points for a correct answer after requesting a hint
    pub const CORRECT_WITH_HINT: i64 = 50;
    /// Points for an incorrect answer without a hint
    pub const INCORRECT: i64 = 0;
    /// Points for an incorrect answer after requesting a hint
    pub const INCORRECT_WITH_HINT: i64 = -10;
}

/// Point values matching the stated product rules
///
/// Kept alongside the defaults because the two sources disagree; the
/// choice between them is a product decision, not an engine one.
pub mod scoring_product_rules {
    /// Points for a correct answer without a hint
    pub const CORRECT: i64 = 10;
    /// Points for a correct answer after requesting a hint
    pub const CORRECT_WITH_HINT: i64 = 5;
    /// Points for an incorrect answer without a hint
    pub const INCORRECT: i64 = 0;
    /// Points for an incorrect answer after requesting a hint
    pub const INCORRECT_WITH_HINT: i64 = -5;
}

/// Client reconnection constants
pub mod reconnect {
    /// Base delay in milliseconds between reconnection attempts;
    /// attempt `n` waits `n * BASE_DELAY_MS`
    pub const BASE_DELAY_MS: u64 = 1000;
    /// Number of reconnection attempts before giving up
    pub const MAX_ATTEMPTS: u32 = 5;
    /// WebSocket close code signalling a deliberate, normal closure
    pub const NORMAL_CLOSURE: u16 = 1000;
}
