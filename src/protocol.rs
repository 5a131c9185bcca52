//! Session protocol codec
//!
//! The wire protocol is a `{type: string, ...fields}` envelope carried
//! in UTF-8 text frames. Both directions are closed tagged enums so
//! dispatch is an exhaustive pattern match: adding an event type is a
//! compile-time-checked change, never a runtime string lookup. Encoding
//! is stable — a given logical event always serializes to the same
//! `type` string, so clients can dispatch by type alone.
//!
//! Malformed or unknown inbound messages fail decoding with a
//! [`ProtocolError`] that is reported back to the sender only; they
//! never reach the room.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    constants,
    leaderboard::LeaderboardEntry,
    names,
    question::QuestionView,
    registry::Id,
    room::RoomSnapshot,
};

/// Maximum accepted length of an inbound text frame in bytes
pub const MAX_FRAME_LENGTH: usize = 4096;

/// Events sent by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit an answer for the active question
    SubmitAnswer {
        /// The question being answered
        question_id: Uuid,
        /// The submitted answer text
        answer: String,
        /// Client-reported elapsed seconds at submission; informational
        /// only, clamped server-side before scoring
        #[serde(default)]
        time_taken: u64,
        /// Whether the client believes it used a hint; the server's own
        /// hint bookkeeping takes precedence
        #[serde(default)]
        used_hint: bool,
    },
    /// Host-only request to start the game
    StartGame,
    /// Host-only request to advance past a locked round
    NextQuestion,
    /// Reveal the hint for the active question
    RequestHint {
        /// The question whose hint is requested
        question_id: Uuid,
    },
    /// Keepalive; refreshes liveness and is answered with `pong`
    Ping,
}

/// Events sent by the server
///
/// Broadcasts go to every live connection in the room; `error`, `hint`
/// and `pong` are delivered to a single connection only.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A player joined the room
    PlayerJoined {
        /// Id of the joining player
        player_id: Id,
        /// Display name of the joining player
        player_name: String,
        /// Fresh room snapshot reflecting the join
        room_state: RoomSnapshot,
    },
    /// A player left the room
    PlayerLeft {
        /// Id of the departed player
        player_id: Id,
        /// Display name of the departed player
        player_name: String,
        /// Fresh room snapshot reflecting the departure
        room_state: RoomSnapshot,
    },
    /// A player's connection dropped mid-game; membership and score
    /// are preserved
    PlayerDisconnected {
        /// Id of the disconnected player
        player_id: Id,
        /// Fresh room snapshot reflecting the liveness change
        room_state: RoomSnapshot,
    },
    /// Authoritative full room snapshot; the resync payload
    RoomStateUpdate {
        /// The current room state
        state: RoomSnapshot,
    },
    /// The game began; carries the first question
    GameStarted {
        /// The first question, minus its correct answer
        question: QuestionView,
        /// One-based number of the carried question
        question_number: usize,
        /// Total number of questions in the game
        total_questions: usize,
    },
    /// A new round began; carries its question
    NextQuestion {
        /// The question, minus its correct answer
        question: QuestionView,
        /// One-based number of the carried question
        question_number: usize,
        /// Total number of questions in the game
        total_questions: usize,
    },
    /// A player's answer was accepted and scored
    AnswerSubmitted {
        /// Id of the submitting player
        player_id: Id,
        /// Display name of the submitting player
        player_name: String,
        /// The question that was answered
        question_id: Uuid,
        /// Whether the submission was correct
        is_correct: bool,
        /// The correct answer, revealed only when the submission was wrong
        correct_answer: Option<String>,
        /// Points awarded for this submission
        points_earned: i64,
        /// The player's running total after this submission
        total_score: i64,
    },
    /// Every live player has an accepted submission for the current
    /// question; the round locked early
    AllPlayersAnswered {
        /// The correct answer, revealed to the whole room on lock
        correct_answer: String,
        /// Per-player outcomes for the locked round
        deltas: Vec<RoundDelta>,
    },
    /// The authoritative timer expired; the round locked
    QuestionTimeEnded {
        /// The correct answer, revealed to the whole room on lock
        correct_answer: String,
        /// Per-player outcomes for the locked round
        deltas: Vec<RoundDelta>,
    },
    /// Hint text, delivered to the requesting connection only
    Hint {
        /// The question the hint belongs to
        question_id: Uuid,
        /// The hint text
        hint: String,
    },
    /// The game ended; carries the final leaderboard
    GameComplete {
        /// Final ranked results
        results: Vec<LeaderboardEntry>,
    },
    /// An error, delivered to the originating connection only
    Error {
        /// Stable machine-readable code
        code: String,
        /// Human-readable description
        message: String,
    },
    /// Keepalive reply, delivered to the pinging connection only
    Pong,
}

/// One player's outcome for a locked round
///
/// Carried on the lock notice so every client can render the reveal,
/// including members who never submitted (zero delta).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDelta {
    /// The player the outcome belongs to
    pub player_id: Id,
    /// Points the player earned this round, zero without a submission
    pub points_earned: i64,
    /// The player's running total after this round
    pub total_score: i64,
}

impl ServerMessage {
    /// Converts the event to its wire form
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which cannot happen
    /// with the default JSON serializer for these types.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Errors produced while decoding an inbound frame
///
/// Protocol errors are reported to the sender only and leave the
/// connection open and the room untouched.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The frame was not valid JSON, had no known `type`, or its
    /// payload did not match the declared shape
    #[error("invalid message format: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The frame exceeded [`MAX_FRAME_LENGTH`]
    #[error("message exceeds {MAX_FRAME_LENGTH} bytes")]
    Oversized,
    /// The payload decoded but fails a bound the schema cannot express
    #[error("invalid message: {0}")]
    Invalid(&'static str),
}

impl ProtocolError {
    /// Stable wire code for the `error` event
    pub fn code(&self) -> &'static str {
        "protocol_error"
    }

    /// Builds the `error` event reporting this failure to the sender
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error {
            code: self.code().to_owned(),
            message: self.to_string(),
        }
    }
}

/// Decodes and validates an inbound text frame
///
/// # Errors
///
/// Returns a [`ProtocolError`] when the frame is oversized, malformed,
/// of unknown type, or carries an out-of-bounds payload.
pub fn decode(frame: &str) -> Result<ClientMessage, ProtocolError> {
    if frame.len() > MAX_FRAME_LENGTH {
        return Err(ProtocolError::Oversized);
    }
    let message: ClientMessage = serde_json::from_str(frame)?;
    match &message {
        ClientMessage::SubmitAnswer { answer, .. } => {
            if answer.trim().is_empty() {
                return Err(ProtocolError::Invalid("answer cannot be empty"));
            }
            if answer.len() > constants::question::MAX_ANSWER_LENGTH {
                return Err(ProtocolError::Invalid("answer is too long"));
            }
        }
        ClientMessage::StartGame
        | ClientMessage::NextQuestion
        | ClientMessage::RequestHint { .. }
        | ClientMessage::Ping => {}
    }
    Ok(message)
}

/// A request that conflicts with the current room or game state
///
/// State conflicts are reported to the originating actor only; they
/// cause no broadcast and no state mutation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateConflict {
    /// The room is at capacity
    #[error("room is full")]
    RoomFull,
    /// The room is no longer accepting joins or starts
    #[error("game already started")]
    GameAlreadyStarted,
    /// Fewer live members than required to start
    #[error("not enough players to start the game")]
    InsufficientPlayers,
    /// The acting player is not the host
    #[error("only the host can do that")]
    NotHost,
    /// The acting player is not a member of the room
    #[error("player is not a member of this room")]
    NotMember,
    /// The player is already a member of the room
    #[error("player already joined this room")]
    AlreadyJoined,
    /// No game is currently active
    #[error("no game is in progress")]
    GameNotActive,
    /// The referenced question is not the current one
    #[error("question not found or no longer current")]
    UnknownQuestion,
    /// The round has not locked yet, so it cannot be advanced
    #[error("the current question is still active")]
    QuestionStillActive,
    /// The player already has an accepted submission for this question
    #[error("answer already submitted for this question")]
    AnswerAlreadySubmitted,
    /// The round locked on its deadline before the submission arrived
    #[error("time limit exceeded for this question")]
    TimeLimitExceeded,
    /// The current question has no hint
    #[error("no hint available for this question")]
    HintUnavailable,
    /// A supplied display name failed validation
    #[error("invalid name: {0}")]
    InvalidName(#[from] names::Error),
}

impl StateConflict {
    /// Stable machine-readable code carried in the `error` event
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomFull => "room_full",
            Self::GameAlreadyStarted => "game_already_started",
            Self::InsufficientPlayers => "insufficient_players",
            Self::NotHost => "not_host",
            Self::NotMember => "not_member",
            Self::AlreadyJoined => "already_joined",
            Self::GameNotActive => "game_not_active",
            Self::UnknownQuestion => "unknown_question",
            Self::QuestionStillActive => "question_still_active",
            Self::AnswerAlreadySubmitted => "answer_already_submitted",
            Self::TimeLimitExceeded => "time_limit_exceeded",
            Self::HintUnavailable => "hint_unavailable",
            Self::InvalidName(_) => "invalid_name",
        }
    }

    /// Builds the `error` event reporting this conflict to the actor
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error {
            code: self.code().to_owned(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_submit_answer() {
        let frame = r#"{"type":"submit_answer","question_id":"4a3e4ff5-7f4b-4a70-9a6b-48a9e7b6c111","answer":"Apple","time_taken":5,"used_hint":false}"#;
        let message = decode(frame).unwrap();
        match message {
            ClientMessage::SubmitAnswer {
                answer, time_taken, used_hint, ..
            } => {
                assert_eq!(answer, "Apple");
                assert_eq!(time_taken, 5);
                assert!(!used_hint);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_decode_defaults_optional_submit_fields() {
        let frame = r#"{"type":"submit_answer","question_id":"4a3e4ff5-7f4b-4a70-9a6b-48a9e7b6c111","answer":"Apple"}"#;
        match decode(frame).unwrap() {
            ClientMessage::SubmitAnswer {
                time_taken, used_hint, ..
            } => {
                assert_eq!(time_taken, 0);
                assert!(!used_hint);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_decode_payloadless_messages() {
        assert!(matches!(decode(r#"{"type":"ping"}"#), Ok(ClientMessage::Ping)));
        assert!(matches!(
            decode(r#"{"type":"next_question"}"#),
            Ok(ClientMessage::NextQuestion)
        ));
        assert!(matches!(
            decode(r#"{"type":"start_game"}"#),
            Ok(ClientMessage::StartGame)
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(matches!(
            decode(r#"{"type":"teleport"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        assert!(matches!(decode("not json"), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_empty_answer() {
        let frame = r#"{"type":"submit_answer","question_id":"4a3e4ff5-7f4b-4a70-9a6b-48a9e7b6c111","answer":"   "}"#;
        assert!(matches!(decode(frame), Err(ProtocolError::Invalid(_))));
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        let padding = "x".repeat(MAX_FRAME_LENGTH);
        let frame = format!(r#"{{"type":"ping","padding":"{padding}"}}"#);
        assert!(matches!(decode(&frame), Err(ProtocolError::Oversized)));
    }

    #[test]
    fn test_encode_uses_stable_type_strings() {
        let encoded = ServerMessage::Pong.encode();
        assert_eq!(encoded, r#"{"type":"pong"}"#);

        let encoded = ServerMessage::AllPlayersAnswered {
            correct_answer: "Apple".to_owned(),
            deltas: Vec::new(),
        }
        .encode();
        assert!(encoded.contains(r#""type":"all_players_answered""#));

        let encoded = ServerMessage::QuestionTimeEnded {
            correct_answer: "Apple".to_owned(),
            deltas: Vec::new(),
        }
        .encode();
        assert!(encoded.contains(r#""type":"question_time_ended""#));
        assert!(encoded.contains(r#""correct_answer":"Apple""#));
    }

    #[test]
    fn test_error_event_carries_code_and_message() {
        let message = StateConflict::RoomFull.to_message();
        let encoded = message.encode();
        assert!(encoded.contains(r#""type":"error""#));
        assert!(encoded.contains(r#""code":"room_full""#));
        assert!(encoded.contains("room is full"));
    }

    #[test]
    fn test_state_conflict_codes_are_snake_case() {
        let conflicts = [
            StateConflict::RoomFull,
            StateConflict::GameAlreadyStarted,
            StateConflict::InsufficientPlayers,
            StateConflict::AnswerAlreadySubmitted,
            StateConflict::TimeLimitExceeded,
        ];
        for conflict in conflicts {
            let code = conflict.code();
            assert!(code.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn test_correct_answer_omitted_when_absent() {
        let message = ServerMessage::AnswerSubmitted {
            player_id: Id::new(),
            player_name: "Alice".to_owned(),
            question_id: Uuid::new_v4(),
            is_correct: true,
            correct_answer: None,
            points_earned: 100,
            total_score: 100,
        };
        let encoded = message.encode();
        assert!(!encoded.contains("correct_answer"));
    }
}
