//! Question content provider boundary
//!
//! Question generation is an external collaborator: the engine asks for
//! an ordered sequence and never looks inside the generation process.
//! Provider failure surfaces to the host as an error without consuming
//! a round; the room stays in its prior state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::question::Question;

/// Requested difficulty of a question sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Broad, well-known connections
    Easy,
    /// The default
    Medium,
    /// Obscure connections
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

/// A request for one game's worth of questions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    /// Topic the questions should revolve around
    pub topic: String,
    /// Requested difficulty
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Number of questions wanted
    pub count: usize,
}

/// The content provider could not supply a usable sequence
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider was unreachable or errored upstream
    #[error("question provider unavailable: {0}")]
    Unavailable(String),
    /// The provider answered with an empty sequence
    #[error("question provider returned no questions")]
    Empty,
    /// The provider's content failed validation
    #[error("question provider returned invalid content: {0}")]
    Invalid(String),
}

/// Supplies ordered question sequences for new games
///
/// Called synchronously from the room's serialized processing while the
/// room is `Starting`; implementations that reach over the network
/// should resolve the content before the start request is handed to the
/// engine and serve it from memory here.
pub trait QuestionProvider {
    /// Produces `request.count` questions, ordered, ordinals assigned
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the sequence cannot be supplied;
    /// the game does not start and no round is consumed.
    fn questions(&self, request: &QuestionRequest) -> Result<Vec<Question>, ProviderError>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::question::fixtures::choice_question;

    /// A provider that serves a fixed in-memory sequence
    pub(crate) struct FixedProvider {
        pub(crate) questions: Vec<Question>,
    }

    impl FixedProvider {
        /// `count` well-formed multiple-choice questions
        pub(crate) fn with_questions(count: usize) -> Self {
            Self {
                questions: (0..count).map(choice_question).collect(),
            }
        }
    }

    impl QuestionProvider for FixedProvider {
        fn questions(&self, request: &QuestionRequest) -> Result<Vec<Question>, ProviderError> {
            if self.questions.is_empty() {
                return Err(ProviderError::Empty);
            }
            Ok(self.questions.iter().take(request.count).cloned().collect())
        }
    }

    /// A provider that always fails, simulating an upstream outage
    pub(crate) struct FailingProvider;

    impl QuestionProvider for FailingProvider {
        fn questions(&self, _request: &QuestionRequest) -> Result<Vec<Question>, ProviderError> {
            Err(ProviderError::Unavailable("upstream timeout".to_owned()))
        }
    }
}
