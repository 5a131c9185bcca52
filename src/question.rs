//! Question content and answer checking
//!
//! Questions are produced by an external content provider and are
//! immutable once issued to clients. Each question shows a set of items
//! that share a connection; players identify the connection either by
//! picking a multiple-choice option or by typing it freely. The correct
//! answer never leaves the server before the round locks: clients only
//! ever see a [`QuestionView`].

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

use crate::constants;

/// Validates that a multiple-choice correct index points at an option
fn validate_correct_index(correct: &usize, ctx: &Context) -> garde::Result {
    if *correct < ctx.option_count {
        Ok(())
    } else {
        Err(garde::Error::new("correct index out of range"))
    }
}

/// The answer representation of a question
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[garde(context(Context))]
pub enum AnswerSpec {
    /// Multiple-choice: a list of displayed options with one correct index
    Choice {
        /// The options shown to players, in display order
        #[garde(length(min = 2, max = constants::question::MAX_OPTIONS), inner(length(max = constants::question::MAX_ANSWER_LENGTH)))]
        options: Vec<String>,
        /// Index of the correct option within `options`
        #[garde(custom(validate_correct_index))]
        correct: usize,
    },
    /// Free-text: players type the connection themselves
    FreeText {
        /// The canonical correct answer
        #[garde(length(min = 1, max = constants::question::MAX_ANSWER_LENGTH))]
        answer: String,
    },
}

/// Validation context carrying cross-field information for [`AnswerSpec`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    /// Number of options in the spec being validated
    pub option_count: usize,
}

/// A single question in a game
///
/// Immutable once issued; the ordinal is the question's position within
/// its game, starting at zero.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[garde(context(Context))]
pub struct Question {
    /// Unique identifier, referenced by answer submissions
    #[garde(skip)]
    pub id: Uuid,
    /// Zero-based position within the game's question sequence
    #[garde(skip)]
    pub ordinal: usize,
    /// The question text shown above the items
    #[garde(length(max = constants::question::MAX_TEXT_LENGTH))]
    pub text: String,
    /// The displayed items whose connection must be found
    #[garde(length(min = 1, max = constants::question::MAX_ITEMS), inner(length(max = constants::question::MAX_ANSWER_LENGTH)))]
    pub items: Vec<String>,
    /// The correct answer representation
    #[garde(dive)]
    pub answer: AnswerSpec,
    /// Optional hint revealed on request
    #[garde(inner(length(max = constants::question::MAX_HINT_LENGTH)))]
    pub hint: Option<String>,
    /// Time limit for this question in seconds
    #[garde(range(min = constants::question::MIN_TIME_LIMIT, max = constants::question::MAX_TIME_LIMIT))]
    pub time_limit: u64,
}

/// The client-facing form of a question
///
/// Identical to [`Question`] minus the correct answer and the hint text;
/// multiple-choice options are included because players need them to
/// answer, the correct index is not.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionView {
    /// Unique identifier, echoed back in answer submissions
    pub id: Uuid,
    /// Zero-based position within the game's question sequence
    pub ordinal: usize,
    /// The question text shown above the items
    pub text: String,
    /// The displayed items whose connection must be found
    pub items: Vec<String>,
    /// Multiple-choice options, absent for free-text questions
    pub options: Option<Vec<String>>,
    /// Whether a hint can be requested for this question
    pub has_hint: bool,
    /// Time limit for this question in seconds
    pub time_limit: u64,
}

impl Question {
    /// Returns the client-facing view of this question
    pub fn view(&self) -> QuestionView {
        QuestionView {
            id: self.id,
            ordinal: self.ordinal,
            text: self.text.clone(),
            items: self.items.clone(),
            options: match &self.answer {
                AnswerSpec::Choice { options, .. } => Some(options.clone()),
                AnswerSpec::FreeText { .. } => None,
            },
            has_hint: self.hint.is_some(),
            time_limit: self.time_limit,
        }
    }

    /// Returns the correct answer as display text
    pub fn correct_answer(&self) -> &str {
        match &self.answer {
            AnswerSpec::Choice { options, correct } => {
                options.get(*correct).map_or("", String::as_str)
            }
            AnswerSpec::FreeText { answer } => answer,
        }
    }

    /// Checks a submitted answer against the correct one
    ///
    /// Comparison is whitespace-trimmed and case-insensitive for both
    /// answer representations; multiple-choice submissions carry the
    /// selected option's text.
    pub fn check_answer(&self, submitted: &str) -> bool {
        let submitted = submitted.trim();
        let correct = self.correct_answer().trim();
        !correct.is_empty() && submitted.eq_ignore_ascii_case(correct)
    }

    /// Returns the validation context for this question's answer spec
    pub fn validation_context(&self) -> Context {
        Context {
            option_count: match &self.answer {
                AnswerSpec::Choice { options, .. } => options.len(),
                AnswerSpec::FreeText { .. } => 0,
            },
        }
    }
}

/// Test fixtures shared across the crate's test modules
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A well-formed multiple-choice question at the given ordinal
    pub(crate) fn choice_question(ordinal: usize) -> Question {
        Question {
            id: Uuid::new_v4(),
            ordinal,
            text: "What connects these?".to_owned(),
            items: vec![
                "Newton".to_owned(),
                "Steve Jobs".to_owned(),
                "Adam and Eve".to_owned(),
                "A forbidden fruit".to_owned(),
            ],
            answer: AnswerSpec::Choice {
                options: vec![
                    "Apple".to_owned(),
                    "Microsoft".to_owned(),
                    "Garden".to_owned(),
                    "Gravity".to_owned(),
                ],
                correct: 0,
            },
            hint: Some("A tech giant, a biblical story, physics, and fruit".to_owned()),
            time_limit: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::choice_question;
    use super::*;

    #[test]
    fn test_validation_accepts_well_formed_question() {
        let question = choice_question(0);
        let ctx = question.validation_context();
        assert!(question.validate_with(&ctx).is_ok());
    }

    #[test]
    fn test_validation_rejects_out_of_range_correct_index() {
        let mut question = choice_question(0);
        question.answer = AnswerSpec::Choice {
            options: vec!["A".to_owned(), "B".to_owned()],
            correct: 2,
        };
        let ctx = question.validation_context();
        assert!(question.validate_with(&ctx).is_err());
    }

    #[test]
    fn test_check_answer_case_insensitive() {
        let question = choice_question(0);
        assert!(question.check_answer("apple"));
        assert!(question.check_answer("  APPLE "));
        assert!(!question.check_answer("Gravity"));
        assert!(!question.check_answer(""));
    }

    #[test]
    fn test_free_text_check_answer() {
        let question = Question {
            answer: AnswerSpec::FreeText {
                answer: "Shades of Blue".to_owned(),
            },
            hint: None,
            ..choice_question(0)
        };
        assert!(question.check_answer("shades of blue"));
        assert!(!question.check_answer("blue"));
    }

    #[test]
    fn test_view_hides_correct_answer() {
        let question = choice_question(0);
        let view = question.view();
        assert_eq!(view.options.as_deref().map(<[String]>::len), Some(4));
        assert!(view.has_hint);

        let serialized = serde_json::to_string(&view).unwrap();
        // Options are visible but nothing marks which one is correct,
        // and the hint text itself is absent.
        assert!(!serialized.contains("correct"));
        assert!(!serialized.contains("biblical"));
    }

    #[test]
    fn test_free_text_view_has_no_options() {
        let question = Question {
            answer: AnswerSpec::FreeText {
                answer: "Rivers".to_owned(),
            },
            ..choice_question(3)
        };
        let view = question.view();
        assert_eq!(view.options, None);
        assert_eq!(view.ordinal, 3);
    }
}
