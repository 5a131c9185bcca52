//! Scoring rules and leaderboard computation
//!
//! Scoring is data, not behavior: a [`ScoringConfig`] maps the four
//! (correct, used hint) combinations to point deltas, so rule changes
//! are configuration changes. Ranking is a pure function of the
//! accepted submissions and the room's join order, which makes the
//! final standings recomputable and byte-for-byte reproducible.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{constants, registry::Id};

/// Point deltas for the four submission outcomes
///
/// Applied at acceptance time; a submission's delta never changes after
/// the fact, even if the configuration does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Delta for a correct answer without a hint
    pub correct: i64,
    /// Delta for a correct answer after requesting a hint
    pub correct_with_hint: i64,
    /// Delta for a wrong answer without a hint
    pub incorrect: i64,
    /// Delta for a wrong answer after requesting a hint
    pub incorrect_with_hint: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            correct: constants::scoring::CORRECT,
            correct_with_hint: constants::scoring::CORRECT_WITH_HINT,
            incorrect: constants::scoring::INCORRECT,
            incorrect_with_hint: constants::scoring::INCORRECT_WITH_HINT,
        }
    }
}

impl ScoringConfig {
    /// The smaller-magnitude preset used by the original paper rules
    pub fn product_rules() -> Self {
        Self {
            correct: constants::scoring_product_rules::CORRECT,
            correct_with_hint: constants::scoring_product_rules::CORRECT_WITH_HINT,
            incorrect: constants::scoring_product_rules::INCORRECT,
            incorrect_with_hint: constants::scoring_product_rules::INCORRECT_WITH_HINT,
        }
    }

    /// The point delta for one submission outcome
    pub fn points_for(&self, correct: bool, used_hint: bool) -> i64 {
        match (correct, used_hint) {
            (true, false) => self.correct,
            (true, true) => self.correct_with_hint,
            (false, false) => self.incorrect,
            (false, true) => self.incorrect_with_hint,
        }
    }
}

/// One accepted answer submission
///
/// Immutable once recorded; the exactly-once guarantee means at most
/// one of these exists per (player, question) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    /// The submitting player
    pub player: Id,
    /// Zero-based index of the question within the game
    pub question_index: usize,
    /// Identifier of the answered question
    pub question_id: Uuid,
    /// The submitted answer text, as received
    pub answer: String,
    /// Whether the submission matched the correct answer
    pub correct: bool,
    /// Client-reported elapsed seconds, clamped to the question's limit
    pub time_taken: u64,
    /// Whether the player had a hint for this question
    pub used_hint: bool,
    /// The point delta applied at acceptance
    pub points: i64,
}

/// One row of the final leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// The ranked player
    pub player_id: Id,
    /// The player's display name
    pub player_name: String,
    /// Sum of the player's point deltas
    pub total_score: i64,
    /// Number of correct submissions
    pub correct_answers: usize,
    /// Number of wrong submissions
    pub wrong_answers: usize,
    /// Percentage of answered questions that were correct, rounded to
    /// two decimal places; zero when nothing was answered
    pub accuracy: f64,
}

/// Ranks players by their accepted submissions
///
/// `players` must be the room's members in join order with their
/// display names; every member gets a row even with zero submissions.
/// Ties on total score are broken by join order, earliest first, so
/// recomputing from the same inputs always yields the same ranking.
pub fn rank(players: &[(Id, String)], submissions: &[AnswerSubmission]) -> Vec<LeaderboardEntry> {
    players
        .iter()
        .map(|(player, name)| {
            let (mut score, mut correct, mut wrong) = (0_i64, 0_usize, 0_usize);
            for submission in submissions.iter().filter(|s| s.player == *player) {
                score += submission.points;
                if submission.correct {
                    correct += 1;
                } else {
                    wrong += 1;
                }
            }
            LeaderboardEntry {
                player_id: *player,
                player_name: name.clone(),
                total_score: score,
                correct_answers: correct,
                wrong_answers: wrong,
                accuracy: accuracy(correct, correct + wrong),
            }
        })
        // Stable sort preserves join order among equal scores.
        .sorted_by_key(|entry| std::cmp::Reverse(entry.total_score))
        .collect_vec()
}

/// Percentage of correct answers, rounded to two decimal places
fn accuracy(correct: usize, answered: usize) -> f64 {
    if answered == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = correct as f64 / answered as f64;
    (ratio * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(player: Id, index: usize, correct: bool, points: i64) -> AnswerSubmission {
        AnswerSubmission {
            player,
            question_index: index,
            question_id: Uuid::new_v4(),
            answer: "Apple".to_owned(),
            correct,
            time_taken: 5,
            used_hint: false,
            points,
        }
    }

    #[test]
    fn test_default_scoring_matches_standard_rules() {
        let config = ScoringConfig::default();
        assert_eq!(config.points_for(true, false), 100);
        assert_eq!(config.points_for(true, true), 50);
        assert_eq!(config.points_for(false, false), 0);
        assert_eq!(config.points_for(false, true), -10);
    }

    #[test]
    fn test_product_rules_preset() {
        let config = ScoringConfig::product_rules();
        assert_eq!(config.points_for(true, false), 10);
        assert_eq!(config.points_for(false, true), -5);
    }

    #[test]
    fn test_hint_never_improves_an_outcome() {
        for config in [ScoringConfig::default(), ScoringConfig::product_rules()] {
            assert!(config.points_for(true, false) > config.points_for(true, true));
            assert!(config.points_for(false, true) <= config.points_for(false, false));
        }
    }

    #[test]
    fn test_rank_orders_by_score_descending() {
        let (a, b) = (Id::new(), Id::new());
        let players = vec![(a, "Alice".to_owned()), (b, "Bob".to_owned())];
        let submissions = vec![
            submission(a, 0, false, 0),
            submission(b, 0, true, 100),
        ];

        let board = rank(&players, &submissions);

        assert_eq!(board[0].player_id, b);
        assert_eq!(board[0].total_score, 100);
        assert_eq!(board[1].player_id, a);
    }

    #[test]
    fn test_rank_ties_break_by_join_order() {
        let (first, second, third) = (Id::new(), Id::new(), Id::new());
        let players = vec![
            (first, "First".to_owned()),
            (second, "Second".to_owned()),
            (third, "Third".to_owned()),
        ];
        let submissions = vec![
            submission(first, 0, true, 100),
            submission(second, 0, true, 100),
            submission(third, 0, true, 100),
        ];

        let board = rank(&players, &submissions);

        let order: Vec<Id> = board.iter().map(|entry| entry.player_id).collect();
        assert_eq!(order, vec![first, second, third]);
    }

    #[test]
    fn test_rank_includes_players_without_submissions() {
        let (active, idle) = (Id::new(), Id::new());
        let players = vec![(active, "Active".to_owned()), (idle, "Idle".to_owned())];
        let submissions = vec![submission(active, 0, true, 100)];

        let board = rank(&players, &submissions);

        assert_eq!(board.len(), 2);
        assert_eq!(board[1].player_id, idle);
        assert_eq!(board[1].total_score, 0);
        assert_eq!(board[1].correct_answers, 0);
        assert_eq!(board[1].accuracy, 0.0);
    }

    #[test]
    fn test_accuracy_rounds_to_two_decimals() {
        let player = Id::new();
        let players = vec![(player, "Alice".to_owned())];
        let submissions = vec![
            submission(player, 0, true, 100),
            submission(player, 1, true, 100),
            submission(player, 2, false, 0),
        ];

        let board = rank(&players, &submissions);

        // 2/3 correct = 66.666… rounds to 66.67.
        assert_eq!(board[0].accuracy, 66.67);
    }

    #[test]
    fn test_negative_totals_rank_below_zero() {
        let (cautious, reckless) = (Id::new(), Id::new());
        let players = vec![
            (cautious, "Cautious".to_owned()),
            (reckless, "Reckless".to_owned()),
        ];
        let submissions = vec![
            submission(reckless, 0, false, -10),
            submission(reckless, 1, false, -10),
        ];

        let board = rank(&players, &submissions);

        assert_eq!(board[0].player_id, cautious);
        assert_eq!(board[1].total_score, -20);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let (a, b) = (Id::new(), Id::new());
        let players = vec![(a, "Alice".to_owned()), (b, "Bob".to_owned())];
        let submissions = vec![
            submission(a, 0, true, 100),
            submission(b, 0, true, 50),
            submission(a, 1, false, -10),
        ];

        let first = rank(&players, &submissions);
        let second = rank(&players, &submissions);

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
