//! Game session control
//!
//! The session controller owns one room's game: the active question,
//! the authoritative round deadline, answer acceptance, scoring, and
//! broadcasts. All mutation happens through its entry points
//! (`receive_message`, `receive_alarm`, the connection lifecycle
//! methods), which the embedder calls strictly sequentially per room.
//!
//! Rounds lock on whichever comes first: every live player has an
//! accepted submission, or the scheduled deadline alarm fires. Both
//! paths funnel through one guarded transition, so the losing trigger
//! observes the round already locked and does nothing. A fired alarm
//! for a past question is neutralised the same way, by question index;
//! there is no cancellation API.

use std::collections::HashSet;

use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use web_time::Duration;

use crate::{
    leaderboard::{AnswerSubmission, ScoringConfig, rank},
    protocol::{ClientMessage, RoundDelta, ServerMessage, StateConflict},
    provider::{ProviderError, QuestionProvider, QuestionRequest},
    question::Question,
    registry::{Id, Registry},
    room::{Departure, Room, RoomSnapshot, RoomStatus},
    session::Tunnel,
    store::ResultStore,
};

/// Scheduled wake-ups delivered back through [`GameSession::receive_alarm`]
///
/// The embedder owns the timer wheel; the engine only hands out
/// `(message, delay)` pairs and guards against stale deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// The authoritative deadline of one round
    RoundDeadline {
        /// Zero-based index of the question the deadline belongs to
        question_index: usize,
    },
}

/// Why a round stopped accepting submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockCause {
    /// Every live player had an accepted submission
    AllAnswered,
    /// The deadline alarm fired first
    DeadlineExpired,
}

impl LockCause {
    /// The conflict reported for submissions arriving after this lock
    fn rejection(self) -> StateConflict {
        match self {
            Self::AllAnswered => StateConflict::AnswerAlreadySubmitted,
            Self::DeadlineExpired => StateConflict::TimeLimitExceeded,
        }
    }
}

/// Lifecycle of a single round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundPhase {
    /// Question selected but not yet issued to clients
    Pending,
    /// Question issued; submissions accepted
    Active,
    /// Submissions closed; lock notice not yet broadcast
    Locked(LockCause),
    /// Lock notice broadcast; waiting on the host to advance
    Revealed(LockCause),
}

/// The running game of one room
#[derive(Debug)]
struct ActiveGame {
    questions: Vec<Question>,
    current: usize,
    phase: RoundPhase,
    submissions: Vec<AnswerSubmission>,
    hinted: HashSet<(usize, Id)>,
}

impl ActiveGame {
    fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    fn has_submitted(&self, player: Id) -> bool {
        self.submissions
            .iter()
            .any(|submission| submission.player == player && submission.question_index == self.current)
    }
}

/// One room's authoritative session state
///
/// Owns the room and its game; reached only through the per-room
/// serialized processing, except for the connection registry which
/// carries its own lock.
#[derive(Debug)]
pub struct GameSession {
    room: Room,
    request: QuestionRequest,
    scoring: ScoringConfig,
    game: Option<ActiveGame>,
}

impl GameSession {
    /// Creates a session around a waiting room
    ///
    /// `request` is handed to the content provider verbatim when the
    /// host starts the game.
    pub fn new(room: Room, request: QuestionRequest, scoring: ScoringConfig) -> Self {
        Self {
            room,
            request,
            scoring,
            game: None,
        }
    }

    /// The owned room
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// A player's running score, zero outside a game
    pub fn score_of(&self, player: Id) -> i64 {
        self.game.as_ref().map_or(0, |game| {
            game.submissions
                .iter()
                .filter(|submission| submission.player == player)
                .map(|submission| submission.points)
                .sum()
        })
    }

    /// The authoritative room snapshot with running scores
    pub fn snapshot(&self) -> RoomSnapshot {
        self.room.snapshot(|player| self.score_of(player))
    }

    /// Sends the full resync payload to one player
    ///
    /// The room snapshot always; the current question too when a round
    /// is underway. Clients replace their local state wholesale.
    pub fn sync<T: Tunnel>(&self, player: Id, registry: &Registry<T>) {
        registry.send_to(
            player,
            &ServerMessage::RoomStateUpdate {
                state: self.snapshot(),
            },
        );
        if let Some(game) = &self.game {
            if game.phase != RoundPhase::Pending && self.room.status() == RoomStatus::InProgress {
                if let Some(question) = game.current_question() {
                    registry.send_to(
                        player,
                        &ServerMessage::NextQuestion {
                            question: question.view(),
                            question_number: game.current + 1,
                            total_questions: game.questions.len(),
                        },
                    );
                }
            }
        }
    }

    /// Admits a new member and announces the join
    ///
    /// # Errors
    ///
    /// Propagates the room's join rules: full, already started,
    /// duplicate member, bad or taken name.
    pub fn player_joined<T: Tunnel>(
        &mut self,
        player: Id,
        name: &str,
        tunnel: T,
        registry: &Registry<T>,
    ) -> Result<(), StateConflict> {
        let name = self.room.join(player, name)?;
        registry.admit(player, tunnel);
        log::debug!("player {player} joined room {}", self.room.code());
        let message = ServerMessage::PlayerJoined {
            player_id: player,
            player_name: name,
            room_state: self.snapshot(),
        };
        self.broadcast_room(registry, &message);
        Ok(())
    }

    /// Re-admits a returning member and resynchronizes them
    ///
    /// The previous tunnel, if any, is replaced; the player's
    /// submissions and score were never dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StateConflict::NotMember`] for unknown players.
    pub fn player_connected<T: Tunnel>(
        &mut self,
        player: Id,
        tunnel: T,
        registry: &Registry<T>,
    ) -> Result<(), StateConflict> {
        if !self.room.is_member(player) {
            return Err(StateConflict::NotMember);
        }
        registry.admit(player, tunnel);
        self.room.set_connected(player, true);
        self.sync(player, registry);
        let update = ServerMessage::RoomStateUpdate {
            state: self.snapshot(),
        };
        self.broadcast_room(registry, &update);
        Ok(())
    }

    /// Handles a dropped or closed connection
    ///
    /// Before a game the membership is removed and the host role moves
    /// if needed; mid-game the player is only marked disconnected. A
    /// departure that leaves every remaining live player with an
    /// accepted submission locks the round.
    pub fn player_disconnected<T: Tunnel>(&mut self, player: Id, registry: &Registry<T>) {
        registry.evict(player);
        let Some(name) = self.room.member_name(player).map(str::to_owned) else {
            return;
        };
        match self.room.leave(player) {
            Ok(Departure::Left) => {
                let message = ServerMessage::PlayerLeft {
                    player_id: player,
                    player_name: name,
                    room_state: self.snapshot(),
                };
                self.broadcast_room(registry, &message);
                if self.room.status() == RoomStatus::Abandoned {
                    log::debug!("room {} abandoned", self.room.code());
                    registry.close_all();
                }
            }
            Ok(Departure::Disconnected) => {
                let message = ServerMessage::PlayerDisconnected {
                    player_id: player,
                    room_state: self.snapshot(),
                };
                self.broadcast_room(registry, &message);
                self.check_all_answered(registry);
            }
            Err(_) => {}
        }
    }

    /// Processes one decoded client event
    ///
    /// State conflicts are reported to the sender only; nothing is
    /// broadcast and no state changes on a rejected request.
    pub fn receive_message<T, P, R, S>(
        &mut self,
        sender: Id,
        message: ClientMessage,
        registry: &Registry<T>,
        provider: &P,
        store: &mut R,
        mut schedule_message: S,
    ) where
        T: Tunnel,
        P: QuestionProvider,
        R: ResultStore,
        S: FnMut(AlarmMessage, Duration),
    {
        let result = match message {
            ClientMessage::SubmitAnswer {
                question_id,
                answer,
                time_taken,
                used_hint,
            } => self.submit_answer(sender, question_id, &answer, time_taken, used_hint, registry),
            ClientMessage::StartGame => {
                self.start_game(sender, registry, provider, &mut schedule_message)
            }
            ClientMessage::NextQuestion => {
                self.advance_round(sender, registry, store, &mut schedule_message)
            }
            ClientMessage::RequestHint { question_id } => {
                self.request_hint(sender, question_id, registry)
            }
            ClientMessage::Ping => {
                registry.touch(sender);
                registry.send_to(sender, &ServerMessage::Pong);
                Ok(())
            }
        };
        if let Err(conflict) = result {
            registry.send_to(sender, &conflict.to_message());
        }
    }

    /// Processes a fired alarm
    ///
    /// A deadline for a past question, or for a round that already
    /// locked by full submission, is stale and does nothing.
    pub fn receive_alarm<T: Tunnel>(&mut self, message: AlarmMessage, registry: &Registry<T>) {
        match message {
            AlarmMessage::RoundDeadline { question_index } => {
                if self.room.status() != RoomStatus::InProgress {
                    return;
                }
                if self
                    .game
                    .as_ref()
                    .is_none_or(|game| game.current != question_index)
                {
                    return;
                }
                self.lock_round(LockCause::DeadlineExpired, registry);
            }
        }
    }

    fn start_game<T, P, S>(
        &mut self,
        sender: Id,
        registry: &Registry<T>,
        provider: &P,
        schedule_message: &mut S,
    ) -> Result<(), StateConflict>
    where
        T: Tunnel,
        P: QuestionProvider,
        S: FnMut(AlarmMessage, Duration),
    {
        if !self.room.is_member(sender) {
            return Err(StateConflict::NotMember);
        }
        if !self.room.is_host(sender) {
            return Err(StateConflict::NotHost);
        }
        if self.room.status() != RoomStatus::Waiting {
            return Err(StateConflict::GameAlreadyStarted);
        }
        if !self.room.can_start() {
            return Err(StateConflict::InsufficientPlayers);
        }
        self.room.change_state(RoomStatus::Waiting, RoomStatus::Starting);
        let outcome = provider.questions(&self.request).and_then(|questions| {
            if questions.is_empty() {
                return Err(ProviderError::Empty);
            }
            // Provider content is external input; a question that fails
            // its own schema never reaches a round.
            for question in &questions {
                question
                    .validate_with(&question.validation_context())
                    .map_err(|report| ProviderError::Invalid(report.to_string()))?;
            }
            Ok(questions)
        });
        let questions = match outcome {
            Ok(questions) => questions,
            Err(error) => {
                // The room falls back to waiting; no round was consumed.
                self.room.change_state(RoomStatus::Starting, RoomStatus::Waiting);
                log::warn!("question provider failed for room {}: {error}", self.room.code());
                registry.send_to(
                    sender,
                    &ServerMessage::Error {
                        code: "upstream_failure".to_owned(),
                        message: error.to_string(),
                    },
                );
                return Ok(());
            }
        };
        self.room.change_state(RoomStatus::Starting, RoomStatus::InProgress);
        self.game = Some(ActiveGame {
            questions,
            current: 0,
            phase: RoundPhase::Pending,
            submissions: Vec::new(),
            hinted: HashSet::new(),
        });
        log::debug!("game started in room {}", self.room.code());
        self.begin_round(registry, schedule_message, true);
        Ok(())
    }

    fn submit_answer<T: Tunnel>(
        &mut self,
        sender: Id,
        question_id: Uuid,
        answer: &str,
        time_taken: u64,
        used_hint: bool,
        registry: &Registry<T>,
    ) -> Result<(), StateConflict> {
        if !self.room.is_member(sender) {
            return Err(StateConflict::NotMember);
        }
        if self.room.status() != RoomStatus::InProgress {
            return Err(StateConflict::GameNotActive);
        }
        let Some(game) = &mut self.game else {
            return Err(StateConflict::GameNotActive);
        };
        match game.phase {
            RoundPhase::Pending => return Err(StateConflict::UnknownQuestion),
            RoundPhase::Locked(cause) | RoundPhase::Revealed(cause) => {
                let current = game.current_question().map(|question| question.id);
                if current == Some(question_id) {
                    return Err(cause.rejection());
                }
                return Err(StateConflict::UnknownQuestion);
            }
            RoundPhase::Active => {}
        }
        let Some(question) = game.current_question() else {
            return Err(StateConflict::GameNotActive);
        };
        if question.id != question_id {
            return Err(StateConflict::UnknownQuestion);
        }
        if game.has_submitted(sender) {
            return Err(StateConflict::AnswerAlreadySubmitted);
        }

        let correct = question.check_answer(answer);
        let correct_answer = question.correct_answer().to_owned();
        let time_limit = question.time_limit;
        let used_hint = used_hint || game.hinted.contains(&(game.current, sender));
        let points = self.scoring.points_for(correct, used_hint);
        let question_index = game.current;
        game.submissions.push(AnswerSubmission {
            player: sender,
            question_index,
            question_id,
            answer: answer.to_owned(),
            correct,
            time_taken: time_taken.min(time_limit),
            used_hint,
            points,
        });

        let player_name = self
            .room
            .member_name(sender)
            .unwrap_or_default()
            .to_owned();
        let message = ServerMessage::AnswerSubmitted {
            player_id: sender,
            player_name,
            question_id,
            is_correct: correct,
            correct_answer: if correct { None } else { Some(correct_answer) },
            points_earned: points,
            total_score: self.score_of(sender),
        };
        self.broadcast_room(registry, &message);
        self.check_all_answered(registry);
        Ok(())
    }

    fn request_hint<T: Tunnel>(
        &mut self,
        sender: Id,
        question_id: Uuid,
        registry: &Registry<T>,
    ) -> Result<(), StateConflict> {
        if !self.room.is_member(sender) {
            return Err(StateConflict::NotMember);
        }
        if self.room.status() != RoomStatus::InProgress {
            return Err(StateConflict::GameNotActive);
        }
        let Some(game) = &mut self.game else {
            return Err(StateConflict::GameNotActive);
        };
        if game.phase != RoundPhase::Active {
            // Hints outside an active round are no-ops, not conflicts.
            return Ok(());
        }
        let Some(question) = game.current_question() else {
            return Err(StateConflict::GameNotActive);
        };
        if question.id != question_id {
            return Err(StateConflict::UnknownQuestion);
        }
        let key = (game.current, sender);
        if game.hinted.contains(&key) {
            return Ok(());
        }
        let Some(hint) = question.hint.clone() else {
            return Err(StateConflict::HintUnavailable);
        };
        game.hinted.insert(key);
        registry.send_to(sender, &ServerMessage::Hint { question_id, hint });
        Ok(())
    }

    fn advance_round<T, R, S>(
        &mut self,
        sender: Id,
        registry: &Registry<T>,
        store: &mut R,
        schedule_message: &mut S,
    ) -> Result<(), StateConflict>
    where
        T: Tunnel,
        R: ResultStore,
        S: FnMut(AlarmMessage, Duration),
    {
        if !self.room.is_member(sender) {
            return Err(StateConflict::NotMember);
        }
        if !self.room.is_host(sender) {
            return Err(StateConflict::NotHost);
        }
        if self.room.status() != RoomStatus::InProgress {
            return Err(StateConflict::GameNotActive);
        }
        let Some(game) = &mut self.game else {
            return Err(StateConflict::GameNotActive);
        };
        match game.phase {
            RoundPhase::Pending | RoundPhase::Active => {
                return Err(StateConflict::QuestionStillActive);
            }
            RoundPhase::Locked(_) | RoundPhase::Revealed(_) => {}
        }
        let next = game.current + 1;
        if next < game.questions.len() {
            game.current = next;
            game.phase = RoundPhase::Pending;
            self.begin_round(registry, schedule_message, false);
        } else {
            self.complete(registry, store);
        }
        Ok(())
    }

    fn begin_round<T, S>(&mut self, registry: &Registry<T>, schedule_message: &mut S, first: bool)
    where
        T: Tunnel,
        S: FnMut(AlarmMessage, Duration),
    {
        let Some(game) = &mut self.game else {
            return;
        };
        let Some(question) = game.current_question() else {
            return;
        };
        let view = question.view();
        let time_limit = question.time_limit;
        let question_number = game.current + 1;
        let total_questions = game.questions.len();
        let question_index = game.current;
        game.phase = RoundPhase::Active;

        let message = if first {
            ServerMessage::GameStarted {
                question: view,
                question_number,
                total_questions,
            }
        } else {
            ServerMessage::NextQuestion {
                question: view,
                question_number,
                total_questions,
            }
        };
        self.broadcast_room(registry, &message);
        schedule_message(
            AlarmMessage::RoundDeadline { question_index },
            Duration::from_secs(time_limit),
        );
    }

    fn complete<T: Tunnel, R: ResultStore>(&mut self, registry: &Registry<T>, store: &mut R) {
        self.room.change_state(RoomStatus::InProgress, RoomStatus::Completed);
        let Some(game) = &self.game else {
            return;
        };
        let results = rank(&self.room.players_in_join_order(), &game.submissions);
        if let Err(error) = store.record_results(self.room.code(), &results) {
            // Losing a historical record must not break the live room.
            log::warn!("failed to persist results for room {}: {error}", self.room.code());
        }
        log::debug!("game complete in room {}", self.room.code());
        self.broadcast_room(registry, &ServerMessage::GameComplete { results });
    }

    /// Locks the current round if it is still accepting submissions
    ///
    /// Both lock causes funnel through here; the phase guard makes the
    /// losing trigger a no-op, so the lock notice is broadcast at most
    /// once per round.
    fn lock_round<T: Tunnel>(&mut self, cause: LockCause, registry: &Registry<T>) {
        let Some(game) = &mut self.game else {
            return;
        };
        if game.phase != RoundPhase::Active {
            return;
        }
        game.phase = RoundPhase::Locked(cause);
        let correct_answer = game
            .current_question()
            .map(|question| question.correct_answer().to_owned())
            .unwrap_or_default();
        let round = game.current;
        let round_points: Vec<(Id, i64)> = game
            .submissions
            .iter()
            .filter(|submission| submission.question_index == round)
            .map(|submission| (submission.player, submission.points))
            .collect();
        // Every member gets a delta row; non-submitters show zero.
        let deltas = self
            .room
            .players_in_join_order()
            .into_iter()
            .map(|(player, _)| RoundDelta {
                player_id: player,
                points_earned: round_points
                    .iter()
                    .find(|(submitter, _)| *submitter == player)
                    .map_or(0, |(_, points)| *points),
                total_score: self.score_of(player),
            })
            .collect();
        let notice = match cause {
            LockCause::AllAnswered => ServerMessage::AllPlayersAnswered {
                correct_answer,
                deltas,
            },
            LockCause::DeadlineExpired => ServerMessage::QuestionTimeEnded {
                correct_answer,
                deltas,
            },
        };
        self.broadcast_room(registry, &notice);
        if let Some(game) = &mut self.game {
            game.phase = RoundPhase::Revealed(cause);
        }
    }

    fn check_all_answered<T: Tunnel>(&mut self, registry: &Registry<T>) {
        let all_answered = match &self.game {
            Some(game) if game.phase == RoundPhase::Active => {
                let live = self.room.live_players();
                !live.is_empty() && live.iter().all(|player| game.has_submitted(*player))
            }
            _ => false,
        };
        if all_answered {
            self.lock_round(LockCause::AllAnswered, registry);
        }
    }

    /// Broadcasts to the room, demoting dead connections and announcing
    /// each demotion to the survivors
    ///
    /// The registry evicts a dead tunnel on first failed delivery, so a
    /// player appears in at most one dead list and gets one notice.
    fn broadcast_room<T: Tunnel>(&mut self, registry: &Registry<T>, message: &ServerMessage) {
        let mut dead = registry.broadcast(message);
        while let Some(player) = dead.pop() {
            self.room.set_connected(player, false);
            let notice = ServerMessage::PlayerDisconnected {
                player_id: player,
                room_state: self.snapshot(),
            };
            dead.extend(registry.broadcast(&notice));
        }
    }
}
