//! Room membership and lifecycle
//!
//! A room is the joinable lobby that one game runs inside. Members are
//! kept in join order because join order drives both host reassignment
//! and leaderboard tie-breaking. The room owns its lifecycle status;
//! transitions go through [`Room::change_state`] so a stale trigger
//! (a second start request, a late alarm) observes the guard failing
//! instead of corrupting state.

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::{
    constants,
    names,
    protocol::StateConflict,
    registry::Id,
    room_code::RoomCode,
};

/// Externally-supplied room settings, validated at the boundary
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoomConfig {
    /// Display name of the room
    #[garde(length(min = 1, max = constants::room::MAX_NAME_LENGTH))]
    pub name: String,
    /// Maximum number of members
    #[garde(range(min = constants::room::MIN_CAPACITY, max = constants::room::MAX_CAPACITY))]
    pub capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            capacity: constants::room::DEFAULT_CAPACITY,
        }
    }
}

/// Lifecycle status of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Accepting joins
    Waiting,
    /// Host triggered a start; waiting on the content provider
    Starting,
    /// A game is running
    InProgress,
    /// The game finished
    Completed,
    /// Everyone left before a game completed
    Abandoned,
}

/// One member of a room
#[derive(Debug, Clone)]
struct Member {
    id: Id,
    name: String,
    connected: bool,
}

/// What happened when a player left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Membership was removed; pre-game leave
    Left,
    /// Membership and score survive; mid-game connection loss
    Disconnected,
}

/// A room and its members
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    name: String,
    capacity: usize,
    members: Vec<Member>,
    host: Option<Id>,
    status: RoomStatus,
}

/// Client-facing snapshot of one member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// The member's id
    pub id: Id,
    /// The member's display name
    pub name: String,
    /// Running score in the current game, zero outside one
    pub score: i64,
    /// Whether the member currently has a live connection
    pub connected: bool,
    /// Whether the member is the host
    pub is_host: bool,
}

/// Authoritative full room snapshot
///
/// Embedded in membership-change broadcasts and used wholesale as the
/// resync payload; clients replace their local state with it rather
/// than patching.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// The room's join code
    pub code: RoomCode,
    /// The room's display name
    pub name: String,
    /// Current lifecycle status
    pub status: RoomStatus,
    /// Member capacity
    pub max_players: usize,
    /// Whether a start request would currently succeed
    pub can_start: bool,
    /// The current host, absent only when the room is empty
    pub host: Option<Id>,
    /// Members in join order
    pub players: Vec<PlayerSnapshot>,
}

impl Room {
    /// Creates a waiting room with a cleaned display name
    ///
    /// # Errors
    ///
    /// Returns a [`StateConflict::InvalidName`] when the configured
    /// name is empty, too long, or filtered.
    pub fn new(code: RoomCode, config: &RoomConfig) -> Result<Self, StateConflict> {
        let name = names::clean_room_name(&config.name)?;
        Ok(Self {
            code,
            name,
            capacity: config
                .capacity
                .clamp(constants::room::MIN_CAPACITY, constants::room::MAX_CAPACITY),
            members: Vec::new(),
            host: None,
            status: RoomStatus::Waiting,
        })
    }

    /// The room's join code
    pub fn code(&self) -> RoomCode {
        self.code
    }

    /// Current lifecycle status
    pub fn status(&self) -> RoomStatus {
        self.status
    }

    /// The current host, if the room is non-empty
    pub fn host(&self) -> Option<Id> {
        self.host
    }

    /// Whether the given player is the host
    pub fn is_host(&self, player: Id) -> bool {
        self.host == Some(player)
    }

    /// Whether the given player is a member
    pub fn is_member(&self, player: Id) -> bool {
        self.members.iter().any(|member| member.id == player)
    }

    /// A member's display name
    pub fn member_name(&self, player: Id) -> Option<&str> {
        self.members
            .iter()
            .find(|member| member.id == player)
            .map(|member| member.name.as_str())
    }

    /// Members in join order with their display names
    pub fn players_in_join_order(&self) -> Vec<(Id, String)> {
        self.members
            .iter()
            .map(|member| (member.id, member.name.clone()))
            .collect_vec()
    }

    /// Members currently marked connected, in join order
    pub fn live_players(&self) -> Vec<Id> {
        self.members
            .iter()
            .filter(|member| member.connected)
            .map(|member| member.id)
            .collect_vec()
    }

    /// Whether a start request would currently succeed
    pub fn can_start(&self) -> bool {
        self.status == RoomStatus::Waiting
            && self.live_players().len() >= constants::room::MIN_PLAYERS_TO_START
    }

    /// Transitions the status from `before` to `after`
    ///
    /// Returns whether the transition happened. A `false` return means
    /// the status was not `before`; the caller treats the trigger as
    /// stale and does nothing.
    pub fn change_state(&mut self, before: RoomStatus, after: RoomStatus) -> bool {
        if self.status == before {
            self.status = after;
            true
        } else {
            false
        }
    }

    /// Adds a player to the room and returns their canonical name
    ///
    /// The first joiner becomes the host.
    ///
    /// # Errors
    ///
    /// Rejects joins once the room stopped waiting, at capacity, for
    /// existing members, and for invalid or already-used names.
    pub fn join(&mut self, player: Id, name: &str) -> Result<String, StateConflict> {
        if self.status != RoomStatus::Waiting {
            return Err(StateConflict::GameAlreadyStarted);
        }
        if self.members.len() >= self.capacity {
            return Err(StateConflict::RoomFull);
        }
        if self.is_member(player) {
            return Err(StateConflict::AlreadyJoined);
        }
        let name = names::clean_player_name(name)?;
        if self
            .members
            .iter()
            .any(|member| member.name.eq_ignore_ascii_case(&name))
        {
            return Err(StateConflict::InvalidName(names::Error::Used));
        }
        self.members.push(Member {
            id: player,
            name: name.clone(),
            connected: true,
        });
        if self.host.is_none() {
            self.host = Some(player);
        }
        Ok(name)
    }

    /// Removes or disconnects a player depending on the room's status
    ///
    /// Before a game starts the membership is removed, the host role
    /// moves to the earliest-joined remaining member, and an emptied
    /// room is abandoned. Mid-game the player is only marked
    /// disconnected so their submissions and score survive.
    ///
    /// # Errors
    ///
    /// Returns [`StateConflict::NotMember`] for non-members.
    pub fn leave(&mut self, player: Id) -> Result<Departure, StateConflict> {
        if !self.is_member(player) {
            return Err(StateConflict::NotMember);
        }
        if self.status == RoomStatus::InProgress {
            self.set_connected(player, false);
            return Ok(Departure::Disconnected);
        }
        self.members.retain(|member| member.id != player);
        if self.host == Some(player) {
            self.host = self.members.first().map(|member| member.id);
        }
        if self.members.is_empty()
            && matches!(self.status, RoomStatus::Waiting | RoomStatus::Starting)
        {
            self.status = RoomStatus::Abandoned;
        }
        Ok(Departure::Left)
    }

    /// Updates a member's liveness flag
    pub fn set_connected(&mut self, player: Id, connected: bool) {
        if let Some(member) = self.members.iter_mut().find(|member| member.id == player) {
            member.connected = connected;
        }
    }

    /// Builds the authoritative snapshot, pulling scores from the caller
    ///
    /// `score_of` supplies each member's running score; outside a game
    /// the caller passes a constant zero.
    pub fn snapshot<F: Fn(Id) -> i64>(&self, score_of: F) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code,
            name: self.name.clone(),
            status: self.status,
            max_players: self.capacity,
            can_start: self.can_start(),
            host: self.host,
            players: self
                .members
                .iter()
                .map(|member| PlayerSnapshot {
                    id: member.id,
                    name: member.name.clone(),
                    score: score_of(member.id),
                    connected: member.connected,
                    is_host: self.host == Some(member.id),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A waiting room named "Trivia Night" with the default capacity
    pub(crate) fn waiting_room() -> Room {
        Room::new(
            RoomCode::new(),
            &RoomConfig {
                name: "Trivia Night".to_owned(),
                capacity: constants::room::DEFAULT_CAPACITY,
            },
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::waiting_room;
    use super::*;

    #[test]
    fn test_first_joiner_becomes_host() {
        let mut room = waiting_room();
        let (alice, bob) = (Id::new(), Id::new());

        room.join(alice, "Alice").unwrap();
        room.join(bob, "Bob").unwrap();

        assert!(room.is_host(alice));
        assert!(!room.is_host(bob));
    }

    #[test]
    fn test_join_at_capacity_rejected() {
        let mut room = Room::new(
            RoomCode::new(),
            &RoomConfig {
                name: "Tiny".to_owned(),
                capacity: constants::room::MIN_CAPACITY,
            },
        )
        .unwrap();
        room.join(Id::new(), "Alice").unwrap();
        room.join(Id::new(), "Bob").unwrap();

        assert_eq!(
            room.join(Id::new(), "Carol"),
            Err(StateConflict::RoomFull)
        );
    }

    #[test]
    fn test_join_after_start_rejected() {
        let mut room = waiting_room();
        room.join(Id::new(), "Alice").unwrap();
        assert!(room.change_state(RoomStatus::Waiting, RoomStatus::InProgress));

        assert_eq!(
            room.join(Id::new(), "Bob"),
            Err(StateConflict::GameAlreadyStarted)
        );
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let mut room = waiting_room();
        let alice = Id::new();
        room.join(alice, "Alice").unwrap();

        assert_eq!(room.join(alice, "Alice Again"), Err(StateConflict::AlreadyJoined));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut room = waiting_room();
        room.join(Id::new(), "Alice").unwrap();

        assert_eq!(
            room.join(Id::new(), "  alice "),
            Err(StateConflict::InvalidName(names::Error::Used))
        );
    }

    #[test]
    fn test_host_leave_reassigns_to_earliest_joined() {
        let mut room = waiting_room();
        let (alice, bob, carol) = (Id::new(), Id::new(), Id::new());
        room.join(alice, "Alice").unwrap();
        room.join(bob, "Bob").unwrap();
        room.join(carol, "Carol").unwrap();

        assert_eq!(room.leave(alice), Ok(Departure::Left));

        assert_eq!(room.host(), Some(bob));
        assert!(!room.is_member(alice));
    }

    #[test]
    fn test_emptied_waiting_room_is_abandoned() {
        let mut room = waiting_room();
        let alice = Id::new();
        room.join(alice, "Alice").unwrap();

        room.leave(alice).unwrap();

        assert_eq!(room.status(), RoomStatus::Abandoned);
        assert_eq!(room.host(), None);
    }

    #[test]
    fn test_leave_mid_game_only_disconnects() {
        let mut room = waiting_room();
        let (alice, bob) = (Id::new(), Id::new());
        room.join(alice, "Alice").unwrap();
        room.join(bob, "Bob").unwrap();
        room.change_state(RoomStatus::Waiting, RoomStatus::InProgress);

        assert_eq!(room.leave(bob), Ok(Departure::Disconnected));

        assert!(room.is_member(bob));
        assert_eq!(room.live_players(), vec![alice]);
    }

    #[test]
    fn test_leave_by_non_member_rejected() {
        let mut room = waiting_room();
        assert_eq!(room.leave(Id::new()), Err(StateConflict::NotMember));
    }

    #[test]
    fn test_can_start_requires_enough_live_players() {
        let mut room = waiting_room();
        let (alice, bob) = (Id::new(), Id::new());
        room.join(alice, "Alice").unwrap();
        assert!(!room.can_start());

        room.join(bob, "Bob").unwrap();
        assert!(room.can_start());

        room.set_connected(bob, false);
        assert!(!room.can_start());
    }

    #[test]
    fn test_change_state_rejects_stale_transition() {
        let mut room = waiting_room();
        assert!(room.change_state(RoomStatus::Waiting, RoomStatus::Starting));
        assert!(!room.change_state(RoomStatus::Waiting, RoomStatus::Starting));
        assert_eq!(room.status(), RoomStatus::Starting);
    }

    #[test]
    fn test_snapshot_reflects_membership_and_scores() {
        let mut room = waiting_room();
        let (alice, bob) = (Id::new(), Id::new());
        room.join(alice, "Alice").unwrap();
        room.join(bob, "Bob").unwrap();

        let snapshot = room.snapshot(|id| if id == alice { 150 } else { 0 });

        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.players[0].name, "Alice");
        assert_eq!(snapshot.players[0].score, 150);
        assert!(snapshot.players[0].is_host);
        assert!(snapshot.can_start);
        assert_eq!(snapshot.host, Some(alice));
    }

    #[test]
    fn test_config_validation_bounds_capacity() {
        let config = RoomConfig {
            name: "Too Big".to_owned(),
            capacity: constants::room::MAX_CAPACITY + 1,
        };
        assert!(config.validate().is_err());

        let config = RoomConfig {
            name: "Fine".to_owned(),
            capacity: constants::room::DEFAULT_CAPACITY,
        };
        assert!(config.validate().is_ok());
    }
}
