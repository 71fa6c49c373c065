//! Core wire types for the Incognito protocol.
//!
//! Everything here travels on the wire as JSON: inbound [`ClientEvent`]s,
//! outbound [`ServerEvent`]s, and the [`RoomSnapshot`] broadcast after every
//! state-changing event. Event names are kebab-case and fields are camelCase
//! to match the browser client.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a live connection.
///
/// Connections are transient: a player who reloads the page comes back with
/// a new `ConnectionId` but the same display name. Connection ids are used
/// for message delivery and rejoin binding only — never as player identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The short code identifying a room, e.g. `"K7Q2ZD"`.
///
/// Opaque to the protocol layer; the registry generates and allocates codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a raw string as a room code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A server-assigned question identifier, unique and monotonic per room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct QuestionId(pub u64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Game phase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a room.
///
/// Transitions are strictly ordered — no skipping, no going back:
///
/// ```text
/// waiting → playing → finished
/// ```
///
/// - **Waiting**: players join and contribute names to the pool.
/// - **Playing**: names are assigned; questions and guesses flow.
/// - **Finished**: every player has guessed their assigned name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Waiting,
    Playing,
    Finished,
}

impl GamePhase {
    /// Returns `true` if the name pool is still open for contributions.
    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if the game is actively running.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Attempts to advance to the next phase.
    ///
    /// Returns `Some(next)` if a transition exists, `None` from `Finished`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Playing),
            Self::Playing => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Answers and questions
// ---------------------------------------------------------------------------

/// A yes/no answer to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
        }
    }
}

/// What a client supplies when asking a question.
///
/// The server stamps everything else: the id, the asker's connection, and
/// the timestamp. A client cannot forge another connection's identity here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    /// Display name of the asker, echoed back in the broadcast.
    pub asker_name: String,
    /// Free-form question text, opaque to the server.
    pub text: String,
}

/// A question as held by the room and broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Server-assigned, unique within the room.
    pub id: QuestionId,
    /// Connection that asked, stamped by the server.
    pub asker_id: ConnectionId,
    /// Display name of the asker.
    pub asker_name: String,
    /// Free-form question text.
    pub text: String,
    /// `None` until answered; settable exactly once (first answer wins).
    pub answer: Option<Answer>,
    /// Unix milliseconds at creation, stamped by the server.
    pub asked_at: u64,
}

// ---------------------------------------------------------------------------
// Room snapshots
// ---------------------------------------------------------------------------

/// One player's row in a room snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    /// Display name — the stable identity key within the room.
    pub name: String,
    /// Whether this player has correctly guessed their assigned name.
    pub has_guessed: bool,
    /// Whether an assignment exists, even when `assigned_name` is masked.
    pub has_assignment: bool,
    /// The assigned identity label. Masked (`None`) in the projection sent
    /// to this player's own connection — they have to guess it.
    pub assigned_name: Option<String>,
}

/// The complete serialized room state broadcast after a state-changing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub phase: GamePhase,
    /// Players in join order.
    pub players: Vec<PlayerSnapshot>,
    /// Candidate identity labels contributed so far.
    pub name_pool: Vec<String>,
}

impl RoomSnapshot {
    /// Returns the projection of this snapshot for one recipient.
    ///
    /// The viewer's own `assigned_name` is masked — in this game the one
    /// secret is the label a player must guess, and everyone else's label
    /// is public at the table. `has_assignment` still signals presence.
    pub fn for_viewer(&self, viewer: Option<&str>) -> Self {
        let mut snapshot = self.clone();
        if let Some(name) = viewer {
            for player in &mut snapshot.players {
                if player.name == name {
                    player.assigned_name = None;
                }
            }
        }
        snapshot
    }
}

// ---------------------------------------------------------------------------
// Client events (inbound)
// ---------------------------------------------------------------------------

/// Events a client sends to the server.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, so joining a
/// room looks like:
///   `{ "type": "join-room", "roomCode": "K7Q2ZD", "playerName": "alice" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Allocate a fresh room code and register an empty room.
    CreateRoom { player_name: String },

    /// Join (or rejoin) a room under a display name.
    JoinRoom {
        room_code: RoomCode,
        player_name: String,
    },

    /// Contribute a candidate name to the room's pool.
    AddName { room_code: RoomCode, name: String },

    /// Request the `waiting → playing` transition and name distribution.
    StartGame { room_code: RoomCode },

    /// Ask a free-text yes/no question.
    AskQuestion {
        room_code: RoomCode,
        question: QuestionDraft,
    },

    /// Answer a previously asked question. First answer wins.
    AnswerQuestion {
        room_code: RoomCode,
        question_id: QuestionId,
        answer: Answer,
    },

    /// Guess one's own assigned name. Addressed by stable player name,
    /// not connection id, so it stays correct across reconnects.
    MakeGuess {
        room_code: RoomCode,
        player_name: String,
        guess: String,
    },
}

impl ClientEvent {
    /// Returns the room code this event targets, if any.
    pub fn room_code(&self) -> Option<&RoomCode> {
        match self {
            Self::CreateRoom { .. } => None,
            Self::JoinRoom { room_code, .. }
            | Self::AddName { room_code, .. }
            | Self::StartGame { room_code }
            | Self::AskQuestion { room_code, .. }
            | Self::AnswerQuestion { room_code, .. }
            | Self::MakeGuess { room_code, .. } => Some(room_code),
        }
    }
}

// ---------------------------------------------------------------------------
// Server events (outbound)
// ---------------------------------------------------------------------------

/// Events the server sends to subscribed connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full room snapshot, broadcast to every subscriber.
    GameState { room: RoomSnapshot },

    /// A question was asked; carries the full server-stamped record.
    QuestionAsked { question: Question },

    /// A question received its (first and only) answer.
    QuestionAnswered {
        question_id: QuestionId,
        answer: Answer,
    },

    /// A player made a guess; `correct` says whether it matched.
    PlayerGuessed { player_name: String, correct: bool },

    /// A room was created for the requester.
    RoomCreated { room_code: RoomCode },

    /// The targeted room does not exist. Sent to the requester only.
    RoomNotFound,

    /// Something was rejected. Sent to the requester only.
    /// `code` follows HTTP-style conventions (400 malformed,
    /// 409 precondition not met).
    Error { code: u16, message: String },
}

// =========================================================================
// Tests
// =========================================================================
