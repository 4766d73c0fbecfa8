//! Core data model: players, chat, connection state, and published events.
//!
//! These are the values the session store holds and the coordinator fans
//! out to subscribers. Every type is cheap to clone because read accessors
//! hand out copies, never live references.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Native-layer identifier for a player in the current session.
///
/// Newtype over the integer id the native core assigns, so a player id
/// can't be confused with a port or a count. Serializes as the bare number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One entry of the session roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    pub connected: bool,
}

impl Player {
    /// A connected player, as created from a join notification.
    pub fn new(id: PlayerId, nickname: impl Into<String>) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            connected: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A single chat line. Immutable once created.
///
/// Two messages are "the same message" when sender, text, and timestamp all
/// match; the chat log uses that equality to drop duplicate deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
    pub timestamp: String,
}

impl ChatMessage {
    pub fn new(
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp: timestamp.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionStatus / Role
// ---------------------------------------------------------------------------

/// Where the coordinator is in its connection lifecycle.
///
/// ```text
///   Disconnected ──connect/host──→ Connecting ──ok──→ Connected
///        ↑                            │                  │
///        └───────────fail─────────────┘      lost ───────┤
///        ↑                                               ▼
///        └──────────────disconnect───────────────────── Lost
/// ```
///
/// `Connecting` is transient: it always resolves to `Connected` or back to
/// `Disconnected`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Lost,
}

impl ConnectionStatus {
    /// Returns `true` for every state except `Disconnected`.
    pub fn is_engaged(self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Lost => write!(f, "Lost"),
        }
    }
}

/// Which side of the session this client is on.
///
/// Only meaningful while the status is not `Disconnected`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum Role {
    #[default]
    None,
    Host,
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Host => write!(f, "Host"),
            Self::Guest => write!(f, "Guest"),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomVisibility
// ---------------------------------------------------------------------------

/// How a hosted room is advertised. The native layer takes the ordinal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RoomVisibility {
    #[default]
    Public,
    Private,
    FriendsOnly,
}

impl RoomVisibility {
    /// Integer passed across the native boundary.
    pub fn ordinal(self) -> i32 {
        match self {
            Self::Public => 0,
            Self::Private => 1,
            Self::FriendsOnly => 2,
        }
    }

    /// Inverse of [`ordinal`](Self::ordinal).
    pub fn from_ordinal(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Public),
            1 => Some(Self::Private),
            2 => Some(Self::FriendsOnly),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RosterSnapshot
// ---------------------------------------------------------------------------

/// A copy of the roster at one point in time.
///
/// `revision` increases with every roster mutation, so a consumer that
/// receives snapshots out of order can keep only the newest one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub revision: u64,
    pub player_count: usize,
    pub players: Vec<Player>,
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Coarse grouping used by subscribers to pick which events they receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    Connection,
    Player,
    Chat,
}

/// Everything the coordinator publishes to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Connection status or role changed.
    StatusChanged {
        status: ConnectionStatus,
        role: Role,
    },
    /// A connect/host attempt failed, or the native layer reported a failure.
    ConnectionFailed { reason: String },
    /// The host started the game and this client confirmed it has it.
    GameStarted,
    /// The native core reported the session closed. Informational: the
    /// status only changes through `disconnect` or a lost connection.
    NativeDisconnected,
    /// A player joined the session.
    PlayerJoined(Player),
    /// A player left (or was removed from) the session.
    PlayerLeft(PlayerId),
    /// The roster changed. Always carries the post-change snapshot.
    RosterUpdated(RosterSnapshot),
    /// A chat line was stored (remote or local echo).
    Chat(ChatMessage),
}

impl SessionEvent {
    /// The topic subscribers filter on.
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::StatusChanged { .. }
            | Self::ConnectionFailed { .. }
            | Self::GameStarted
            | Self::NativeDisconnected => EventTopic::Connection,
            Self::PlayerJoined(_)
            | Self::PlayerLeft(_)
            | Self::RosterUpdated(_) => EventTopic::Player,
            Self::Chat(_) => EventTopic::Chat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_player_new_is_connected() {
        let p = Player::new(PlayerId(2), "Alice");
        assert_eq!(p.id, PlayerId(2));
        assert_eq!(p.nickname, "Alice");
        assert!(p.connected);
    }

    #[test]
    fn test_connection_status_default_is_disconnected() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
        assert!(!ConnectionStatus::Disconnected.is_engaged());
        assert!(ConnectionStatus::Connecting.is_engaged());
        assert!(ConnectionStatus::Lost.is_engaged());
    }

    #[test]
    fn test_room_visibility_ordinal_round_trips() {
        for v in [
            RoomVisibility::Public,
            RoomVisibility::Private,
            RoomVisibility::FriendsOnly,
        ] {
            assert_eq!(RoomVisibility::from_ordinal(v.ordinal()), Some(v));
        }
        assert_eq!(RoomVisibility::from_ordinal(9), None);
    }

    #[test]
    fn test_session_event_topics() {
        let chat = SessionEvent::Chat(ChatMessage::new("a", "b", "c"));
        assert_eq!(chat.topic(), EventTopic::Chat);
        assert_eq!(
            SessionEvent::PlayerLeft(PlayerId(1)).topic(),
            EventTopic::Player
        );
        assert_eq!(SessionEvent::GameStarted.topic(), EventTopic::Connection);
    }
}
