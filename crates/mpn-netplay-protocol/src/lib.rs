//! Shared data model for the NetPlay session coordinator.
//!
//! This crate defines the vocabulary every other layer speaks:
//!
//! - **Types** ([`Player`], [`ChatMessage`], [`ConnectionStatus`],
//!   [`SessionEvent`], etc.): what the coordinator tracks and publishes.
//! - **Lobby wire format** ([`LobbyListing`], [`LobbySession`]): the JSON
//!   envelope returned by the public session directory.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how wire types are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! ```text
//! Lobby (HTTP directory) ─┐
//!                         ├─→ Protocol (this crate) ←── Session store
//! Native boundary ────────┘                         ←── Coordinator
//! ```
//!
//! Nothing here performs I/O. It only describes data.

mod codec;
mod error;
mod lobby;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use lobby::{LobbyListing, LobbyServer, LobbySession, LISTING_STATUS_OK};
pub use types::{
    ChatMessage, ConnectionStatus, EventTopic, Player, PlayerId, Role,
    RoomVisibility, RosterSnapshot, SessionEvent,
};
