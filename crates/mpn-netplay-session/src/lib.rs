//! Session state for the NetPlay coordinator.
//!
//! This crate holds the single source of truth for one client's NetPlay
//! session:
//!
//! 1. **Connection state**: status, role, and a generation counter that
//!    tells a stale callback from a current one ([`SessionStore`])
//! 2. **Roster**: who is in the session, in join order ([`Roster`])
//! 3. **Chat**: the last 100 messages, deduplicated ([`ChatLog`])
//! 4. **Host codes**: the short code a host shares with friends
//! 5. **Settings**: the user's NetPlay preferences ([`NetplaySettings`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← the only writer; applies native callbacks and poll reports
//!     ↕
//! Session Layer (this crate)  ← internally synchronized, hands out copies
//!     ↕
//! Protocol Layer (below)  ← Player, ChatMessage, ConnectionStatus
//! ```

mod chat;
mod error;
mod host_code;
mod roster;
mod settings;
mod store;

pub use chat::{chat_timestamp, ChatLog, CHAT_CAPACITY};
pub use error::SessionError;
pub use host_code::{generate_host_code, HOST_CODE_ALPHABET, HOST_CODE_LEN};
pub use roster::Roster;
pub use settings::{ConnectionType, NetplaySettings, DEFAULT_PORT};
pub use store::SessionStore;
