//! Lobby discovery for NetPlay.
//!
//! The public directory lists every advertised session. This crate:
//!
//! 1. **Fetches** the listing over HTTP ([`LobbyClient`]) and keeps only
//!    sessions speaking our protocol tag.
//! 2. **Normalizes** joinable sessions into [`LobbyServer`]s, resolving a
//!    readable game title ([`GameTitleCache`], then a built-in table, then
//!    `"Game (<id>)"`).
//! 3. **Filters** raw sessions by region, password, and in-game state
//!    ([`FilterSet`], [`apply_filters`]).
//! 4. **Browses**: an actor that re-fetches on a timer and publishes the
//!    filtered list to watchers ([`spawn_browser`], [`BrowserHandle`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← discover_servers(), connect_to_lobby_server()
//!     ↕
//! Lobby Layer (this crate)  ← HTTP + filtering, never touches session state
//!     ↕
//! Protocol Layer (below)  ← LobbyListing / LobbySession / LobbyServer, JsonCodec
//! ```
//!
//! [`LobbyServer`]: mpn_netplay_protocol::LobbyServer

mod browser;
mod client;
mod config;
mod error;
mod filter;
mod titles;

pub use browser::{spawn_browser, BrowserConfig, BrowserHandle, BrowserUpdate};
pub use client::{parse_listing, to_lobby_server, LobbyClient};
pub use config::LobbyConfig;
pub use error::{DiscoveryError, LobbyError};
pub use filter::{apply_filters, FilterSet, Visibility};
pub use titles::{resolve_game_name, GameTitleCache, StaticTitles};
