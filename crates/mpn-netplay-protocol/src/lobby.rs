//! Wire format of the public session directory.
//!
//! The directory answers `GET <url>?version=<tag>` with a JSON envelope:
//!
//! ```text
//! {
//!   "status": "OK",
//!   "sessions": [
//!     { "server_id": "203.0.113.7", "name": "Kart night", "port": 2626,
//!       "game": "RMCP01", "player_count": 2, "in_game": false,
//!       "version": "MPN", "region": "EU", "method": "direct",
//!       "password": false }
//!   ]
//! }
//! ```
//!
//! [`LobbySession`] is one raw entry, exactly as the directory lists it.
//! [`LobbyServer`] is the normalized, joinable form the lobby client hands
//! to callers after filtering and title resolution.

use serde::{Deserialize, Serialize};

/// Value of `status` on a successful directory response.
pub const LISTING_STATUS_OK: &str = "OK";

/// Players a lobby session displays as its capacity.
const DISPLAY_CAPACITY: u32 = 4;

// ---------------------------------------------------------------------------
// LobbyListing
// ---------------------------------------------------------------------------

/// The top-level directory response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyListing {
    pub status: String,
    #[serde(default)]
    pub sessions: Vec<LobbySession>,
}

impl LobbyListing {
    /// Returns `true` if the directory reported success.
    pub fn is_ok(&self) -> bool {
        self.status == LISTING_STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// LobbySession
// ---------------------------------------------------------------------------

/// One session as advertised by the directory.
///
/// Only the fields every directory entry carries are required. The rest
/// default, so an entry from an older directory without `region` or
/// `password` still parses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySession {
    /// Address of the host. The directory calls it `server_id`.
    pub server_id: String,
    pub name: String,
    pub port: u16,
    /// Game identifier, e.g. `RMCP01`.
    #[serde(rename = "game")]
    pub game_id: String,
    pub player_count: u32,
    pub in_game: bool,
    /// Protocol/version tag the host is running.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub region: String,
    /// `direct` or `traversal`.
    #[serde(default)]
    pub method: String,
    #[serde(rename = "password", default)]
    pub has_password: bool,
}

impl LobbySession {
    /// `"<name> (<players>/4)"`.
    pub fn display_name(&self) -> String {
        format!("{} ({}/{})", self.name, self.player_count, DISPLAY_CAPACITY)
    }

    /// Full region name for the well-known codes, else the code itself.
    pub fn region_display_name(&self) -> &str {
        match self.region.as_str() {
            "US" => "United States",
            "EU" => "Europe",
            "JP" => "Japan",
            "AU" => "Australia",
            "KR" => "Korea",
            other => other,
        }
    }

    /// Human-readable connection method.
    pub fn method_display_name(&self) -> &str {
        match self.method.as_str() {
            "direct" => "Direct Connection",
            "traversal" => "Traversal Server",
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// LobbyServer
// ---------------------------------------------------------------------------

/// A joinable server produced by discovery.
///
/// Built fresh on every discovery cycle and never mutated; a new cycle
/// replaces the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyServer {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub game_id: String,
    pub game_name: String,
    pub player_count: u32,
    pub max_players: u32,
    pub protocol_version: String,
}
