//! Lobby client configuration.

use std::time::Duration;

/// Where and how to reach the session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyConfig {
    /// Directory listing endpoint.
    pub directory_url: String,
    /// Only sessions advertising this version tag are ever surfaced.
    pub protocol_tag: String,
    /// Default: 10 s.
    pub connect_timeout: Duration,
    /// Time allowed for the response once connected. Default: 10 s.
    pub read_timeout: Duration,
    /// Capacity reported for every discovered server. Default: 4.
    pub default_max_players: u32,
    /// Browser auto-refresh period. Default: 5 s.
    pub refresh_interval: Duration,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            directory_url: "https://lobby.dolphin-emu.org/v0/list".to_string(),
            protocol_tag: "MPN".to_string(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            default_max_players: 4,
            refresh_interval: Duration::from_secs(5),
        }
    }
}

impl LobbyConfig {
    /// Config pointing at another directory, other fields default.
    pub fn with_url(directory_url: impl Into<String>) -> Self {
        Self {
            directory_url: directory_url.into(),
            ..Default::default()
        }
    }

    /// Upper bound on a whole request: connect plus read.
    pub fn request_timeout(&self) -> Duration {
        self.connect_timeout + self.read_timeout
    }
}
