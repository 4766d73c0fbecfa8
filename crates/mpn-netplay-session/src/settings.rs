//! User NetPlay preferences.
//!
//! These are what a settings screen edits: who you are in chat, where you
//! last connected, and how a hosted room is advertised. The coordinator
//! reads them but never persists them; the struct is serde-ready so
//! whoever owns storage can.

use mpn_netplay_protocol::RoomVisibility;
use serde::{Deserialize, Serialize};

/// Default NetPlay port.
pub const DEFAULT_PORT: u16 = 2626;

/// How a session is reached.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Direct,
    Traversal,
}

/// NetPlay preferences.
///
/// Missing fields fall back to their defaults when deserializing, so an
/// older saved blob keeps loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetplaySettings {
    /// Nickname shown to other players and on locally echoed chat.
    pub username: String,
    pub server_address: String,
    pub server_port: u16,
    pub room_visibility: RoomVisibility,
    pub connection_type: ConnectionType,
    /// Name advertised for a hosted room. Empty means "use the username".
    pub server_name: String,
}

impl Default for NetplaySettings {
    fn default() -> Self {
        Self {
            username: "Player".to_string(),
            server_address: "127.0.0.1".to_string(),
            server_port: DEFAULT_PORT,
            room_visibility: RoomVisibility::Public,
            connection_type: ConnectionType::Direct,
            server_name: String::new(),
        }
    }
}

impl NetplaySettings {
    /// The room name to advertise when hosting.
    pub fn effective_server_name(&self) -> &str {
        if self.server_name.trim().is_empty() {
            &self.username
        } else {
            &self.server_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = NetplaySettings::default();
        assert_eq!(s.username, "Player");
        assert_eq!(s.server_address, "127.0.0.1");
        assert_eq!(s.server_port, 2626);
        assert_eq!(s.room_visibility, RoomVisibility::Public);
        assert_eq!(s.connection_type, ConnectionType::Direct);
        assert_eq!(s.server_name, "");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: NetplaySettings =
            serde_json::from_str(r#"{"username":"Mario","connection_type":"traversal"}"#)
                .unwrap();

        assert_eq!(s.username, "Mario");
        assert_eq!(s.connection_type, ConnectionType::Traversal);
        assert_eq!(s.server_port, 2626);
    }

    #[test]
    fn test_effective_server_name_falls_back_to_username() {
        let mut s = NetplaySettings {
            username: "Luigi".into(),
            ..Default::default()
        };
        assert_eq!(s.effective_server_name(), "Luigi");

        s.server_name = "Mansion".into();
        assert_eq!(s.effective_server_name(), "Mansion");
    }
}
