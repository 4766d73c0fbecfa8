//! Error types for the lobby layer.

use mpn_netplay_protocol::ProtocolError;

/// Why a discovery cycle failed.
///
/// None of these affect an open NetPlay connection.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The request never got a response: DNS, connect, TLS, or timeout.
    #[error("lobby unreachable: {0}")]
    Network(String),

    /// The directory answered, but not with success: a non-200 HTTP
    /// status, or an envelope whose `status` isn't `"OK"`.
    #[error("lobby returned {0}")]
    BadStatus(String),

    /// The body wasn't a valid listing.
    #[error("lobby response malformed: {0}")]
    Parse(#[from] ProtocolError),
}

/// Errors from the browser actor's handle.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The browser actor has shut down.
    #[error("lobby browser is not running")]
    BrowserUnavailable,

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}
