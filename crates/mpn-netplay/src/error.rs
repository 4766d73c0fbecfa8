//! Unified error type for the NetPlay coordinator.

use mpn_netplay_lobby::{DiscoveryError, LobbyError};
use mpn_netplay_native::NativeError;
use mpn_netplay_protocol::{ConnectionStatus, ProtocolError};
use mpn_netplay_session::SessionError;

/// Why a `connect` or `host` did not end in `Connected`.
///
/// Every variant leaves the session `Disconnected`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Another lifecycle transition is in flight, or a session is open.
    #[error("connection busy: currently {0}")]
    Busy(ConnectionStatus),

    /// The native core refused or timed out.
    #[error("could not connect to {address}:{port}")]
    Refused { address: String, port: u16 },

    #[error("could not host on port {port}")]
    HostFailed { port: u16 },

    /// The native NetPlay library is not present.
    #[error("netplay unavailable: {0}")]
    NativeUnavailable(String),

    #[error(transparent)]
    Native(NativeError),

    /// The core reported the link lost while this attempt was still
    /// `Connecting`.
    #[error("connection lost before the attempt completed")]
    LostWhileConnecting,

    /// `disconnect` ran while this attempt was still `Connecting`.
    #[error("connection attempt cancelled")]
    Cancelled,

    /// The coordinator was shut down.
    #[error("coordinator is shut down")]
    ShutDown,
}

impl From<NativeError> for ConnectionError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::Unavailable(what) => Self::NativeUnavailable(what),
            other => Self::Native(other),
        }
    }
}

/// What kind of failure an error is, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connecting or hosting failed; the server may be unreachable.
    Connection,
    /// Lobby discovery failed. Any open session is unaffected.
    Discovery,
    /// The native library is missing.
    Unavailable,
    /// The session was in the wrong state for the request.
    Session,
    /// A native call failed after the library was reached.
    Native,
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum NetplayError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The file can't be played over NetPlay.
    #[error("invalid game: {0}")]
    InvalidGame(String),

    /// The builder was not given a native core.
    #[error("no native netplay core configured")]
    MissingNative,

    #[error("coordinator is shut down")]
    ShutDown,
}

impl NetplayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection(ConnectionError::NativeUnavailable(_))
            | Self::MissingNative => ErrorCategory::Unavailable,
            Self::Connection(ConnectionError::Busy(_))
            | Self::Connection(ConnectionError::ShutDown) => {
                ErrorCategory::Session
            }
            Self::Connection(_) => ErrorCategory::Connection,
            Self::Discovery(_) | Self::Lobby(_) | Self::Protocol(_) => {
                ErrorCategory::Discovery
            }
            Self::Native(e) if e.is_unavailable() => ErrorCategory::Unavailable,
            Self::Native(_) => ErrorCategory::Native,
            Self::Session(_) | Self::InvalidGame(_) | Self::ShutDown => {
                ErrorCategory::Session
            }
        }
    }
}
