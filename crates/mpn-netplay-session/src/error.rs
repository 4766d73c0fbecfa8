//! Error types for the session layer.

use mpn_netplay_protocol::ConnectionStatus;

/// Errors raised by session state checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A lifecycle transition was requested while another is in flight,
    /// or while a session is already open.
    #[error("session busy: currently {0}")]
    Busy(ConnectionStatus),

    /// The operation needs an open connection.
    #[error("not connected")]
    NotConnected,

    /// Chat text was empty or whitespace.
    #[error("message is empty")]
    EmptyMessage,
}
