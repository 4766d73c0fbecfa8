//! Native boundary for the NetPlay coordinator.
//!
//! The emulator core owns the real NetPlay connection. This crate describes
//! the narrow surface the coordinator talks to:
//!
//! - **Calls** ([`NativeNetplay`]): synchronous, possibly blocking
//!   functions (connect, host, roster reads, message drain).
//! - **Callbacks** ([`NativeEvent`] through a [`NativeEventSink`]):
//!   notifications the core raises on whatever thread it likes. They are
//!   never applied directly; the sink only enqueues them for the
//!   coordinator's single mutation path.
//!
//! ```text
//!   coordinator ──call_blocking──→ NativeNetplay (blocking pool)
//!        ↑                              │
//!        └──── mpsc ←── NativeEventSink ┘  (any thread)
//! ```
//!
//! # Feature Flags
//!
//! - `loopback` (default): [`LoopbackNative`], an in-process core that
//!   records calls and lets tests or demos inject callbacks.

mod error;
mod event;
#[cfg(feature = "loopback")]
mod loopback;

pub use error::NativeError;
pub use event::{NativeEvent, NativeEventSink};
#[cfg(feature = "loopback")]
pub use loopback::{LoopbackNative, NativeCall};

use std::sync::Arc;

use mpn_netplay_protocol::{Player, PlayerId, RoomVisibility};

/// Shared handle to the native core.
pub type SharedNative = Arc<dyn NativeNetplay>;

/// The calls the native NetPlay core exposes.
///
/// Every method may block (a connect waits on the core's own timeout), so
/// async callers go through [`call_blocking`]. Implementations are shared
/// between the coordinator and the poller, hence `Send + Sync`.
///
/// Only the coordinator issues lifecycle calls (`connect`, `host`,
/// `disconnect`). The poller restricts itself to `player_count`,
/// `player_list`, and `process_messages`.
pub trait NativeNetplay: Send + Sync + 'static {
    /// Registers where callbacks go. Called once, before any other call.
    fn attach(&self, sink: NativeEventSink);

    /// Joins a session. `Ok(false)` means the core refused or timed out.
    fn connect(&self, address: &str, port: u16) -> Result<bool, NativeError>;

    /// Starts hosting on `port`.
    fn host(&self, port: u16) -> Result<bool, NativeError>;

    fn disconnect(&self) -> Result<(), NativeError>;

    fn send_message(&self, text: &str) -> Result<(), NativeError>;

    fn kick_player(&self, id: PlayerId) -> Result<(), NativeError>;

    fn ban_player(&self, id: PlayerId) -> Result<(), NativeError>;

    fn set_room_visibility(
        &self,
        visibility: RoomVisibility,
    ) -> Result<(), NativeError>;

    fn player_count(&self) -> Result<usize, NativeError>;

    fn player_list(&self) -> Result<Vec<Player>, NativeError>;

    /// Drains the core's pending protocol messages. Any callbacks this
    /// triggers arrive through the sink.
    fn process_messages(&self) -> Result<(), NativeError>;

    /// Tells the host whether this client has the game it started.
    fn send_game_status(&self, same_game: bool) -> Result<(), NativeError>;

    /// Whether the file at `path` is a game the core can run over NetPlay.
    fn validate_game_file(&self, path: &str) -> Result<bool, NativeError> {
        let _ = path;
        Err(NativeError::Unavailable("game validation".into()))
    }

    fn game_checksum(&self, path: &str) -> Result<String, NativeError> {
        let _ = path;
        Err(NativeError::Unavailable("game checksum".into()))
    }

    fn game_id(&self, path: &str) -> Result<String, NativeError> {
        let _ = path;
        Err(NativeError::Unavailable("game id".into()))
    }

    /// Boots the game for the current session.
    fn launch_game(&self, path: &str) -> Result<bool, NativeError> {
        let _ = path;
        Err(NativeError::Unavailable("game launch".into()))
    }
}

/// Runs a native call on Tokio's blocking pool.
///
/// A panic inside the call is caught at the task boundary and reported as
/// [`NativeError::Panicked`] instead of tearing down the caller.
pub async fn call_blocking<T, F>(
    native: &SharedNative,
    op: &'static str,
    f: F,
) -> Result<T, NativeError>
where
    T: Send + 'static,
    F: FnOnce(&dyn NativeNetplay) -> Result<T, NativeError> + Send + 'static,
{
    let native = Arc::clone(native);
    match tokio::task::spawn_blocking(move || f(native.as_ref())).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            tracing::error!(op, "native call panicked");
            Err(NativeError::Panicked { op })
        }
        Err(e) => Err(NativeError::Call {
            op,
            message: e.to_string(),
        }),
    }
}

#[cfg(all(test, feature = "loopback"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_blocking_returns_value() {
        let native: SharedNative = Arc::new(LoopbackNative::new());

        let count = call_blocking(&native, "player_count", |n| n.player_count())
            .await
            .unwrap();

        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_call_blocking_panic_becomes_error() {
        let native: SharedNative = Arc::new(LoopbackNative::new());

        let result: Result<(), _> =
            call_blocking(&native, "boom", |_| panic!("core crashed")).await;

        assert_eq!(result, Err(NativeError::Panicked { op: "boom" }));
    }

    #[test]
    fn test_default_game_calls_are_unavailable() {
        struct Bare;
        impl NativeNetplay for Bare {
            fn attach(&self, _: NativeEventSink) {}
            fn connect(&self, _: &str, _: u16) -> Result<bool, NativeError> {
                Ok(false)
            }
            fn host(&self, _: u16) -> Result<bool, NativeError> {
                Ok(false)
            }
            fn disconnect(&self) -> Result<(), NativeError> {
                Ok(())
            }
            fn send_message(&self, _: &str) -> Result<(), NativeError> {
                Ok(())
            }
            fn kick_player(&self, _: PlayerId) -> Result<(), NativeError> {
                Ok(())
            }
            fn ban_player(&self, _: PlayerId) -> Result<(), NativeError> {
                Ok(())
            }
            fn set_room_visibility(
                &self,
                _: RoomVisibility,
            ) -> Result<(), NativeError> {
                Ok(())
            }
            fn player_count(&self) -> Result<usize, NativeError> {
                Ok(0)
            }
            fn player_list(&self) -> Result<Vec<Player>, NativeError> {
                Ok(vec![])
            }
            fn process_messages(&self) -> Result<(), NativeError> {
                Ok(())
            }
            fn send_game_status(&self, _: bool) -> Result<(), NativeError> {
                Ok(())
            }
        }

        let bare = Bare;
        assert!(bare.validate_game_file("x.iso").unwrap_err().is_unavailable());
        assert!(bare.launch_game("x.iso").unwrap_err().is_unavailable());
    }
}
