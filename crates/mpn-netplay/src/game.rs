//! Game file checks before launching over NetPlay.

use mpn_netplay_native::{call_blocking, NativeError, SharedNative};
use serde::{Deserialize, Serialize};

/// Result of [`NetplayCoordinator::validate_game`](crate::NetplayCoordinator::validate_game).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameValidation {
    pub valid: bool,
    pub checksum: Option<String>,
    pub game_id: Option<String>,
    /// Why the file was rejected. `None` when valid.
    pub error: Option<String>,
}

impl GameValidation {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Asks the native core about `path`.
///
/// Native failures are folded into [`GameValidation::error`].
pub(crate) async fn validate(native: &SharedNative, path: &str) -> GameValidation {
    let owned = path.to_string();
    let checked = call_blocking(native, "validate_game_file", move |n| {
        let valid = n.validate_game_file(&owned)?;
        if !valid {
            return Ok(None);
        }
        let checksum = n.game_checksum(&owned)?;
        let game_id = n.game_id(&owned)?;
        Ok::<_, NativeError>(Some((checksum, game_id)))
    })
    .await;

    match checked {
        Ok(Some((checksum, game_id))) => {
            tracing::debug!(path, %game_id, "game file valid");
            GameValidation {
                valid: true,
                checksum: Some(checksum),
                game_id: Some(game_id),
                error: None,
            }
        }
        Ok(None) => {
            tracing::debug!(path, "game file rejected");
            GameValidation::invalid("not a valid game file")
        }
        Err(e) => {
            tracing::warn!(path, error = %e, "game validation failed");
            GameValidation::invalid(e.to_string())
        }
    }
}
