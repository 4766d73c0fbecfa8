//! Game title resolution.
//!
//! The directory only carries a game id. The readable name comes from, in
//! order: the user's local game library (if the caller supplies one), the
//! built-in table below, or a synthesized `"Game (<id>)"`.

/// A lookup into the user's local game library.
pub trait GameTitleCache: Send + Sync + 'static {
    /// The title for `game_id`, if the library has that game.
    fn title(&self, game_id: &str) -> Option<String>;
}

/// Titles commonly seen on MPN lobbies.
const KNOWN_TITLES: &[(&str, &str)] = &[
    ("RMCE01", "Mario Kart: Double Dash!!"),
    ("RMCP01", "Mario Kart Wii"),
    ("RMCE08", "Mario Kart 8 Deluxe"),
    ("GALE01", "Super Smash Bros. Melee"),
    ("GALE02", "Super Smash Bros. Brawl"),
    ("GALE08", "Super Smash Bros. Ultimate"),
    ("RZDP01", "Mario Party 8"),
    ("RZDP02", "Mario Party 9"),
    ("RZDP03", "Mario Party 10"),
    ("RZDP04", "Mario Party Superstars"),
    ("RMCE02", "Mario Golf: Toadstool Tour"),
    ("RMCE03", "Mario Tennis: Power Tour"),
    ("RMCE04", "Mario Baseball"),
    ("RMCE05", "Mario Strikers"),
    ("RMCE06", "Mario Hoops 3-on-3"),
    ("RMCE07", "Mario Tennis Open"),
    ("RSPE01", "Wii Sports"),
    ("RSPE02", "Wii Sports Resort"),
    ("RSPE03", "Wii Play"),
    ("RSPE04", "Wii Play Motion"),
    ("RZDE01", "Wii Party"),
    ("RZDE02", "Wii Party U"),
    ("RZDE03", "Wii Party Deluxe"),
];

/// The built-in id → title table as a [`GameTitleCache`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTitles;

impl GameTitleCache for StaticTitles {
    fn title(&self, game_id: &str) -> Option<String> {
        KNOWN_TITLES
            .iter()
            .find(|(id, _)| *id == game_id)
            .map(|(_, title)| (*title).to_string())
    }
}

/// Resolves a readable name for `game_id`.
pub fn resolve_game_name(
    cache: Option<&dyn GameTitleCache>,
    game_id: &str,
) -> String {
    if let Some(title) = cache.and_then(|c| c.title(game_id)) {
        return title;
    }
    StaticTitles
        .title(game_id)
        .unwrap_or_else(|| format!("Game ({game_id})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Library;

    impl GameTitleCache for Library {
        fn title(&self, game_id: &str) -> Option<String> {
            (game_id == "RMCP01").then(|| "Mario Kart Wii (PAL)".to_string())
        }
    }

    #[test]
    fn test_resolve_prefers_local_library() {
        assert_eq!(
            resolve_game_name(Some(&Library), "RMCP01"),
            "Mario Kart Wii (PAL)"
        );
    }

    #[test]
    fn test_resolve_falls_back_to_static_table() {
        assert_eq!(
            resolve_game_name(Some(&Library), "GALE01"),
            "Super Smash Bros. Melee"
        );
        assert_eq!(resolve_game_name(None, "RSPE01"), "Wii Sports");
    }

    #[test]
    fn test_resolve_unknown_id_synthesizes_name() {
        assert_eq!(resolve_game_name(None, "ZZZZ99"), "Game (ZZZZ99)");
    }
}
