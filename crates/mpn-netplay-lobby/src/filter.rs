//! Client-side session filters.

use mpn_netplay_protocol::LobbySession;

/// Which sessions to show by password state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    All,
    /// Sessions without a password.
    PublicOnly,
    /// Password-protected sessions.
    PrivateOnly,
}

/// What the user wants to see in the session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    /// Exact region code to keep, or `None` for any region.
    pub region: Option<String>,
    pub visibility: Visibility,
    /// Drop sessions whose game already started.
    pub hide_in_game: bool,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            region: None,
            visibility: Visibility::All,
            hide_in_game: true,
        }
    }
}

impl FilterSet {
    /// A filter that keeps everything.
    pub fn show_all() -> Self {
        Self {
            hide_in_game: false,
            ..Default::default()
        }
    }

    /// Whether `session` passes every filter.
    pub fn accepts(&self, session: &LobbySession) -> bool {
        if let Some(region) = &self.region {
            if session.region != *region {
                return false;
            }
        }
        let visible = match self.visibility {
            Visibility::All => true,
            Visibility::PublicOnly => !session.has_password,
            Visibility::PrivateOnly => session.has_password,
        };
        visible && !(self.hide_in_game && session.in_game)
    }
}

/// Returns the sessions that pass `filters`, in their original order.
pub fn apply_filters(
    sessions: &[LobbySession],
    filters: &FilterSet,
) -> Vec<LobbySession> {
    sessions
        .iter()
        .filter(|s| filters.accepts(s))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(name: &str, region: &str, in_game: bool, password: bool) -> LobbySession {
        LobbySession {
            server_id: "10.0.0.1".into(),
            name: name.into(),
            port: 2626,
            game_id: "RMCP01".into(),
            player_count: 1,
            in_game,
            version: "MPN".into(),
            region: region.into(),
            method: "direct".into(),
            has_password: password,
        }
    }

    fn names(sessions: &[LobbySession]) -> Vec<&str> {
        sessions.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_hide_in_game_drops_started_sessions() {
        let sessions = vec![
            session("us", "US", false, false),
            session("eu", "EU", true, false),
        ];
        let filters = FilterSet {
            hide_in_game: true,
            ..FilterSet::show_all()
        };

        assert_eq!(names(&apply_filters(&sessions, &filters)), vec!["us"]);
    }

    #[test]
    fn test_show_all_keeps_everything() {
        let sessions = vec![
            session("a", "US", true, true),
            session("b", "EU", false, false),
        ];

        assert_eq!(apply_filters(&sessions, &FilterSet::show_all()).len(), 2);
    }

    #[test]
    fn test_region_filter_is_exact_match() {
        let sessions = vec![
            session("us", "US", false, false),
            session("eu", "EU", false, false),
            session("jp", "JP", false, false),
        ];
        let filters = FilterSet {
            region: Some("EU".into()),
            ..FilterSet::default()
        };

        assert_eq!(names(&apply_filters(&sessions, &filters)), vec!["eu"]);
    }

    #[test]
    fn test_visibility_filters_by_password() {
        let sessions = vec![
            session("open", "US", false, false),
            session("locked", "US", false, true),
        ];

        let public = FilterSet {
            visibility: Visibility::PublicOnly,
            ..FilterSet::default()
        };
        let private = FilterSet {
            visibility: Visibility::PrivateOnly,
            ..FilterSet::default()
        };

        assert_eq!(names(&apply_filters(&sessions, &public)), vec!["open"]);
        assert_eq!(names(&apply_filters(&sessions, &private)), vec!["locked"]);
    }

    #[test]
    fn test_filters_combine() {
        let sessions = vec![
            session("a", "EU", false, true),
            session("b", "EU", true, true),
            session("c", "US", false, true),
            session("d", "EU", false, false),
        ];
        let filters = FilterSet {
            region: Some("EU".into()),
            visibility: Visibility::PrivateOnly,
            hide_in_game: true,
        };

        assert_eq!(names(&apply_filters(&sessions, &filters)), vec!["a"]);
    }

    #[test]
    fn test_default_filters_hide_in_game() {
        assert!(FilterSet::default().hide_in_game);
        assert_eq!(FilterSet::default().visibility, Visibility::All);
        assert_eq!(FilterSet::default().region, None);
    }
}
