//! HTTP client for the session directory.
//!
//! Thin wrapper over `GET <directory>?version=<tag>`. Turning a body into
//! sessions is the pure [`parse_listing`], so it can be tested without a
//! server.

use std::sync::Arc;

use mpn_netplay_protocol::{Codec, JsonCodec, LobbyListing, LobbyServer, LobbySession};
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::{resolve_game_name, DiscoveryError, GameTitleCache, LobbyConfig};

/// Header the directory expects from emulator clients.
const CLIENT_HEADER: &str = "X-Is-Dolphin";

/// Client for the public session directory.
///
/// Cheap to clone: the underlying `reqwest::Client` shares its pool.
#[derive(Clone)]
pub struct LobbyClient {
    http: reqwest::Client,
    config: LobbyConfig,
    titles: Option<Arc<dyn GameTitleCache>>,
}

impl LobbyClient {
    /// # Errors
    /// [`DiscoveryError::Network`] if the HTTP client can't be built
    /// (e.g. no TLS backend).
    pub fn new(config: LobbyConfig) -> Result<Self, DiscoveryError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DiscoveryError::Network(e.to_string()))?;
        Ok(Self {
            http,
            config,
            titles: None,
        })
    }

    /// Uses `cache` as the first source of game titles.
    pub fn with_title_cache(mut self, cache: Arc<dyn GameTitleCache>) -> Self {
        self.titles = Some(cache);
        self
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// Fetches every session advertising `protocol_tag`, in-game or not.
    pub async fn fetch_sessions(
        &self,
        protocol_tag: &str,
    ) -> Result<Vec<LobbySession>, DiscoveryError> {
        debug!(url = %self.config.directory_url, protocol_tag, "querying lobby");

        let response = self
            .http
            .get(&self.config.directory_url)
            .query(&[("version", protocol_tag)])
            .header(CLIENT_HEADER, "1")
            .send()
            .await
            .map_err(|e| DiscoveryError::Network(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DiscoveryError::BadStatus(format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DiscoveryError::Network(e.to_string()))?;

        let sessions = parse_listing(&body, protocol_tag)?;
        debug!(count = sessions.len(), "lobby sessions fetched");
        Ok(sessions)
    }

    /// Discovers joinable servers for `protocol_tag`.
    ///
    /// Sessions already in game are excluded.
    pub async fn discover_servers(
        &self,
        protocol_tag: &str,
    ) -> Result<Vec<LobbyServer>, DiscoveryError> {
        let sessions = self.fetch_sessions(protocol_tag).await?;
        let servers: Vec<LobbyServer> = sessions
            .iter()
            .filter(|s| !s.in_game)
            .map(|s| {
                to_lobby_server(
                    s,
                    self.titles.as_deref(),
                    self.config.default_max_players,
                )
            })
            .collect();
        info!(
            servers = servers.len(),
            listed = sessions.len(),
            "lobby discovery finished"
        );
        Ok(servers)
    }
}

/// Decodes a directory body and keeps sessions tagged `protocol_tag`.
///
/// # Errors
/// - [`DiscoveryError::Parse`] if the body isn't a listing
/// - [`DiscoveryError::BadStatus`] if the envelope's status isn't `"OK"`
pub fn parse_listing(
    body: &[u8],
    protocol_tag: &str,
) -> Result<Vec<LobbySession>, DiscoveryError> {
    let listing: LobbyListing = JsonCodec.decode(body)?;
    if !listing.is_ok() {
        return Err(DiscoveryError::BadStatus(format!(
            "status {}",
            listing.status
        )));
    }
    Ok(listing
        .sessions
        .into_iter()
        .filter(|s| s.version == protocol_tag)
        .collect())
}

/// Normalizes a directory entry into a joinable server.
pub fn to_lobby_server(
    session: &LobbySession,
    titles: Option<&dyn GameTitleCache>,
    max_players: u32,
) -> LobbyServer {
    LobbyServer {
        name: session.name.clone(),
        address: session.server_id.clone(),
        port: session.port,
        game_id: session.game_id.clone(),
        game_name: resolve_game_name(titles, &session.game_id),
        player_count: session.player_count,
        max_players,
        protocol_version: session.version.clone(),
    }
}
