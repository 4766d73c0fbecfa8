//! Lobby browser actor: a Tokio task that owns the session list.
//!
//! The browser keeps the raw listing and the current [`FilterSet`],
//! re-fetches on a timer, and publishes the filtered list on a `watch`
//! channel. Everything else talks to it through a [`BrowserHandle`].
//!
//! ```text
//!   BrowserHandle ──mpsc──→ BrowserActor ──watch──→ subscribers
//!                               │
//!                               └── LobbyClient (HTTP)
//! ```
//!
//! Auto-refresh runs every `refresh_interval` and waits twice as long
//! after a failed fetch.

use std::time::Duration;

use mpn_netplay_protocol::LobbySession;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::{apply_filters, DiscoveryError, FilterSet, LobbyClient, LobbyError};

/// What subscribers see after each refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserUpdate {
    /// The filtered session list.
    Sessions(Vec<LobbySession>),
    /// The refresh failed. The previous list is kept.
    Failed(String),
}

/// Browser options.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub filters: FilterSet,
    /// Re-fetch on a timer. When off, only explicit refreshes fetch.
    pub auto_refresh: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            filters: FilterSet::default(),
            auto_refresh: true,
        }
    }
}

/// Commands sent to the browser actor.
enum BrowserCommand {
    /// Fetch now. Replies with the number of sessions shown.
    Refresh {
        reply: oneshot::Sender<Result<usize, DiscoveryError>>,
    },
    /// Replace the filters and fetch.
    SetFilters {
        filters: FilterSet,
        reply: oneshot::Sender<Result<usize, DiscoveryError>>,
    },
    Sessions {
        reply: oneshot::Sender<Vec<LobbySession>>,
    },
    Filters {
        reply: oneshot::Sender<FilterSet>,
    },
    Shutdown,
}

/// Handle to a running browser actor.
///
/// Cheap to clone: it wraps an `mpsc::Sender` and a `watch::Receiver`.
#[derive(Clone)]
pub struct BrowserHandle {
    sender: mpsc::Sender<BrowserCommand>,
    updates: watch::Receiver<Option<BrowserUpdate>>,
}

impl BrowserHandle {
    /// Fetches now and returns how many sessions pass the filters.
    pub async fn refresh(&self) -> Result<usize, LobbyError> {
        let (reply, rx) = oneshot::channel();
        self.send(BrowserCommand::Refresh { reply }).await?;
        Ok(rx.await.map_err(|_| LobbyError::BrowserUnavailable)??)
    }

    /// Replaces the filters, then fetches.
    pub async fn set_filters(
        &self,
        filters: FilterSet,
    ) -> Result<usize, LobbyError> {
        let (reply, rx) = oneshot::channel();
        self.send(BrowserCommand::SetFilters { filters, reply })
            .await?;
        Ok(rx.await.map_err(|_| LobbyError::BrowserUnavailable)??)
    }

    /// The current filtered list.
    pub async fn sessions(&self) -> Result<Vec<LobbySession>, LobbyError> {
        let (reply, rx) = oneshot::channel();
        self.send(BrowserCommand::Sessions { reply }).await?;
        rx.await.map_err(|_| LobbyError::BrowserUnavailable)
    }

    pub async fn filters(&self) -> Result<FilterSet, LobbyError> {
        let (reply, rx) = oneshot::channel();
        self.send(BrowserCommand::Filters { reply }).await?;
        rx.await.map_err(|_| LobbyError::BrowserUnavailable)
    }

    /// Watches refresh results. Starts at `None` until the first fetch.
    pub fn subscribe(&self) -> watch::Receiver<Option<BrowserUpdate>> {
        self.updates.clone()
    }

    /// Stops the actor. Later calls return `BrowserUnavailable`.
    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        self.send(BrowserCommand::Shutdown).await
    }

    async fn send(&self, cmd: BrowserCommand) -> Result<(), LobbyError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| LobbyError::BrowserUnavailable)
    }
}

/// Spawns a browser actor on the current runtime.
///
/// With `auto_refresh` on, the first fetch happens immediately.
pub fn spawn_browser(client: LobbyClient, config: BrowserConfig) -> BrowserHandle {
    let (sender, receiver) = mpsc::channel(32);
    let (updates_tx, updates) = watch::channel(None);
    let interval = client.config().refresh_interval;

    let actor = BrowserActor {
        client,
        filters: config.filters,
        sessions: Vec::new(),
        interval,
        next_refresh: config.auto_refresh.then(Instant::now),
        receiver,
        updates: updates_tx,
    };
    tokio::spawn(actor.run());

    BrowserHandle { sender, updates }
}

/// The actor state. Runs inside its own task.
struct BrowserActor {
    client: LobbyClient,
    filters: FilterSet,
    /// Raw sessions from the last successful fetch.
    sessions: Vec<LobbySession>,
    interval: Duration,
    /// `None` when auto-refresh is off.
    next_refresh: Option<Instant>,
    receiver: mpsc::Receiver<BrowserCommand>,
    updates: watch::Sender<Option<BrowserUpdate>>,
}

impl BrowserActor {
    async fn run(mut self) {
        tracing::info!(auto_refresh = self.next_refresh.is_some(), "lobby browser started");

        loop {
            let next_refresh = self.next_refresh;
            let timer = async move {
                match next_refresh {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    match cmd {
                        BrowserCommand::Refresh { reply } => {
                            let result = self.refresh().await;
                            let _ = reply.send(result);
                        }
                        BrowserCommand::SetFilters { filters, reply } => {
                            tracing::debug!(?filters, "lobby filters changed");
                            self.filters = filters;
                            let result = self.refresh().await;
                            let _ = reply.send(result);
                        }
                        BrowserCommand::Sessions { reply } => {
                            let _ = reply.send(self.visible());
                        }
                        BrowserCommand::Filters { reply } => {
                            let _ = reply.send(self.filters.clone());
                        }
                        BrowserCommand::Shutdown => {
                            tracing::info!("lobby browser shutting down");
                            break;
                        }
                    }
                }
                () = timer => {
                    let _ = self.refresh().await;
                }
            }
        }

        tracing::info!("lobby browser stopped");
    }

    fn visible(&self) -> Vec<LobbySession> {
        apply_filters(&self.sessions, &self.filters)
    }

    /// Fetches, publishes, and schedules the next auto-refresh.
    async fn refresh(&mut self) -> Result<usize, DiscoveryError> {
        let tag = self.client.config().protocol_tag.clone();
        let result = self.client.fetch_sessions(&tag).await;

        let delay = match &result {
            Ok(_) => self.interval,
            Err(_) => self.interval * 2,
        };
        if self.next_refresh.is_some() {
            self.next_refresh = Some(Instant::now() + delay);
        }

        match result {
            Ok(sessions) => {
                self.sessions = sessions;
                let visible = self.visible();
                let count = visible.len();
                tracing::debug!(
                    listed = self.sessions.len(),
                    shown = count,
                    "lobby refreshed"
                );
                self.updates.send_replace(Some(BrowserUpdate::Sessions(visible)));
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, retry_in = ?delay, "lobby refresh failed");
                self.updates
                    .send_replace(Some(BrowserUpdate::Failed(e.to_string())));
                Err(e)
            }
        }
    }
}
