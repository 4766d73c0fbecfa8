//! The event pump: the one task that applies inbound events to the store.
//!
//! Native callbacks, poller roster reports, and local chat echoes all land
//! here as messages. Handling them one at a time in this task means roster
//! and chat writes never race each other.
//!
//! ```text
//!   NativeEventSink ──┐
//!   BackgroundPoller ─┼──→ EventPump ──→ SessionStore
//!   send_chat echo ───┘         └──────→ EventHub
//! ```
//!
//! ## Why there is exactly one writer
//!
//! The native core calls back on whatever thread it likes, and the poller
//! reads the roster from a blocking task while callbacks keep arriving. If
//! each of those wrote the store directly, a poll result read *before* a
//! `PlayerJoined` could land *after* it and put the old roster back.
//!
//! Instead every source turns into a message and this loop applies them in
//! order. Two checks keep the order meaningful:
//!
//! - a poller report carries the generation it was started for and the
//!   roster revision it saw. If the session was replaced, or a callback
//!   has changed the roster since, the report is stale and dropped;
//! - player and chat callbacks that arrive after `disconnect()` are dropped,
//!   so a slow core cannot refill a cleared session.
//!
//! ## Select order
//!
//! The loop is `biased`: shutdown first, then local commands, then native
//! callbacks, then poller reports. A callback and a report that are both
//! ready are applied callback first, so the report then sees a newer
//! revision and is discarded instead of emitting a second roster update.
//!
//! ## Connecting
//!
//! Outcomes of a pending `connect` or `host` belong to that call, not to the
//! pump. A `ConnectionFailed` or `ConnectionLost` that arrives while
//! `Connecting` is recorded (or just logged) and the pending call resolves
//! the status, so `Connecting` never ends anywhere but `Connected` or
//! `Disconnected`.

use std::sync::Arc;

use mpn_netplay_native::{call_blocking, NativeEvent, SharedNative};
use mpn_netplay_poll::{BackgroundPoller, RosterReport};
use mpn_netplay_protocol::{
    ChatMessage, ConnectionStatus, Player, SessionEvent,
};
use mpn_netplay_session::{chat_timestamp, SessionStore};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::hub::EventHub;

/// State shared by the coordinator and the pump.
pub(crate) struct Shared {
    pub(crate) native: SharedNative,
    pub(crate) store: Arc<SessionStore>,
    pub(crate) poller: BackgroundPoller,
    pub(crate) hub: EventHub,
}

/// Requests from the coordinator to the pump.
pub(crate) enum PumpCommand {
    /// Stores a locally authored chat line. Replies whether it was stored.
    LocalChat {
        message: ChatMessage,
        reply: oneshot::Sender<bool>,
    },
}

/// The task behind [`NetplayCoordinator`](crate::NetplayCoordinator).
///
/// Owns the receiving ends of all inbound channels. It runs until the
/// coordinator signals shutdown or every sender is gone.
pub(crate) struct EventPump {
    pub(crate) shared: Arc<Shared>,
    pub(crate) native_events: mpsc::UnboundedReceiver<NativeEvent>,
    pub(crate) reports: mpsc::UnboundedReceiver<RosterReport>,
    pub(crate) commands: mpsc::UnboundedReceiver<PumpCommand>,
    pub(crate) shutdown: watch::Receiver<bool>,
}

impl EventPump {
    pub(crate) async fn run(mut self) {
        debug!("event pump started");
        // Owned here so the select arm's borrow doesn't pin `self`.
        let mut shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                biased;

                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,
                Some(cmd) = self.commands.recv() => self.handle_command(cmd),
                Some(event) = self.native_events.recv() => {
                    self.handle_native(event).await;
                }
                Some(report) = self.reports.recv() => self.handle_report(report),
                else => break,
            }
        }

        debug!("event pump stopped");
    }

    fn store(&self) -> &SessionStore {
        &self.shared.store
    }

    fn publish(&self, event: SessionEvent) {
        self.shared.hub.publish(event);
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn handle_command(&self, cmd: PumpCommand) {
        match cmd {
            PumpCommand::LocalChat { message, reply } => {
                let stored = self.store().status() == ConnectionStatus::Connected
                    && self.append_chat(message);
                let _ = reply.send(stored);
            }
        }
    }

    fn append_chat(&self, message: ChatMessage) -> bool {
        if !self.store().append_chat(message.clone()) {
            debug!(sender = %message.sender, "duplicate chat message dropped");
            return false;
        }
        self.publish(SessionEvent::Chat(message));
        true
    }

    // -----------------------------------------------------------------------
    // Native callbacks
    // -----------------------------------------------------------------------

    async fn handle_native(&self, event: NativeEvent) {
        let status = self.store().status();
        trace!(?event, ?status, "native event");

        match event {
            NativeEvent::Connected => {
                debug!("native core reports connected");
            }
            NativeEvent::ConnectionFailed(reason) => {
                if status == ConnectionStatus::Connecting {
                    // The pending connect call reports its own outcome.
                    debug!(%reason, "native connection failure during connect");
                } else if status == ConnectionStatus::Disconnected {
                    debug!(%reason, "connection failure after disconnect dropped");
                } else {
                    warn!(%reason, "native core reports connection failure");
                    self.publish(SessionEvent::ConnectionFailed { reason });
                }
            }
            NativeEvent::Disconnected => {
                info!("native core closed the session");
                self.publish(SessionEvent::NativeDisconnected);
            }
            NativeEvent::ConnectionLost => self.connection_lost(),
            NativeEvent::PlayerJoined { id, nickname } => {
                if status == ConnectionStatus::Disconnected {
                    debug!(%id, "player join after disconnect dropped");
                    return;
                }
                let player = Player::new(id, nickname);
                if let Some(snapshot) = self.store().upsert_player(player.clone()) {
                    info!(player_id = %id, nickname = %player.nickname, "player joined");
                    self.publish(SessionEvent::PlayerJoined(player));
                    self.publish(SessionEvent::RosterUpdated(snapshot));
                }
            }
            NativeEvent::PlayerLeft(id) => {
                if status == ConnectionStatus::Disconnected {
                    return;
                }
                if let Some(snapshot) = self.store().remove_player(id) {
                    info!(player_id = %id, "player left");
                    self.publish(SessionEvent::PlayerLeft(id));
                    self.publish(SessionEvent::RosterUpdated(snapshot));
                }
            }
            NativeEvent::MessageReceived { sender, text } => {
                if status == ConnectionStatus::Disconnected {
                    debug!(%sender, "chat after disconnect dropped");
                    return;
                }
                self.append_chat(ChatMessage::new(sender, text, chat_timestamp()));
            }
            NativeEvent::HostGameStarted => self.host_game_started(status).await,
        }
    }

    fn connection_lost(&self) {
        if !self.store().mark_lost() {
            match self.store().status() {
                ConnectionStatus::Connecting => {
                    warn!("connection lost before the attempt completed");
                }
                status => debug!(?status, "connection lost ignored: no open session"),
            }
            return;
        }
        self.shared.poller.stop();
        let (status, role) = self.store().status_and_role();
        warn!(%role, "connection lost");
        self.publish(SessionEvent::StatusChanged { status, role });
    }

    async fn host_game_started(&self, status: ConnectionStatus) {
        if status != ConnectionStatus::Connected {
            debug!(?status, "game start notice without open session dropped");
            return;
        }
        match call_blocking(&self.shared.native, "send_game_status", |n| {
            n.send_game_status(true)
        })
        .await
        {
            Ok(()) => {
                info!("host started the game");
                self.publish(SessionEvent::GameStarted);
            }
            Err(e) => warn!(error = %e, "could not confirm game status"),
        }
    }

    // -----------------------------------------------------------------------
    // Poller reports
    // -----------------------------------------------------------------------

    fn handle_report(&self, report: RosterReport) {
        let store = self.store();
        if !store.is_current(report.generation)
            || store.status() != ConnectionStatus::Connected
        {
            trace!(generation = report.generation, "stale roster report dropped");
            return;
        }
        // A callback changed the roster after this read started.
        if store.roster_revision() != report.observed_revision {
            trace!(
                observed = report.observed_revision,
                "superseded roster report dropped"
            );
            return;
        }
        if let Some(snapshot) =
            store.refresh_roster(report.player_count, report.players)
        {
            debug!(
                revision = snapshot.revision,
                players = snapshot.player_count,
                "roster refreshed from native"
            );
            self.publish(SessionEvent::RosterUpdated(snapshot));
        }
    }
}
