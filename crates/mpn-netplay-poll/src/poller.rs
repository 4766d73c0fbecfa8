//! The background poller: two cadences sharing one connection's lifetime.
//!
//! The native core pushes some changes as callbacks but not all of them: a
//! player can drop off without a `PlayerLeft`, and queued protocol messages
//! sit in the core until somebody asks for them. The poller covers both
//! gaps while a session is `Connected`.
//!
//! ```text
//!   roster loop (1000 ms) ── player_count + players ──→ RosterReport ──→ pump
//!   drain loop  ( 500 ms) ── process_messages ──→ native callbacks ──→ pump
//! ```
//!
//! ## Why two tasks
//!
//! Each native call blocks (it runs on `spawn_blocking`). A roster read that
//! takes several seconds must not delay message delivery, so each cadence
//! gets its own Tokio task and its own [`Cadence`] clock.
//!
//! ## Why the poller never writes the store
//!
//! A roster read can take long enough for a `PlayerJoined` callback to be
//! applied in the meantime. Writing the old read back would undo that join.
//! The poller therefore only *reports* what it read, tagged with the
//! session generation and the roster revision it saw before the call. The
//! coordinator's event pump decides whether the report is still current.
//!
//! ## Stopping
//!
//! Both loops `select!` on three things: the next cadence tick, an explicit
//! stop signal, and the store's status `watch`. Whichever fires first wins,
//! so `stop()` and a status change out of `Connected` take effect at once
//! instead of after the current sleep. A failed native call is logged with
//! `warn!` and the loop goes on; transient errors never end polling.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mpn_netplay_native::{call_blocking, SharedNative};
use mpn_netplay_protocol::{ConnectionStatus, Player};
use mpn_netplay_session::SessionStore;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::{Cadence, PollConfig};

/// A roster read from the native layer, for the coordinator to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterReport {
    /// Session generation the poller was started for.
    pub generation: u64,
    /// Store roster revision read just before the native call. If the
    /// roster changed since, this report may predate that change.
    pub observed_revision: u64,
    pub player_count: usize,
    pub players: Vec<Player>,
}

/// What each poll task needs.
#[derive(Clone)]
struct PollContext {
    native: SharedNative,
    store: Arc<SessionStore>,
    reports: mpsc::UnboundedSender<RosterReport>,
    generation: u64,
}

struct PollerRun {
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    generation: u64,
}

impl PollerRun {
    fn is_live(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }
}

/// Polls the native layer while the session is `Connected`.
///
/// `start` and `stop` are idempotent. Both loops end on their own once the
/// store's status leaves `Connected`; `stop` ends them immediately, even
/// mid-sleep or mid-call.
pub struct BackgroundPoller {
    native: SharedNative,
    store: Arc<SessionStore>,
    reports: mpsc::UnboundedSender<RosterReport>,
    run: Mutex<Option<PollerRun>>,
}

impl BackgroundPoller {
    pub fn new(
        native: SharedNative,
        store: Arc<SessionStore>,
        reports: mpsc::UnboundedSender<RosterReport>,
    ) -> Self {
        Self {
            native,
            store,
            reports,
            run: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<PollerRun>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns the roster and drain loops on the current Tokio runtime.
    ///
    /// Returns `false` without doing anything if the loops are already
    /// running.
    pub fn start(&self, config: PollConfig) -> bool {
        let mut run = self.lock();
        if run.as_ref().is_some_and(PollerRun::is_live) {
            debug!("poller already running");
            return false;
        }

        let config = config.validated();
        let generation = self.store.generation();
        let (stop_tx, stop_rx) = watch::channel(false);
        let ctx = PollContext {
            native: Arc::clone(&self.native),
            store: Arc::clone(&self.store),
            reports: self.reports.clone(),
            generation,
        };

        let roster = Cadence::new(
            "roster",
            config.roster_interval,
            config.initial_jitter,
        );
        let drain = Cadence::new(
            "drain",
            config.drain_interval,
            config.initial_jitter,
        );

        let tasks = vec![
            tokio::spawn(roster_loop(
                ctx.clone(),
                roster,
                stop_rx.clone(),
                self.store.subscribe_status(),
            )),
            tokio::spawn(drain_loop(
                ctx,
                drain,
                stop_rx,
                self.store.subscribe_status(),
            )),
        ];

        info!(generation, "background poller started");
        *run = Some(PollerRun {
            stop_tx,
            tasks,
            generation,
        });
        true
    }

    /// Signals both loops to stop. Returns `false` if nothing was running.
    pub fn stop(&self) -> bool {
        let Some(run) = self.lock().take() else {
            return false;
        };
        let was_live = run.is_live();
        run.stop_tx.send_replace(true);
        if was_live {
            info!(generation = run.generation, "background poller stopped");
        }
        was_live
    }

    /// Whether either loop is still running.
    pub fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(PollerRun::is_live)
    }
}

impl Drop for BackgroundPoller {
    fn drop(&mut self) {
        if let Some(run) = self.lock().take() {
            run.stop_tx.send_replace(true);
        }
    }
}

// ---------------------------------------------------------------------------
// Loops
// ---------------------------------------------------------------------------

/// Resolves once `stop()` fires or the session leaves `Connected`.
async fn stopped(
    stop: &mut watch::Receiver<bool>,
    status: &mut watch::Receiver<ConnectionStatus>,
) {
    tokio::select! {
        _ = stop.wait_for(|s| *s) => {}
        _ = status.wait_for(|s| *s != ConnectionStatus::Connected) => {}
    }
}

async fn roster_loop(
    ctx: PollContext,
    mut cadence: Cadence,
    mut stop: watch::Receiver<bool>,
    mut status: watch::Receiver<ConnectionStatus>,
) {
    loop {
        tokio::select! {
            biased;
            () = stopped(&mut stop, &mut status) => break,
            _ = cadence.wait_for_cycle() => {}
        }
        tokio::select! {
            biased;
            () = stopped(&mut stop, &mut status) => break,
            () = refresh_roster(&ctx) => {}
        }
    }
    debug!(cycles = cadence.cycle_count(), "roster loop ended");
}

async fn drain_loop(
    ctx: PollContext,
    mut cadence: Cadence,
    mut stop: watch::Receiver<bool>,
    mut status: watch::Receiver<ConnectionStatus>,
) {
    loop {
        tokio::select! {
            biased;
            () = stopped(&mut stop, &mut status) => break,
            _ = cadence.wait_for_cycle() => {}
        }
        tokio::select! {
            biased;
            () = stopped(&mut stop, &mut status) => break,
            () = drain_messages(&ctx) => {}
        }
    }
    debug!(cycles = cadence.cycle_count(), "drain loop ended");
}

/// One roster cycle. Failures are logged and the loop carries on.
async fn refresh_roster(ctx: &PollContext) {
    let observed_revision = ctx.store.roster_revision();
    let result = call_blocking(&ctx.native, "player_list", |n| {
        Ok((n.player_count()?, n.player_list()?))
    })
    .await;

    match result {
        Ok((player_count, players)) => {
            trace!(player_count, "roster read");
            let report = RosterReport {
                generation: ctx.generation,
                observed_revision,
                player_count,
                players,
            };
            if ctx.reports.send(report).is_err() {
                debug!("roster report dropped, coordinator gone");
            }
        }
        Err(e) => {
            warn!(error = %e, "roster refresh failed");
        }
    }
}

/// One drain cycle. Callbacks it triggers arrive through the native sink.
async fn drain_messages(ctx: &PollContext) {
    let result =
        call_blocking(&ctx.native, "process_messages", |n| n.process_messages())
            .await;
    match result {
        Ok(()) => trace!("messages drained"),
        Err(e) => warn!(error = %e, "message drain failed"),
    }
}
