//! The session store: one client's connection state, roster, and chat.
//!
//! # Concurrency note
//!
//! Unlike a single-task registry, the store is read from several places at
//! once: snapshot getters on the caller's thread, the poller checking which
//! revision it is about to report against, and the coordinator's event pump
//! applying changes. Everything sits behind one `std::sync::Mutex`. No
//! method holds the lock across an `.await` or a native call, so the lock
//! is only ever held for a few field updates.
//!
//! Status changes are also published on a `tokio::sync::watch` channel so
//! the poller can stop the moment the session leaves `Connected`.
//!
//! # Generations
//!
//! Every `begin_connecting()` and every `reset()` starts a new generation.
//! A poll report or callback tagged with an older generation belongs to a
//! session that no longer exists and is dropped by the caller.

use std::sync::{Mutex, MutexGuard, PoisonError};

use mpn_netplay_protocol::{
    ChatMessage, ConnectionStatus, Player, PlayerId, Role, RosterSnapshot,
};
use tokio::sync::watch;

use crate::host_code::generate_host_code_after;
use crate::{ChatLog, Roster, SessionError};

struct StoreInner {
    status: ConnectionStatus,
    role: Role,
    roster: Roster,
    /// Last count reported by the native layer (may lag the roster).
    player_count: usize,
    roster_revision: u64,
    chat: ChatLog,
    host_code: Option<String>,
    /// Issued for an attempt still `Connecting`; published on success.
    pending_host_code: Option<String>,
    /// The core reported the link lost before the attempt resolved.
    lost_while_connecting: bool,
    /// Kept across resets so the next hosting session never reuses it.
    last_host_code: Option<String>,
    generation: u64,
}

impl StoreInner {
    fn roster_snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            revision: self.roster_revision,
            player_count: self.player_count,
            players: self.roster.snapshot(),
        }
    }

    /// Bumps the revision after a roster mutation and returns the new view.
    fn roster_changed(&mut self) -> RosterSnapshot {
        self.roster_revision += 1;
        self.roster_snapshot()
    }
}

/// Thread-safe session state: status, role, roster, chat, and host code.
///
/// ## Lifecycle
///
/// ```text
///   Disconnected ──begin_connecting──→ Connecting ──finish_connecting──→ Connected
///        ↑                                 │                                │
///        └──────── abort_connecting ───────┘                           mark_lost
///        ↑                                                                  ↓
///        └──────────────────────── reset (from anywhere) ──────────────── Lost
/// ```
///
/// `Connecting` always belongs to one pending connect or host call, and
/// only that call resolves it. Anything else that happens in the meantime
/// (a `reset`, a reported link loss) is recorded so the pending call's
/// `finish_connecting` fails and the call cleans up.
///
/// ## Return values
///
/// Roster mutators return `Option<RosterSnapshot>`: `Some` only when the
/// roster actually changed, carrying the post-change snapshot with a fresh
/// revision. Callers publish exactly what they get back, so observers never
/// see an update for a no-op such as a duplicate join.
///
/// ## Snapshots
///
/// Getters hand out copies. A caller iterating [`roster`](Self::roster)
/// holds no lock and is unaffected by later mutation.
pub struct SessionStore {
    inner: Mutex<StoreInner>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            inner: Mutex::new(StoreInner {
                status: ConnectionStatus::Disconnected,
                role: Role::None,
                roster: Roster::new(),
                player_count: 0,
                roster_revision: 0,
                chat: ChatLog::new(),
                host_code: None,
                pending_host_code: None,
                lost_while_connecting: false,
                last_host_code: None,
                generation: 0,
            }),
            status_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_status(&self, inner: &mut StoreInner, status: ConnectionStatus) {
        if inner.status != status {
            tracing::debug!(from = %inner.status, to = %status, "status changed");
            inner.status = status;
            self.status_tx.send_replace(status);
        }
    }

    // -----------------------------------------------------------------------
    // Status and role
    // -----------------------------------------------------------------------

    /// Sets the status unconditionally.
    pub fn set_status(&self, status: ConnectionStatus) {
        let mut inner = self.lock();
        self.write_status(&mut inner, status);
    }

    /// Sets the role unconditionally.
    pub fn set_role(&self, role: Role) {
        self.lock().role = role;
    }

    /// Claims the lifecycle for a new connect or host attempt.
    ///
    /// Moves `Disconnected → Connecting` and returns the new generation.
    ///
    /// # Errors
    /// [`SessionError::Busy`] if the status is anything but `Disconnected`,
    /// including another attempt still `Connecting`.
    pub fn begin_connecting(&self) -> Result<u64, SessionError> {
        let mut inner = self.lock();
        if inner.status != ConnectionStatus::Disconnected {
            return Err(SessionError::Busy(inner.status));
        }
        inner.generation += 1;
        inner.lost_while_connecting = false;
        self.write_status(&mut inner, ConnectionStatus::Connecting);
        Ok(inner.generation)
    }

    /// Resolves a `Connecting` attempt to `Connected` with `role`.
    ///
    /// Returns `false` (and changes nothing) if the attempt was cut short:
    /// the generation moved on, the status left `Connecting`, or the core
    /// reported the link lost in the meantime. In the last case the status
    /// is still `Connecting` and the caller resolves it with
    /// [`abort_connecting`](Self::abort_connecting).
    ///
    /// A host code issued for this attempt becomes visible only here, and
    /// only when `role` is [`Role::Host`].
    pub fn finish_connecting(&self, generation: u64, role: Role) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation
            || inner.status != ConnectionStatus::Connecting
            || inner.lost_while_connecting
        {
            return false;
        }
        inner.role = role;
        let pending = inner.pending_host_code.take();
        if role == Role::Host {
            inner.host_code = pending;
        }
        self.write_status(&mut inner, ConnectionStatus::Connected);
        true
    }

    /// Resolves a failed `Connecting` attempt back to `Disconnected`.
    ///
    /// Roster and chat are left alone. Returns `false` if the attempt had
    /// already been cut short.
    pub fn abort_connecting(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation
            || inner.status != ConnectionStatus::Connecting
        {
            return false;
        }
        inner.role = Role::None;
        inner.host_code = None;
        inner.pending_host_code = None;
        inner.lost_while_connecting = false;
        self.write_status(&mut inner, ConnectionStatus::Disconnected);
        true
    }

    /// Forces `Lost`, keeping the role.
    ///
    /// Returns `false` if the store is `Disconnected` or already `Lost`.
    /// While `Connecting` the status is left alone and the loss is only
    /// recorded: the pending connect or host call then fails through
    /// [`finish_connecting`](Self::finish_connecting), so `Connecting`
    /// still resolves to `Disconnected` rather than getting stuck at `Lost`.
    pub fn mark_lost(&self) -> bool {
        let mut inner = self.lock();
        match inner.status {
            ConnectionStatus::Disconnected | ConnectionStatus::Lost => false,
            ConnectionStatus::Connecting => {
                inner.lost_while_connecting = true;
                false
            }
            _ => {
                self.write_status(&mut inner, ConnectionStatus::Lost);
                true
            }
        }
    }

    /// Returns everything to the initial state and starts a new generation.
    ///
    /// Status `Disconnected`, role `None`, empty roster and chat, no host
    /// code. Returns the status the store had before.
    pub fn reset(&self) -> ConnectionStatus {
        let mut inner = self.lock();
        let previous = inner.status;
        inner.generation += 1;
        inner.role = Role::None;
        inner.roster.clear();
        inner.player_count = 0;
        inner.roster_revision += 1;
        inner.chat.clear();
        inner.host_code = None;
        inner.pending_host_code = None;
        inner.lost_while_connecting = false;
        self.write_status(&mut inner, ConnectionStatus::Disconnected);
        previous
    }

    /// Returns `true` if `generation` is the live session's.
    pub fn is_current(&self, generation: u64) -> bool {
        let inner = self.lock();
        inner.generation == generation
            && inner.status != ConnectionStatus::Disconnected
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// Inserts or updates a player. Returns the new snapshot, or `None` if
    /// nothing changed.
    pub fn upsert_player(&self, player: Player) -> Option<RosterSnapshot> {
        let mut inner = self.lock();
        if !inner.roster.upsert(player) {
            return None;
        }
        inner.player_count = inner.roster.len();
        Some(inner.roster_changed())
    }

    /// Removes a player. Returns the new snapshot, or `None` if absent.
    pub fn remove_player(&self, id: PlayerId) -> Option<RosterSnapshot> {
        let mut inner = self.lock();
        if !inner.roster.remove(id) {
            return None;
        }
        inner.player_count = inner.roster.len();
        Some(inner.roster_changed())
    }

    /// Replaces the roster wholesale.
    pub fn replace_roster(&self, players: Vec<Player>) -> RosterSnapshot {
        let mut inner = self.lock();
        inner.roster.replace(players);
        inner.player_count = inner.roster.len();
        inner.roster_changed()
    }

    /// Applies a roster read from the native layer.
    ///
    /// Only replaces the roster when the count or the list differs from
    /// what is stored. Returns the new snapshot, or `None` if identical.
    pub fn refresh_roster(
        &self,
        player_count: usize,
        players: Vec<Player>,
    ) -> Option<RosterSnapshot> {
        let mut inner = self.lock();
        if inner.player_count == player_count && inner.roster.matches(&players)
        {
            return None;
        }
        inner.roster.replace(players);
        inner.player_count = player_count;
        Some(inner.roster_changed())
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    /// Appends a message. Returns `false` if it was a duplicate.
    pub fn append_chat(&self, message: ChatMessage) -> bool {
        self.lock().chat.push(message)
    }

    // -----------------------------------------------------------------------
    // Host code
    // -----------------------------------------------------------------------

    /// Allocates a host code for a new hosting session.
    ///
    /// Never returns the code issued to the previous hosting session. The
    /// code is held back until the attempt finishes as host, so
    /// [`host_code`](Self::host_code) stays `None` while `Connecting`.
    pub fn issue_host_code(&self) -> String {
        let mut inner = self.lock();
        let code = generate_host_code_after(inner.last_host_code.as_deref());
        inner.pending_host_code = Some(code.clone());
        inner.last_host_code = Some(code.clone());
        code
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    pub fn role(&self) -> Role {
        self.lock().role
    }

    /// Status and role read together.
    pub fn status_and_role(&self) -> (ConnectionStatus, Role) {
        let inner = self.lock();
        (inner.status, inner.role)
    }

    pub fn roster(&self) -> Vec<Player> {
        self.lock().roster.snapshot()
    }

    pub fn roster_snapshot(&self) -> RosterSnapshot {
        self.lock().roster_snapshot()
    }

    pub fn roster_revision(&self) -> u64 {
        self.lock().roster_revision
    }

    pub fn player_count(&self) -> usize {
        self.lock().player_count
    }

    pub fn chat(&self) -> Vec<ChatMessage> {
        self.lock().chat.snapshot()
    }

    /// The current host code. `None` unless role is `Host`.
    pub fn host_code(&self) -> Option<String> {
        self.lock().host_code.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Watches status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
