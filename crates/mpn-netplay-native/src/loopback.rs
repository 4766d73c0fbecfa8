//! An in-process stand-in for the native NetPlay core.
//!
//! `LoopbackNative` keeps a player list, records every call that changes
//! session state, and lets the owner raise callbacks either immediately
//! (`player_joined`, `connection_lost`, ...) or on the next
//! `process_messages` drain (`queue`). Tests drive the coordinator with it;
//! the demo uses it when no real core is linked.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mpn_netplay_protocol::{Player, PlayerId, RoomVisibility};

use crate::{NativeError, NativeEvent, NativeEventSink, NativeNetplay};

/// A call the loopback core received. Roster reads and drains are counted,
/// not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    Connect { address: String, port: u16 },
    Host { port: u16 },
    Disconnect,
    SendMessage(String),
    Kick(PlayerId),
    Ban(PlayerId),
    SetRoomVisibility(i32),
    SendGameStatus(bool),
    LaunchGame(String),
}

#[derive(Debug, Clone)]
struct LoopbackGame {
    game_id: String,
    checksum: String,
}

struct LoopbackState {
    sink: Option<NativeEventSink>,
    calls: Vec<NativeCall>,
    players: Vec<Player>,
    pending: VecDeque<NativeEvent>,
    games: HashMap<String, LoopbackGame>,
    available: bool,
    accept: bool,
    fail_reads: bool,
    connect_delay: Duration,
    drains: u64,
    reads: u64,
}

/// In-process native core. See the module docs.
pub struct LoopbackNative {
    state: Mutex<LoopbackState>,
}

impl LoopbackNative {
    /// A linked core that accepts every connect and host.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoopbackState {
                sink: None,
                calls: Vec::new(),
                players: Vec::new(),
                pending: VecDeque::new(),
                games: HashMap::new(),
                available: true,
                accept: true,
                fail_reads: false,
                connect_delay: Duration::ZERO,
                drains: 0,
                reads: 0,
            }),
        }
    }

    /// A core whose entry points are missing.
    pub fn unavailable() -> Self {
        let native = Self::new();
        native.set_available(false);
        native
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Behaviour switches
    // -----------------------------------------------------------------------

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Whether `connect`/`host` succeed.
    pub fn set_accept(&self, accept: bool) {
        self.lock().accept = accept;
    }

    /// Makes `player_count`/`player_list` fail, as a flaky core would.
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Blocks `connect`/`host` for `delay` before answering.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.lock().connect_delay = delay;
    }

    /// Registers a game file for the validation calls.
    pub fn add_game(
        &self,
        path: impl Into<String>,
        game_id: impl Into<String>,
        checksum: impl Into<String>,
    ) {
        self.lock().games.insert(
            path.into(),
            LoopbackGame {
                game_id: game_id.into(),
                checksum: checksum.into(),
            },
        );
    }

    /// Replaces the player list without raising callbacks.
    pub fn set_players(&self, players: Vec<Player>) {
        self.lock().players = players;
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn calls(&self) -> Vec<NativeCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// How many times `process_messages` ran.
    pub fn drain_count(&self) -> u64 {
        self.lock().drains
    }

    /// How many times `player_list` ran.
    pub fn roster_read_count(&self) -> u64 {
        self.lock().reads
    }

    // -----------------------------------------------------------------------
    // Callback injection
    // -----------------------------------------------------------------------

    /// Raises a callback right away.
    pub fn emit(&self, event: NativeEvent) -> bool {
        let sink = self.lock().sink.clone();
        match sink {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }

    /// Holds a callback until the next `process_messages`.
    pub fn queue(&self, event: NativeEvent) {
        self.lock().pending.push_back(event);
    }

    /// Adds the player to the core's list and raises `PlayerJoined`.
    ///
    /// The list update and the callback happen under one lock, so a roster
    /// read never observes the callback without the player.
    pub fn player_joined(&self, id: PlayerId, nickname: &str) -> bool {
        let mut state = self.lock();
        state.players.retain(|p| p.id != id);
        state.players.push(Player::new(id, nickname));
        match &state.sink {
            Some(sink) => sink.emit(NativeEvent::PlayerJoined {
                id,
                nickname: nickname.to_string(),
            }),
            None => false,
        }
    }

    /// Removes the player from the core's list and raises `PlayerLeft`.
    pub fn player_left(&self, id: PlayerId) -> bool {
        let mut state = self.lock();
        state.players.retain(|p| p.id != id);
        match &state.sink {
            Some(sink) => sink.emit(NativeEvent::PlayerLeft(id)),
            None => false,
        }
    }

    pub fn message_received(&self, sender: &str, text: &str) -> bool {
        self.emit(NativeEvent::MessageReceived {
            sender: sender.to_string(),
            text: text.to_string(),
        })
    }

    pub fn connection_lost(&self) -> bool {
        self.emit(NativeEvent::ConnectionLost)
    }

    pub fn host_game_started(&self) -> bool {
        self.emit(NativeEvent::HostGameStarted)
    }

    fn open_session(&self, call: NativeCall) -> Result<bool, NativeError> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(call);
            if !state.available {
                return Err(NativeError::Unavailable(
                    "netplay core not linked".into(),
                ));
            }
            state.connect_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let state = self.lock();
        if state.accept {
            if let Some(sink) = &state.sink {
                sink.emit(NativeEvent::Connected);
            }
        }
        Ok(state.accept)
    }

    fn record(&self, call: NativeCall) -> Result<(), NativeError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.available {
            Ok(())
        } else {
            Err(NativeError::Unavailable("netplay core not linked".into()))
        }
    }

    fn read_guard(
        state: &LoopbackState,
        op: &'static str,
    ) -> Result<(), NativeError> {
        if !state.available {
            return Err(NativeError::Unavailable("netplay core not linked".into()));
        }
        if state.fail_reads {
            return Err(NativeError::Call {
                op,
                message: "core busy".into(),
            });
        }
        Ok(())
    }
}

impl Default for LoopbackNative {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeNetplay for LoopbackNative {
    fn attach(&self, sink: NativeEventSink) {
        self.lock().sink = Some(sink);
    }

    fn connect(&self, address: &str, port: u16) -> Result<bool, NativeError> {
        self.open_session(NativeCall::Connect {
            address: address.to_string(),
            port,
        })
    }

    fn host(&self, port: u16) -> Result<bool, NativeError> {
        self.open_session(NativeCall::Host { port })
    }

    fn disconnect(&self) -> Result<(), NativeError> {
        let mut state = self.lock();
        state.calls.push(NativeCall::Disconnect);
        state.players.clear();
        state.pending.clear();
        Ok(())
    }

    fn send_message(&self, text: &str) -> Result<(), NativeError> {
        self.record(NativeCall::SendMessage(text.to_string()))
    }

    fn kick_player(&self, id: PlayerId) -> Result<(), NativeError> {
        self.record(NativeCall::Kick(id))
    }

    fn ban_player(&self, id: PlayerId) -> Result<(), NativeError> {
        self.record(NativeCall::Ban(id))
    }

    fn set_room_visibility(
        &self,
        visibility: RoomVisibility,
    ) -> Result<(), NativeError> {
        self.record(NativeCall::SetRoomVisibility(visibility.ordinal()))
    }

    fn player_count(&self) -> Result<usize, NativeError> {
        let state = self.lock();
        Self::read_guard(&state, "player_count")?;
        Ok(state.players.len())
    }

    fn player_list(&self) -> Result<Vec<Player>, NativeError> {
        let mut state = self.lock();
        Self::read_guard(&state, "player_list")?;
        state.reads += 1;
        Ok(state.players.clone())
    }

    fn process_messages(&self) -> Result<(), NativeError> {
        let mut state = self.lock();
        if !state.available {
            return Err(NativeError::Unavailable("netplay core not linked".into()));
        }
        state.drains += 1;
        let pending: Vec<NativeEvent> = state.pending.drain(..).collect();
        if let Some(sink) = &state.sink {
            for event in pending {
                sink.emit(event);
            }
        }
        Ok(())
    }

    fn send_game_status(&self, same_game: bool) -> Result<(), NativeError> {
        self.record(NativeCall::SendGameStatus(same_game))
    }

    fn validate_game_file(&self, path: &str) -> Result<bool, NativeError> {
        Ok(self.lock().games.contains_key(path))
    }

    fn game_checksum(&self, path: &str) -> Result<String, NativeError> {
        self.lock()
            .games
            .get(path)
            .map(|g| g.checksum.clone())
            .ok_or_else(|| NativeError::Call {
                op: "game_checksum",
                message: format!("unknown game file {path}"),
            })
    }

    fn game_id(&self, path: &str) -> Result<String, NativeError> {
        self.lock()
            .games
            .get(path)
            .map(|g| g.game_id.clone())
            .ok_or_else(|| NativeError::Call {
                op: "game_id",
                message: format!("unknown game file {path}"),
            })
    }

    fn launch_game(&self, path: &str) -> Result<bool, NativeError> {
        let mut state = self.lock();
        state.calls.push(NativeCall::LaunchGame(path.to_string()));
        Ok(state.games.contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_records_call_and_accepts() {
        let native = LoopbackNative::new();

        assert_eq!(native.connect("10.0.0.2", 2626), Ok(true));
        assert_eq!(
            native.calls(),
            vec![NativeCall::Connect {
                address: "10.0.0.2".into(),
                port: 2626
            }]
        );
    }

    #[test]
    fn test_connect_refused_returns_false() {
        let native = LoopbackNative::new();
        native.set_accept(false);

        assert_eq!(native.host(2626), Ok(false));
    }

    #[test]
    fn test_unavailable_core_errors() {
        let native = LoopbackNative::unavailable();

        assert!(native.connect("h", 1).unwrap_err().is_unavailable());
        assert!(native.player_count().unwrap_err().is_unavailable());
    }

    #[test]
    fn test_player_joined_updates_list_and_emits() {
        let native = LoopbackNative::new();
        let (sink, mut rx) = NativeEventSink::channel();
        native.attach(sink);

        assert!(native.player_joined(PlayerId(2), "Alice"));

        assert_eq!(native.player_list().unwrap(), vec![Player::new(PlayerId(2), "Alice")]);
        assert_eq!(
            rx.try_recv().unwrap(),
            NativeEvent::PlayerJoined {
                id: PlayerId(2),
                nickname: "Alice".into()
            }
        );
    }

    #[test]
    fn test_queued_events_flush_on_process_messages() {
        let native = LoopbackNative::new();
        let (sink, mut rx) = NativeEventSink::channel();
        native.attach(sink);

        native.queue(NativeEvent::MessageReceived {
            sender: "Bob".into(),
            text: "gg".into(),
        });
        assert!(rx.try_recv().is_err());

        native.process_messages().unwrap();

        assert_eq!(native.drain_count(), 1);
        assert!(matches!(
            rx.try_recv().unwrap(),
            NativeEvent::MessageReceived { .. }
        ));
    }

    #[test]
    fn test_fail_reads_makes_roster_calls_fail() {
        let native = LoopbackNative::new();
        native.set_fail_reads(true);

        assert!(matches!(
            native.player_list(),
            Err(NativeError::Call { op: "player_list", .. })
        ));
    }

    #[test]
    fn test_game_lookup() {
        let native = LoopbackNative::new();
        native.add_game("/games/kart.rvz", "RMCP01", "abc123");

        assert_eq!(native.validate_game_file("/games/kart.rvz"), Ok(true));
        assert_eq!(native.validate_game_file("/games/none.rvz"), Ok(false));
        assert_eq!(native.game_id("/games/kart.rvz").unwrap(), "RMCP01");
        assert!(native.game_checksum("/games/none.rvz").is_err());
    }
}
