//! `NetplayCoordinator` builder and connection lifecycle.
//!
//! This is the entry point for a NetPlay client. It ties together all the
//! layers: native boundary → session store → poller → lobby → events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use mpn_netplay_lobby::{
    spawn_browser, BrowserConfig, BrowserHandle, DiscoveryError, GameTitleCache,
    LobbyClient, LobbyConfig,
};
use mpn_netplay_native::{
    call_blocking, NativeError, NativeEventSink, NativeNetplay, SharedNative,
};
use mpn_netplay_poll::{BackgroundPoller, PollConfig};
use mpn_netplay_protocol::{
    ChatMessage, ConnectionStatus, EventTopic, LobbyServer, Player, PlayerId,
    Role, RoomVisibility, RosterSnapshot, SessionEvent,
};
use mpn_netplay_session::{
    chat_timestamp, NetplaySettings, SessionError, SessionStore,
};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::game::{self, GameValidation};
use crate::hub::{EventCallback, EventHub, SubscriptionId};
use crate::pump::{EventPump, PumpCommand, Shared};
use crate::{ConnectionError, Dispatcher, InlineDispatcher, NetplayError};

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a [`NetplayCoordinator`].
///
/// # Example
///
/// ```rust,ignore
/// use mpn_netplay::prelude::*;
///
/// let coordinator = NetplayCoordinator::builder()
///     .native(LoopbackNative::new())
///     .settings(NetplaySettings { username: "Mario".into(), ..Default::default() })
///     .build()
///     .await?;
/// coordinator.connect("127.0.0.1", 2626).await?;
/// ```
pub struct NetplayCoordinatorBuilder {
    native: Option<SharedNative>,
    settings: NetplaySettings,
    poll_config: PollConfig,
    lobby_config: LobbyConfig,
    dispatcher: Arc<dyn Dispatcher>,
    event_capacity: usize,
    title_cache: Option<Arc<dyn GameTitleCache>>,
}

impl NetplayCoordinatorBuilder {
    /// Creates a new builder with default settings and no native core.
    pub fn new() -> Self {
        Self {
            native: None,
            settings: NetplaySettings::default(),
            poll_config: PollConfig::default(),
            lobby_config: LobbyConfig::default(),
            dispatcher: Arc::new(InlineDispatcher),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            title_cache: None,
        }
    }

    /// Sets the native core. Required.
    pub fn native(mut self, native: impl NativeNetplay) -> Self {
        self.native = Some(Arc::new(native));
        self
    }

    /// Sets a native core that the caller keeps a handle to.
    pub fn shared_native(mut self, native: SharedNative) -> Self {
        self.native = Some(native);
        self
    }

    pub fn settings(mut self, settings: NetplaySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn poll_config(mut self, config: PollConfig) -> Self {
        self.poll_config = config;
        self
    }

    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.lobby_config = config;
        self
    }

    /// Where subscriber callbacks and `*_with` continuations run.
    /// Defaults to [`InlineDispatcher`].
    pub fn dispatcher(mut self, dispatcher: impl Dispatcher) -> Self {
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    /// How many events a slow [`NetplayCoordinator::events`] receiver may
    /// fall behind before it starts missing them.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Local game library used to name lobby games.
    pub fn title_cache(mut self, cache: Arc<dyn GameTitleCache>) -> Self {
        self.title_cache = Some(cache);
        self
    }

    /// Attaches to the native core and starts the event pump on the
    /// current runtime.
    ///
    /// # Errors
    /// - [`NetplayError::MissingNative`] if no native core was set
    /// - [`NetplayError::Discovery`] if the HTTP client can't be built
    pub async fn build(self) -> Result<NetplayCoordinator, NetplayError> {
        let native = self.native.ok_or(NetplayError::MissingNative)?;

        let mut lobby = LobbyClient::new(self.lobby_config)?;
        if let Some(cache) = self.title_cache {
            lobby = lobby.with_title_cache(cache);
        }

        let (sink, native_events) = NativeEventSink::channel();
        let (report_tx, reports) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown) = watch::channel(false);

        let store = Arc::new(SessionStore::new());
        let shared = Arc::new(Shared {
            poller: BackgroundPoller::new(
                Arc::clone(&native),
                Arc::clone(&store),
                report_tx,
            ),
            native,
            store,
            hub: EventHub::new(self.event_capacity, self.dispatcher),
        });

        shared.native.attach(sink);

        let pump = tokio::spawn(
            EventPump {
                shared: Arc::clone(&shared),
                native_events,
                reports,
                commands,
                shutdown,
            }
            .run(),
        );

        info!(username = %self.settings.username, "netplay coordinator started");

        Ok(NetplayCoordinator {
            inner: Arc::new(Inner {
                shared,
                lobby,
                settings: RwLock::new(self.settings),
                poll_config: self.poll_config,
                lifecycle: tokio::sync::Mutex::new(()),
                commands: commands_tx,
                shutdown: shutdown_tx,
                pump: Mutex::new(Some(pump)),
                closed: AtomicBool::new(false),
                runtime: Handle::current(),
            }),
        })
    }
}

impl Default for NetplayCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

struct Inner {
    shared: Arc<Shared>,
    lobby: LobbyClient,
    settings: RwLock<NetplaySettings>,
    poll_config: PollConfig,
    /// Held across native lifecycle calls so at most one is in flight.
    lifecycle: tokio::sync::Mutex<()>,
    commands: mpsc::UnboundedSender<PumpCommand>,
    shutdown: watch::Sender<bool>,
    pump: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    runtime: Handle,
}

/// The NetPlay connection orchestrator.
///
/// Owns the session store, the background poller, and the event pump.
/// Cheap to clone: every clone drives the same session. Construct one with
/// [`NetplayCoordinator::builder`] and pass it to whatever needs it.
#[derive(Clone)]
pub struct NetplayCoordinator {
    inner: Arc<Inner>,
}

impl NetplayCoordinator {
    /// Creates a new builder.
    pub fn builder() -> NetplayCoordinatorBuilder {
        NetplayCoordinatorBuilder::new()
    }

    fn store(&self) -> &SessionStore {
        &self.inner.shared.store
    }

    fn native(&self) -> &SharedNative {
        &self.inner.shared.native
    }

    fn publish(&self, event: SessionEvent) {
        self.inner.shared.hub.publish(event);
    }

    fn publish_status(&self) {
        let (status, role) = self.store().status_and_role();
        self.publish(SessionEvent::StatusChanged { status, role });
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Joins the session at `address:port` as a guest.
    ///
    /// On success the status is `Connected`, the role `Guest`, and the
    /// poller is running. On failure the status is back to `Disconnected`
    /// and roster and chat are untouched.
    ///
    /// # Errors
    /// - [`ConnectionError::Busy`] unless `Disconnected`
    /// - [`ConnectionError::Refused`] if the core refused or timed out
    /// - [`ConnectionError::NativeUnavailable`] if the library is missing
    /// - [`ConnectionError::Cancelled`] if `disconnect` cut the attempt short
    /// - [`ConnectionError::LostWhileConnecting`] if the core reported the
    ///   link lost before the attempt settled
    pub async fn connect(&self, address: &str, port: u16) -> Result<(), ConnectionError> {
        let generation = self.begin()?;
        info!(%address, port, "connecting");

        let _lifecycle = self.inner.lifecycle.lock().await;
        if !self.store().is_current(generation) {
            return Err(ConnectionError::Cancelled);
        }

        let target = address.to_string();
        let result = call_blocking(self.native(), "connect", move |n| {
            n.connect(&target, port)
        })
        .await;

        self.settle(generation, Role::Guest, result, || ConnectionError::Refused {
            address: address.to_string(),
            port,
        })
        .await
    }

    /// Starts hosting on `port` and returns the new host code.
    ///
    /// The code is fresh for every hosting session.
    ///
    /// # Errors
    /// Same as [`connect`](Self::connect), with
    /// [`ConnectionError::HostFailed`] in place of `Refused`.
    pub async fn host(&self, port: u16) -> Result<String, ConnectionError> {
        let generation = self.begin()?;
        let code = self.store().issue_host_code();
        info!(port, host_code = %code, "hosting");

        let _lifecycle = self.inner.lifecycle.lock().await;
        if !self.store().is_current(generation) {
            return Err(ConnectionError::Cancelled);
        }

        let result = call_blocking(self.native(), "host", move |n| n.host(port)).await;

        self.settle(generation, Role::Host, result, || ConnectionError::HostFailed { port })
            .await?;
        Ok(code)
    }

    /// Joins a server found through discovery.
    pub async fn connect_to_lobby_server(
        &self,
        server: &LobbyServer,
    ) -> Result<(), ConnectionError> {
        debug!(name = %server.name, game = %server.game_name, "joining lobby server");
        self.connect(&server.address, server.port).await
    }

    /// Claims the lifecycle for a new attempt.
    fn begin(&self) -> Result<u64, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::ShutDown);
        }
        let generation = self.store().begin_connecting().map_err(|e| match e {
            SessionError::Busy(status) => ConnectionError::Busy(status),
            _ => ConnectionError::Busy(self.store().status()),
        })?;
        self.publish_status();
        Ok(generation)
    }

    /// Resolves a `Connecting` attempt from the native call's outcome.
    async fn settle(
        &self,
        generation: u64,
        role: Role,
        result: Result<bool, NativeError>,
        refused: impl FnOnce() -> ConnectionError,
    ) -> Result<(), ConnectionError> {
        let err = match result {
            Ok(true) => {
                if self.store().finish_connecting(generation, role) {
                    self.inner.shared.poller.start(self.inner.poll_config.clone());
                    info!(%role, "connected");
                    self.publish_status();
                    return Ok(());
                }
                // Either disconnect() ran while the native call was in
                // flight, or the core lost the link before we could settle.
                // The core connected anyway, so undo it.
                info!("connection attempt cut short, closing native session");
                if let Err(e) =
                    call_blocking(self.native(), "disconnect", |n| n.disconnect()).await
                {
                    warn!(error = %e, "native disconnect failed");
                }
                if !self.store().abort_connecting(generation) {
                    return Err(ConnectionError::Cancelled);
                }
                ConnectionError::LostWhileConnecting
            }
            Ok(false) => refused(),
            Err(e) => ConnectionError::from(e),
        };

        warn!(error = %err, "connection attempt failed");
        if matches!(err, ConnectionError::LostWhileConnecting)
            || self.store().abort_connecting(generation)
        {
            self.publish_status();
            self.publish(SessionEvent::ConnectionFailed {
                reason: err.to_string(),
            });
        }
        Err(err)
    }

    /// Closes the session and clears roster, chat, and host code.
    ///
    /// Always ends `Disconnected` with role `None`, whatever the prior
    /// state. The native core is only told when a session was open or
    /// being opened.
    pub async fn disconnect(&self) {
        let previous = self.store().reset();
        self.inner.shared.poller.stop();

        if previous == ConnectionStatus::Disconnected {
            debug!("disconnect while disconnected");
            return;
        }

        self.publish_status();
        self.publish(SessionEvent::RosterUpdated(self.store().roster_snapshot()));

        let _lifecycle = self.inner.lifecycle.lock().await;
        if let Err(e) =
            call_blocking(self.native(), "disconnect", |n| n.disconnect()).await
        {
            warn!(error = %e, "native disconnect failed");
        }
        info!(?previous, "disconnected");
    }

    /// Background variant of [`connect`](Self::connect). `callback` runs
    /// through the dispatcher.
    pub fn connect_with<F>(&self, address: impl Into<String>, port: u16, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<(), ConnectionError>) + Send + 'static,
    {
        let this = self.clone();
        let address = address.into();
        self.inner.runtime.spawn(async move {
            let result = this.connect(&address, port).await;
            this.deliver(move || callback(result));
        })
    }

    /// Background variant of [`host`](Self::host).
    pub fn host_with<F>(&self, port: u16, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<String, ConnectionError>) + Send + 'static,
    {
        let this = self.clone();
        self.inner.runtime.spawn(async move {
            let result = this.host(port).await;
            this.deliver(move || callback(result));
        })
    }

    fn deliver(&self, task: impl FnOnce() + Send + 'static) {
        self.inner.shared.hub.dispatcher().dispatch(Box::new(task));
    }

    // -----------------------------------------------------------------------
    // Chat and moderation
    // -----------------------------------------------------------------------

    /// Sends a chat line and stores a local copy.
    ///
    /// The native core does not echo our own messages, so the local copy
    /// (sender = configured username) is what shows up in [`chat`](Self::chat).
    ///
    /// # Errors
    /// - [`SessionError::EmptyMessage`] for blank text
    /// - [`SessionError::NotConnected`] unless `Connected`
    /// - [`NetplayError::Native`] if the native send fails
    pub async fn send_chat(&self, text: &str) -> Result<(), NetplayError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage.into());
        }
        if self.is_closed() {
            return Err(NetplayError::ShutDown);
        }
        if self.store().status() != ConnectionStatus::Connected {
            return Err(SessionError::NotConnected.into());
        }

        let owned = text.to_string();
        call_blocking(self.native(), "send_message", move |n| n.send_message(&owned))
            .await?;

        let message = ChatMessage::new(self.username(), text, chat_timestamp());
        let (reply, stored) = oneshot::channel();
        self.inner
            .commands
            .send(PumpCommand::LocalChat { message, reply })
            .map_err(|_| NetplayError::ShutDown)?;
        if !stored.await.map_err(|_| NetplayError::ShutDown)? {
            debug!("local chat echo not stored");
        }
        Ok(())
    }

    /// Kicks a player. Returns `false` without calling the core unless
    /// hosting a connected session.
    pub async fn kick_player(&self, id: PlayerId) -> Result<bool, NetplayError> {
        if !self.is_connected_host() {
            debug!(player_id = %id, "kick ignored: not hosting");
            return Ok(false);
        }
        call_blocking(self.native(), "kick_player", move |n| n.kick_player(id)).await?;
        info!(player_id = %id, "player kicked");
        Ok(true)
    }

    /// Bans a player. Same rules as [`kick_player`](Self::kick_player).
    pub async fn ban_player(&self, id: PlayerId) -> Result<bool, NetplayError> {
        if !self.is_connected_host() {
            debug!(player_id = %id, "ban ignored: not hosting");
            return Ok(false);
        }
        call_blocking(self.native(), "ban_player", move |n| n.ban_player(id)).await?;
        info!(player_id = %id, "player banned");
        Ok(true)
    }

    /// Records the preferred room visibility and, when hosting a connected
    /// session, applies it. Returns whether the core was told.
    pub async fn set_room_visibility(
        &self,
        visibility: RoomVisibility,
    ) -> Result<bool, NetplayError> {
        self.update_settings(|s| s.room_visibility = visibility);
        if !self.is_connected_host() {
            debug!(?visibility, "room visibility saved for next host");
            return Ok(false);
        }
        call_blocking(self.native(), "set_room_visibility", move |n| {
            n.set_room_visibility(visibility)
        })
        .await?;
        info!(?visibility, "room visibility changed");
        Ok(true)
    }

    fn is_connected_host(&self) -> bool {
        self.store().status_and_role() == (ConnectionStatus::Connected, Role::Host)
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    /// Lists joinable lobby servers for the configured protocol tag.
    ///
    /// Never touches the session, so a failure here leaves an open
    /// connection alone.
    pub async fn discover_servers(&self) -> Result<Vec<LobbyServer>, DiscoveryError> {
        let tag = self.inner.lobby.config().protocol_tag.clone();
        self.inner.lobby.discover_servers(&tag).await
    }

    /// Background variant of [`discover_servers`](Self::discover_servers).
    pub fn discover_with<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Vec<LobbyServer>, DiscoveryError>) + Send + 'static,
    {
        let this = self.clone();
        self.inner.runtime.spawn(async move {
            let result = this.discover_servers().await;
            this.deliver(move || callback(result));
        })
    }

    /// Starts a lobby browser sharing this coordinator's lobby client.
    pub fn browse(&self, config: BrowserConfig) -> BrowserHandle {
        let _guard = self.inner.runtime.enter();
        spawn_browser(self.inner.lobby.clone(), config)
    }

    // -----------------------------------------------------------------------
    // Game
    // -----------------------------------------------------------------------

    /// Checks whether `path` can be played over NetPlay.
    pub async fn validate_game(&self, path: &str) -> GameValidation {
        game::validate(self.native(), path).await
    }

    /// Launches the game at `path` for the open session.
    ///
    /// # Errors
    /// - [`SessionError::NotConnected`] unless `Connected`
    /// - [`NetplayError::InvalidGame`] if the file fails validation or the
    ///   core declines to boot it
    pub async fn launch_game(&self, path: &str) -> Result<(), NetplayError> {
        if self.store().status() != ConnectionStatus::Connected {
            return Err(SessionError::NotConnected.into());
        }
        let validation = self.validate_game(path).await;
        if !validation.valid {
            return Err(NetplayError::InvalidGame(
                validation.error.unwrap_or_default(),
            ));
        }

        let owned = path.to_string();
        let launched =
            call_blocking(self.native(), "launch_game", move |n| n.launch_game(&owned))
                .await?;
        if !launched {
            return Err(NetplayError::InvalidGame("core refused to launch".into()));
        }
        info!(path, game_id = ?validation.game_id, "game launched");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    pub fn settings(&self) -> NetplaySettings {
        self.inner
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Edits the settings in place.
    pub fn update_settings(&self, f: impl FnOnce(&mut NetplaySettings)) {
        let mut settings = self
            .inner
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut settings);
    }

    /// The nickname used for local chat echo.
    pub fn username(&self) -> String {
        self.inner
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .username
            .clone()
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub fn status(&self) -> ConnectionStatus {
        self.store().status()
    }

    pub fn role(&self) -> Role {
        self.store().role()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn is_host(&self) -> bool {
        self.role() == Role::Host
    }

    pub fn roster(&self) -> Vec<Player> {
        self.store().roster()
    }

    pub fn roster_snapshot(&self) -> RosterSnapshot {
        self.store().roster_snapshot()
    }

    pub fn player_count(&self) -> usize {
        self.store().player_count()
    }

    pub fn chat(&self) -> Vec<ChatMessage> {
        self.store().chat()
    }

    /// The host code while hosting.
    pub fn host_code(&self) -> Option<String> {
        self.store().host_code()
    }

    /// Whether the background poller is running.
    pub fn is_polling(&self) -> bool {
        self.inner.shared.poller.is_running()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Registers `callback` for events on `topics`. It runs through the
    /// configured dispatcher.
    pub fn subscribe<F>(&self, topics: &[EventTopic], callback: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let callback: EventCallback = Arc::new(callback);
        self.inner.shared.hub.subscribe(topics, callback)
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.shared.hub.unsubscribe(id)
    }

    /// Receives every event published from now on.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.shared.hub.receiver()
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Disconnects, then stops the poller and the event pump.
    ///
    /// Afterwards lifecycle calls fail with `ShutDown` and snapshots stay
    /// at their reset values.
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.disconnect().await;
        self.inner.shutdown.send_replace(true);

        let pump = self
            .inner
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pump) = pump {
            if let Err(e) = pump.await {
                warn!(error = %e, "event pump ended abnormally");
            }
        }
        info!("netplay coordinator shut down");
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
