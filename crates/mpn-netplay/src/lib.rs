//! # mpn-netplay
//!
//! Client-side NetPlay session coordinator.
//!
//! A [`NetplayCoordinator`] owns one client's NetPlay session: it drives
//! connect / host / disconnect against the native core, keeps the roster
//! and chat history, polls the core while connected, and discovers public
//! sessions through the lobby directory. UI code reads snapshots and
//! subscribes to [`SessionEvent`]s; it never touches the native core.
//!
//! ```text
//!   UI ──calls──→ NetplayCoordinator ──call_blocking──→ native core
//!    ↑                  │       ↑                            │
//!    │                  │       └── EventPump ←── callbacks ─┘
//!    └── Dispatcher ←── EventHub        ↑
//!                                BackgroundPoller
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mpn_netplay::prelude::*;
//!
//! # async fn run() -> Result<(), NetplayError> {
//! let coordinator = NetplayCoordinator::builder()
//!     .native(LoopbackNative::new())
//!     .build()
//!     .await?;
//!
//! coordinator.subscribe(&[EventTopic::Chat], |event| println!("{event:?}"));
//! coordinator.connect("127.0.0.1", DEFAULT_PORT).await?;
//! coordinator.send_chat("hi").await?;
//! coordinator.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod dispatch;
mod error;
mod game;
mod hub;
mod pump;

pub use coordinator::{
    NetplayCoordinator, NetplayCoordinatorBuilder, DEFAULT_EVENT_CAPACITY,
};
pub use dispatch::{DispatchQueue, Dispatcher, InlineDispatcher, QueueDispatcher, Task};
pub use error::{ConnectionError, ErrorCategory, NetplayError};
pub use game::GameValidation;
pub use hub::{EventCallback, SubscriptionId};

pub use mpn_netplay_lobby as lobby;
pub use mpn_netplay_native as native;
pub use mpn_netplay_poll as poll;
pub use mpn_netplay_protocol as protocol;
pub use mpn_netplay_session as session;

pub use mpn_netplay_protocol::{
    ChatMessage, ConnectionStatus, EventTopic, LobbyServer, Player, PlayerId,
    Role, RoomVisibility, RosterSnapshot, SessionEvent,
};

/// Everything a typical client needs.
pub mod prelude {
    pub use crate::{
        ConnectionError, DispatchQueue, Dispatcher, ErrorCategory,
        GameValidation, InlineDispatcher, NetplayCoordinator, NetplayError,
        QueueDispatcher, SubscriptionId,
    };
    pub use mpn_netplay_lobby::{
        BrowserConfig, BrowserHandle, BrowserUpdate, DiscoveryError, FilterSet,
        GameTitleCache, LobbyConfig, Visibility,
    };
    #[cfg(feature = "loopback")]
    pub use mpn_netplay_native::LoopbackNative;
    pub use mpn_netplay_native::{NativeEvent, NativeEventSink, NativeNetplay};
    pub use mpn_netplay_poll::PollConfig;
    pub use mpn_netplay_protocol::{
        ChatMessage, ConnectionStatus, EventTopic, LobbyServer, LobbySession,
        Player, PlayerId, Role, RoomVisibility, RosterSnapshot, SessionEvent,
    };
    pub use mpn_netplay_session::{ConnectionType, NetplaySettings, DEFAULT_PORT};
}
