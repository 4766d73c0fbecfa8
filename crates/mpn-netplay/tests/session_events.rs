//! Roster, chat, moderation and native callbacks through the event pump.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mpn_netplay::native::NativeCall;
use mpn_netplay::prelude::*;
use mpn_netplay::session::SessionError;
use tokio::sync::broadcast;

// =========================================================================
// Helpers
// =========================================================================

async fn setup() -> (NetplayCoordinator, Arc<LoopbackNative>) {
    let native = Arc::new(LoopbackNative::new());
    let coordinator = NetplayCoordinator::builder()
        .shared_native(native.clone())
        .settings(NetplaySettings {
            username: "Mario".into(),
            ..Default::default()
        })
        .poll_config(PollConfig::default().without_jitter())
        .build()
        .await
        .unwrap();
    (coordinator, native)
}

async fn connected() -> (NetplayCoordinator, Arc<LoopbackNative>) {
    let (coordinator, native) = setup().await;
    coordinator.connect("127.0.0.1", 2626).await.unwrap();
    native.clear_calls();
    (coordinator, native)
}

async fn hosting() -> (NetplayCoordinator, Arc<LoopbackNative>) {
    let (coordinator, native) = setup().await;
    coordinator.host(2626).await.unwrap();
    native.clear_calls();
    (coordinator, native)
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn roster_updates(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::RosterUpdated(_)))
        .count()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

// =========================================================================
// Roster
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_player_joined_updates_roster_and_fires_once() {
    let (coordinator, native) = connected().await;
    let mut events = coordinator.events();

    native.player_joined(PlayerId(2), "Alice");
    // Several roster polls run in this window.
    tokio::time::sleep(Duration::from_millis(3500)).await;

    assert_eq!(
        coordinator.roster(),
        vec![Player {
            id: PlayerId(2),
            nickname: "Alice".into(),
            connected: true
        }]
    );
    let events = drain(&mut events);
    assert_eq!(roster_updates(&events), 1);
    assert!(events.contains(&SessionEvent::PlayerJoined(Player::new(PlayerId(2), "Alice"))));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_join_keeps_one_entry() {
    let (coordinator, native) = connected().await;
    let mut events = coordinator.events();

    native.player_joined(PlayerId(2), "Alice");
    native.emit(NativeEvent::PlayerJoined {
        id: PlayerId(2),
        nickname: "Alice".into(),
    });
    settle().await;

    assert_eq!(coordinator.roster().len(), 1);
    assert_eq!(roster_updates(&drain(&mut events)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_player_left_removes_and_publishes() {
    let (coordinator, native) = connected().await;
    native.player_joined(PlayerId(2), "Alice");
    native.player_joined(PlayerId(3), "Bob");
    settle().await;
    let mut events = coordinator.events();

    native.player_left(PlayerId(2));
    settle().await;

    assert_eq!(coordinator.roster(), vec![Player::new(PlayerId(3), "Bob")]);
    let events = drain(&mut events);
    assert_eq!(events[0], SessionEvent::PlayerLeft(PlayerId(2)));
    assert!(matches!(
        &events[1],
        SessionEvent::RosterUpdated(snapshot) if snapshot.player_count == 1
    ));
}

#[tokio::test(start_paused = true)]
async fn test_roster_poll_picks_up_silent_change() {
    let (coordinator, native) = connected().await;
    let mut events = coordinator.events();

    native.set_players(vec![Player::new(PlayerId(5), "Bob")]);
    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(coordinator.roster(), vec![Player::new(PlayerId(5), "Bob")]);
    assert_eq!(coordinator.player_count(), 1);
    assert_eq!(roster_updates(&drain(&mut events)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_roster_snapshots_are_monotonic() {
    let (coordinator, native) = connected().await;
    let mut events = coordinator.events();

    native.player_joined(PlayerId(2), "Alice");
    native.player_joined(PlayerId(3), "Bob");
    native.player_left(PlayerId(2));
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let revisions: Vec<u64> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::RosterUpdated(s) => Some(s.revision),
            _ => None,
        })
        .collect();
    assert_eq!(revisions.len(), 3);
    assert!(revisions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(coordinator.roster_snapshot().revision, revisions[2]);
}

#[tokio::test(start_paused = true)]
async fn test_poll_errors_do_not_stop_polling() {
    let (coordinator, native) = connected().await;
    native.set_fail_reads(true);
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(coordinator.is_polling());

    native.set_fail_reads(false);
    native.set_players(vec![Player::new(PlayerId(4), "Daisy")]);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(coordinator.roster(), vec![Player::new(PlayerId(4), "Daisy")]);
}

#[tokio::test(start_paused = true)]
async fn test_callbacks_after_disconnect_are_dropped() {
    let (coordinator, native) = connected().await;
    coordinator.disconnect().await;

    native.emit(NativeEvent::PlayerJoined {
        id: PlayerId(2),
        nickname: "Alice".into(),
    });
    native.message_received("Alice", "anyone?");
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(coordinator.roster().is_empty());
    assert!(coordinator.chat().is_empty());
}

// =========================================================================
// Chat
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_send_chat_appends_one_local_echo() {
    let (coordinator, native) = connected().await;
    let mut events = coordinator.events();

    coordinator.send_chat("hi").await.unwrap();

    let chat = coordinator.chat();
    assert_eq!(chat.len(), 1);
    assert_eq!(chat[0].sender, "Mario");
    assert_eq!(chat[0].text, "hi");
    assert_eq!(chat[0].timestamp.len(), "12:00:00".len());
    assert_eq!(native.calls(), vec![NativeCall::SendMessage("hi".into())]);
    assert_eq!(drain(&mut events), vec![SessionEvent::Chat(chat[0].clone())]);
}

#[tokio::test(start_paused = true)]
async fn test_send_chat_uses_updated_username() {
    let (coordinator, _native) = connected().await;
    coordinator.update_settings(|s| s.username = "Luigi".into());

    coordinator.send_chat("mamma mia").await.unwrap();

    assert_eq!(coordinator.chat()[0].sender, "Luigi");
}

#[tokio::test(start_paused = true)]
async fn test_send_chat_blank_is_rejected() {
    let (coordinator, native) = connected().await;

    let err = coordinator.send_chat("   ").await.unwrap_err();

    assert!(matches!(err, NetplayError::Session(SessionError::EmptyMessage)));
    assert!(native.calls().is_empty());
    assert!(coordinator.chat().is_empty());
}

#[tokio::test]
async fn test_send_chat_while_disconnected_is_rejected() {
    let (coordinator, native) = setup().await;

    let err = coordinator.send_chat("hi").await.unwrap_err();

    assert!(matches!(err, NetplayError::Session(SessionError::NotConnected)));
    assert_eq!(err.category(), ErrorCategory::Session);
    assert!(native.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_remote_chat_arrives_in_order() {
    let (coordinator, native) = connected().await;

    native.message_received("Luigi", "one");
    native.message_received("Peach", "two");
    native.message_received("Luigi", "three");
    settle().await;

    let texts: Vec<String> = coordinator.chat().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
}

#[tokio::test(start_paused = true)]
async fn test_queued_chat_delivered_by_drain_cycle() {
    let (coordinator, native) = connected().await;

    native.queue(NativeEvent::MessageReceived {
        sender: "Toad".into(),
        text: "queued".into(),
    });
    assert!(coordinator.chat().is_empty());
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(coordinator.chat()[0].text, "queued");
    assert!(native.drain_count() >= 1);
}

// =========================================================================
// Connection lost / native notices
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_connection_lost_keeps_role_and_stops_poller() {
    let (coordinator, native) = hosting().await;
    let mut events = coordinator.events();

    native.connection_lost();
    settle().await;

    assert_eq!(coordinator.status(), ConnectionStatus::Lost);
    assert_eq!(coordinator.role(), Role::Host);
    assert!(!coordinator.is_polling());
    assert_eq!(
        drain(&mut events),
        vec![SessionEvent::StatusChanged {
            status: ConnectionStatus::Lost,
            role: Role::Host
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_connection_lost_while_disconnected_is_ignored() {
    let (coordinator, native) = setup().await;
    let mut events = coordinator.events();

    native.connection_lost();
    settle().await;

    assert_eq!(coordinator.status(), ConnectionStatus::Disconnected);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_host_game_started_confirms_and_publishes() {
    let (coordinator, native) = connected().await;
    let mut events = coordinator.events();

    native.host_game_started();
    settle().await;

    assert_eq!(native.calls(), vec![NativeCall::SendGameStatus(true)]);
    assert_eq!(drain(&mut events), vec![SessionEvent::GameStarted]);
}

#[tokio::test(start_paused = true)]
async fn test_native_disconnected_is_informational() {
    let (coordinator, native) = connected().await;
    let mut events = coordinator.events();

    native.emit(NativeEvent::Disconnected);
    settle().await;

    assert_eq!(coordinator.status(), ConnectionStatus::Connected);
    assert_eq!(drain(&mut events), vec![SessionEvent::NativeDisconnected]);
}

#[tokio::test(start_paused = true)]
async fn test_native_connection_failure_while_connected_is_relayed() {
    let (coordinator, native) = connected().await;
    let mut events = coordinator.events();

    native.emit(NativeEvent::ConnectionFailed("desync".into()));
    settle().await;

    assert_eq!(
        drain(&mut events),
        vec![SessionEvent::ConnectionFailed {
            reason: "desync".into()
        }]
    );
}

// =========================================================================
// Moderation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_kick_as_guest_is_noop() {
    let (coordinator, native) = connected().await;
    native.player_joined(PlayerId(3), "Wario");
    settle().await;
    let before = coordinator.roster_snapshot();

    let issued = coordinator.kick_player(PlayerId(3)).await.unwrap();

    assert!(!issued);
    assert!(native.calls().is_empty());
    assert_eq!(coordinator.roster_snapshot(), before);
}

#[tokio::test]
async fn test_ban_while_disconnected_is_noop() {
    let (coordinator, native) = setup().await;

    assert!(!coordinator.ban_player(PlayerId(3)).await.unwrap());
    assert!(native.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_kick_and_ban_as_host_reach_native() {
    let (coordinator, native) = hosting().await;

    assert!(coordinator.kick_player(PlayerId(3)).await.unwrap());
    assert!(coordinator.ban_player(PlayerId(4)).await.unwrap());

    assert_eq!(
        native.calls(),
        vec![NativeCall::Kick(PlayerId(3)), NativeCall::Ban(PlayerId(4))]
    );
}

#[tokio::test(start_paused = true)]
async fn test_room_visibility_as_guest_is_saved_only() {
    let (coordinator, native) = connected().await;

    let applied = coordinator
        .set_room_visibility(RoomVisibility::Private)
        .await
        .unwrap();

    assert!(!applied);
    assert!(native.calls().is_empty());
    assert_eq!(coordinator.settings().room_visibility, RoomVisibility::Private);
}

#[tokio::test(start_paused = true)]
async fn test_room_visibility_as_host_forwards_ordinal() {
    let (coordinator, native) = hosting().await;

    let applied = coordinator
        .set_room_visibility(RoomVisibility::FriendsOnly)
        .await
        .unwrap();

    assert!(applied);
    assert_eq!(native.calls(), vec![NativeCall::SetRoomVisibility(2)]);
}

// =========================================================================
// Subscriptions
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_subscribe_filters_topics_and_uses_dispatcher() {
    let (dispatcher, mut queue) = QueueDispatcher::new();
    let native = Arc::new(LoopbackNative::new());
    let coordinator = NetplayCoordinator::builder()
        .shared_native(native.clone())
        .dispatcher(dispatcher)
        .poll_config(PollConfig::default().without_jitter())
        .build()
        .await
        .unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let id = coordinator.subscribe(&[EventTopic::Chat], move |e| {
        s.lock().unwrap().push(e.clone());
    });
    coordinator.connect("127.0.0.1", 2626).await.unwrap();

    native.player_joined(PlayerId(2), "Alice");
    native.message_received("Alice", "hey");
    settle().await;
    assert!(seen.lock().unwrap().is_empty());

    queue.run_pending();
    let seen_now = seen.lock().unwrap().clone();
    assert_eq!(seen_now.len(), 1);
    assert!(matches!(&seen_now[0], SessionEvent::Chat(m) if m.text == "hey"));

    assert!(coordinator.unsubscribe(id));
    native.message_received("Alice", "still there?");
    settle().await;
    queue.run_pending();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

// =========================================================================
// Game
// =========================================================================

#[tokio::test]
async fn test_validate_game_reports_checksum_and_id() {
    let (coordinator, native) = setup().await;
    native.add_game("/games/mkw.iso", "RMCP01", "9f2c1a");

    let validation = coordinator.validate_game("/games/mkw.iso").await;

    assert_eq!(
        validation,
        GameValidation {
            valid: true,
            checksum: Some("9f2c1a".into()),
            game_id: Some("RMCP01".into()),
            error: None,
        }
    );
}

#[tokio::test]
async fn test_validate_game_unknown_file_is_invalid() {
    let (coordinator, _) = setup().await;

    let validation = coordinator.validate_game("/games/missing.iso").await;

    assert!(!validation.valid);
    assert!(validation.error.is_some());
    assert_eq!(validation.checksum, None);
}

#[tokio::test]
async fn test_launch_game_requires_connection() {
    let (coordinator, native) = setup().await;
    native.add_game("/games/mkw.iso", "RMCP01", "9f2c1a");

    let err = coordinator.launch_game("/games/mkw.iso").await.unwrap_err();

    assert!(matches!(err, NetplayError::Session(SessionError::NotConnected)));
}

#[tokio::test(start_paused = true)]
async fn test_launch_game_invalid_file_is_rejected() {
    let (coordinator, native) = connected().await;

    let err = coordinator.launch_game("/games/missing.iso").await.unwrap_err();

    assert!(matches!(err, NetplayError::InvalidGame(_)));
    assert!(native.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_launch_game_valid_file_reaches_native() {
    let (coordinator, native) = connected().await;
    native.add_game("/games/mkw.iso", "RMCP01", "9f2c1a");

    coordinator.launch_game("/games/mkw.iso").await.unwrap();

    assert_eq!(
        native.calls(),
        vec![NativeCall::LaunchGame("/games/mkw.iso".into())]
    );
}
