//! Store invariants under many writers and long mutation sequences.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use mpn_netplay_protocol::{ChatMessage, ConnectionStatus, Player, PlayerId, Role};
use mpn_netplay_session::{SessionStore, CHAT_CAPACITY};

// =========================================================================
// Roster
// =========================================================================

#[test]
fn test_concurrent_upserts_keep_one_entry_per_id() {
    let store = Arc::new(SessionStore::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..200u32 {
                    let id = PlayerId(i % 10);
                    store.upsert_player(Player::new(id, format!("p{}-{t}", id.0)));
                    if i % 7 == 0 {
                        store.remove_player(PlayerId((i + t) % 10));
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let roster = store.roster();
    let ids: HashSet<PlayerId> = roster.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), roster.len(), "duplicate ids in {roster:?}");
}

#[test]
fn test_roster_revision_strictly_increases_across_threads() {
    let store = Arc::new(SessionStore::new());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut last = 0;
                for i in 0..100u32 {
                    let snap = store.replace_roster(vec![Player::new(
                        PlayerId(t * 1000 + i),
                        "x",
                    )]);
                    assert!(snap.revision > last);
                    last = snap.revision;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.roster_revision(), 400);
}

// =========================================================================
// Chat
// =========================================================================

#[test]
fn test_chat_never_exceeds_capacity_with_duplicates_mixed_in() {
    let store = Arc::new(SessionStore::new());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..150 {
                    let msg = ChatMessage::new(format!("s{t}"), format!("m{i}"), "10:00:00");
                    store.append_chat(msg.clone());
                    // Duplicate delivery from the native layer.
                    assert!(!store.append_chat(msg));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let chat = store.chat();
    assert_eq!(chat.len(), CHAT_CAPACITY);
    let unique: HashSet<&ChatMessage> = chat.iter().collect();
    assert_eq!(unique.len(), chat.len());
}

// =========================================================================
// Lifecycle
// =========================================================================

#[test]
fn test_only_one_thread_wins_begin_connecting() {
    let store = Arc::new(SessionStore::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.begin_connecting().is_ok())
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();

    assert_eq!(winners, 1);
    assert_eq!(store.status(), ConnectionStatus::Connecting);
}

#[test]
fn test_reset_from_every_state_is_total() {
    for setup in 0..4 {
        let store = SessionStore::new();
        match setup {
            0 => {}
            1 => {
                store.begin_connecting().unwrap();
            }
            2 => {
                let g = store.begin_connecting().unwrap();
                store.finish_connecting(g, Role::Host);
                store.issue_host_code();
            }
            _ => {
                let g = store.begin_connecting().unwrap();
                store.finish_connecting(g, Role::Guest);
                store.mark_lost();
            }
        }
        store.upsert_player(Player::new(PlayerId(1), "a"));
        store.append_chat(ChatMessage::new("a", "b", "c"));

        store.reset();

        assert_eq!(store.status(), ConnectionStatus::Disconnected);
        assert_eq!(store.role(), Role::None);
        assert!(store.roster().is_empty());
        assert!(store.chat().is_empty());
        assert_eq!(store.host_code(), None);
    }
}

#[test]
fn test_set_status_and_role_are_total_and_announce_changes() {
    let store = SessionStore::new();
    let mut status_rx = store.subscribe_status();

    store.set_status(ConnectionStatus::Lost);
    store.set_role(Role::Host);

    assert!(status_rx.has_changed().unwrap());
    assert_eq!(*status_rx.borrow_and_update(), ConnectionStatus::Lost);
    assert_eq!(store.status_and_role(), (ConnectionStatus::Lost, Role::Host));

    // Same value again is not a change.
    store.set_status(ConnectionStatus::Lost);
    assert!(!status_rx.has_changed().unwrap());
}
