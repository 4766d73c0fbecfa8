//! Event fan-out to UI collaborators.
//!
//! Two ways to listen: a `broadcast` receiver from [`EventHub::receiver`]
//! for async consumers, and topic-filtered callbacks registered with
//! [`EventHub::subscribe`] that run through the configured dispatcher.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mpn_netplay_protocol::{EventTopic, SessionEvent};
use tokio::sync::broadcast;

use crate::Dispatcher;

/// Identifies a callback registered with [`EventHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A subscriber callback.
pub type EventCallback = Arc<dyn Fn(&SessionEvent) + Send + Sync + 'static>;

struct Subscriber {
    topics: Vec<EventTopic>,
    callback: EventCallback,
}

pub(crate) struct EventHub {
    broadcast: broadcast::Sender<SessionEvent>,
    // BTreeMap keeps callbacks in subscription order.
    subscribers: Mutex<BTreeMap<SubscriptionId, Subscriber>>,
    next_id: AtomicU64,
    dispatcher: Arc<dyn Dispatcher>,
}

impl EventHub {
    pub(crate) fn new(capacity: usize, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let (broadcast, _) = broadcast::channel(capacity.max(1));
        Self {
            broadcast,
            subscribers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            dispatcher,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SubscriptionId, Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    pub(crate) fn receiver(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast.subscribe()
    }

    pub(crate) fn subscribe(
        &self,
        topics: &[EventTopic],
        callback: EventCallback,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(
            id,
            Subscriber {
                topics: topics.to_vec(),
                callback,
            },
        );
        tracing::debug!(?id, ?topics, "subscriber added");
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Sends `event` to the broadcast channel and to every callback
    /// subscribed to its topic.
    pub(crate) fn publish(&self, event: SessionEvent) {
        let topic = event.topic();
        let callbacks: Vec<EventCallback> = self
            .lock()
            .values()
            .filter(|s| s.topics.contains(&topic))
            .map(|s| Arc::clone(&s.callback))
            .collect();

        tracing::trace!(?topic, callbacks = callbacks.len(), "publishing event");

        for callback in callbacks {
            let event = event.clone();
            self.dispatcher
                .dispatch(Box::new(move || callback(&event)));
        }

        // No receivers is fine.
        let _ = self.broadcast.send(event);
    }
}
