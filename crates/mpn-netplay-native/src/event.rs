//! Native callbacks, and the sink that turns them into messages.

use mpn_netplay_protocol::PlayerId;
use tokio::sync::mpsc;

/// A callback raised by the native core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeEvent {
    Connected,
    ConnectionFailed(String),
    /// The core closed the session normally.
    Disconnected,
    /// The session dropped without a local disconnect.
    ConnectionLost,
    PlayerJoined { id: PlayerId, nickname: String },
    PlayerLeft(PlayerId),
    MessageReceived { sender: String, text: String },
    /// The host started the game.
    HostGameStarted,
}

/// Where the native core delivers callbacks.
///
/// Cheap to clone and safe to call from any thread. Sending never blocks;
/// if the coordinator is gone the event is dropped.
#[derive(Debug, Clone)]
pub struct NativeEventSink {
    sender: mpsc::UnboundedSender<NativeEvent>,
}

impl NativeEventSink {
    /// Creates a sink and the receiver the coordinator drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NativeEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Enqueues a callback. Returns `false` if nobody is listening.
    pub fn emit(&self, event: NativeEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(event = ?e.0, "native event dropped, receiver closed");
                false
            }
        }
    }

    /// Returns `true` once the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_delivers_in_order() {
        let (sink, mut rx) = NativeEventSink::channel();

        assert!(sink.emit(NativeEvent::Connected));
        assert!(sink.emit(NativeEvent::PlayerLeft(PlayerId(4))));

        assert_eq!(rx.try_recv().unwrap(), NativeEvent::Connected);
        assert_eq!(rx.try_recv().unwrap(), NativeEvent::PlayerLeft(PlayerId(4)));
    }

    #[test]
    fn test_emit_after_receiver_dropped_returns_false() {
        let (sink, rx) = NativeEventSink::channel();
        drop(rx);

        assert!(sink.is_closed());
        assert!(!sink.emit(NativeEvent::Disconnected));
    }

    #[test]
    fn test_emit_from_other_thread() {
        let (sink, mut rx) = NativeEventSink::channel();

        std::thread::spawn(move || {
            sink.emit(NativeEvent::HostGameStarted);
        })
        .join()
        .unwrap();

        assert_eq!(rx.try_recv().unwrap(), NativeEvent::HostGameStarted);
    }
}
