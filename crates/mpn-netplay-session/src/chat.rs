//! Bounded, deduplicated chat history.

use std::collections::VecDeque;

use mpn_netplay_protocol::ChatMessage;

/// Most messages the log keeps. The oldest is evicted first.
pub const CHAT_CAPACITY: usize = 100;

/// A FIFO ring of chat messages.
///
/// The native layer sometimes delivers the same message twice, so a
/// message equal in sender, text, and timestamp to one already stored is
/// rejected.
#[derive(Debug, Clone)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::with_capacity(CHAT_CAPACITY)
    }

    /// A log holding at most `capacity` messages (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `message`, evicting the oldest if full.
    ///
    /// Returns `false` and leaves the log untouched if the message is a
    /// duplicate.
    pub fn push(&mut self, message: ChatMessage) -> bool {
        if self.messages.contains(&message) {
            return false;
        }
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
        true
    }

    /// Copy of the log, oldest first.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Local wall-clock time as `HH:MM:SS`, the format chat lines carry.
pub fn chat_timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
