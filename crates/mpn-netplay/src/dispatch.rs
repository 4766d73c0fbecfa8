//! Where callbacks run.
//!
//! Subscriber callbacks and `*_with` continuations are handed to a
//! [`Dispatcher`] instead of being called from whichever task produced
//! them. A UI that must only be touched from its own thread uses a
//! [`QueueDispatcher`] and drains the paired [`DispatchQueue`] from its
//! event loop.

use tokio::sync::mpsc;

/// A unit of work for a [`Dispatcher`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs callbacks on a chosen execution context.
pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, task: Task);
}

/// Runs every task immediately, on the calling task.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// Queues tasks for a [`DispatchQueue`] to run later.
#[derive(Debug, Clone)]
pub struct QueueDispatcher {
    sender: mpsc::UnboundedSender<Task>,
}

impl QueueDispatcher {
    /// Creates a dispatcher and the queue its tasks land on.
    pub fn new() -> (Self, DispatchQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, DispatchQueue { receiver })
    }
}

impl Dispatcher for QueueDispatcher {
    fn dispatch(&self, task: Task) {
        if self.sender.send(task).is_err() {
            tracing::debug!("dispatch queue dropped, task discarded");
        }
    }
}

/// The receiving end of a [`QueueDispatcher`].
///
/// Not tied to a runtime: `run_pending` can be called from any thread.
pub struct DispatchQueue {
    receiver: mpsc::UnboundedReceiver<Task>,
}

impl DispatchQueue {
    /// Runs every task queued so far, in order. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Waits for the next task and runs it. Returns `false` once every
    /// dispatcher is gone.
    pub async fn run_next(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue").finish_non_exhaustive()
    }
}
