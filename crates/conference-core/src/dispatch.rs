//! Ordered dispatch of continuations and observer notifications
//!
//! Every result handed to a caller and every observer callback is posted onto
//! one [`EventQueue`]. A single task drains the queue and awaits each entry to
//! completion before starting the next, so delivery order equals enqueue
//! order no matter which thread produced the entry.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

type QueuedTask = BoxFuture<'static, ()>;

/// FIFO queue with a single consumer task
///
/// Cloning yields another producer handle onto the same queue. The consumer
/// stops once every handle has been dropped and the backlog is drained.
#[derive(Clone)]
pub struct EventQueue {
    name: &'static str,
    tx: mpsc::UnboundedSender<QueuedTask>,
}

impl EventQueue {
    /// Start a queue. Must be called from within a tokio runtime.
    pub fn new(name: &'static str) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedTask>();
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                // A panicking observer must not take the queue down with it.
                if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                    error!(queue = name, "Queued task panicked");
                }
            }
            debug!(queue = name, "Event queue stopped");
        });
        Self { name, tx }
    }

    /// Append a future to the queue
    pub fn post<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.tx.send(task.boxed()).is_err() {
            warn!(queue = self.name, "Event queue is closed, dropping task");
        }
    }

    /// Append a plain closure to the queue
    pub fn post_fn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post(async move { f() });
    }

    /// Wait until every task posted before this call has run
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.post_fn(move || {
            let _ = done_tx.send(());
        });
        let _ = done_rx.await;
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue").field("name", &self.name).finish()
    }
}
