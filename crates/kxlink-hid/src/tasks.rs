//! Session-owned task queue.
//!
//! Every delayed or periodic send runs under a child of one cancellation
//! token. Draining the queue cancels the token, so no queued frame can be
//! written after the session has released its transport.

use std::future::Future;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Default)]
pub(crate) struct TaskQueue {
    root: Mutex<CancellationToken>,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Spawn a task that stops at its next await once the queue is drained.
    /// The returned token cancels just this task.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn spawn<F>(&self, name: &'static str, task: F) -> CancellationToken
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.root.lock().child_token();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancelled.cancelled() => debug!(task = name, "Task cancelled"),
                () = task => debug!(task = name, "Task finished"),
            }
        });
        token
    }

    /// Run a future in place under the queue. Returns `None` if the queue
    /// was drained before it finished.
    pub(crate) async fn run<F: Future>(&self, task: F) -> Option<F::Output> {
        let token = self.root.lock().child_token();
        tokio::select! {
            biased;
            () = token.cancelled() => None,
            output = task => Some(output),
        }
    }

    /// Cancel every queued task and start a fresh generation.
    pub(crate) fn drain(&self) {
        let previous = std::mem::take(&mut *self.root.lock());
        previous.cancel();
    }
}
