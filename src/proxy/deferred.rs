//! Background work that may outlive the response.

use std::future::Future;
use tokio::task::JoinHandle;

/// Tasks spawned while handling one request.
///
/// Cache writes and analytics updates are spawned onto the tokio runtime
/// as soon as they are known. The HTTP layer drops the handles once the
/// response is built, which detaches the tasks; tests call
/// [`Deferred::settle`] to wait for them.
#[derive(Debug, Default)]
pub struct Deferred {
    tasks: Vec<JoinHandle<()>>,
}

impl Deferred {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` immediately. Must be called inside a tokio runtime.
    pub fn spawn<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(work));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task. Panicked tasks are logged, not propagated.
    pub async fn settle(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!("Background task failed: {}", e);
            }
        }
    }

    /// Let the tasks run on without waiting for them.
    pub fn detach(self) {}
}
