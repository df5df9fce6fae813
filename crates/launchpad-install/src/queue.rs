//! Background task queue for pipelines.
//!
//! Work runs on the Tokio runtime, never on the caller. There is no ordering
//! between submissions and any number may run at once. A panic inside a task
//! is contained to that task: it is logged and reported to the submitter's
//! `on_panic` hook, which the orchestrator uses to mark the entity `Failed`.

use std::any::Any;
use std::future::Future;

use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct TaskQueue {
    tracker: TaskTracker,
    runtime: Handle,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl TaskQueue {
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            tracker: TaskTracker::new(),
            runtime,
        }
    }

    /// Queue bound to the runtime of the calling context.
    ///
    /// Panics outside a Tokio runtime, like `tokio::spawn`.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Enqueue `work` and return immediately.
    ///
    /// If `work` panics, the panic is logged and `on_panic` runs with the
    /// panic message.
    pub fn submit<F, P>(&self, label: impl Into<String>, work: F, on_panic: P)
    where
        F: Future<Output = ()> + Send + 'static,
        P: FnOnce(String) + Send + 'static,
    {
        let label = label.into();
        let task = self.runtime.spawn(work);
        self.tracker.spawn_on(
            async move {
                match task.await {
                    Ok(()) => debug!(task = %label, "task finished"),
                    Err(e) if e.is_panic() => {
                        let message = panic_message(e.into_panic().as_ref());
                        error!(task = %label, panic = %message, "task panicked");
                        on_panic(message);
                    }
                    Err(e) => debug!(task = %label, error = %e, "task aborted"),
                }
            },
            &self.runtime,
        );
    }

    /// Number of submitted tasks still running.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait until every task submitted so far has finished.
    ///
    /// Tasks submitted by running tasks while draining are waited for too.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
