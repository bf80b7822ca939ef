//! # LogWriter: event printer backed by `tracing`
//!
//! A minimal subscriber that turns every [`Event`] into a `tracing` record.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO taskrunner: starting task="build"
//! INFO taskrunner: finished task="build" elapsed=12.3ms
//! WARN taskrunner: finished with failure task="lint" elapsed=1.1ms reason="execution failed: lint"
//! WARN taskrunner: not found task="deploy" code=404
//! WARN taskrunner: timeout task="fetch" timeout_ms=500
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::TaskStarting => {
                tracing::info!(target: "taskrunner", task, "starting");
            }
            EventKind::TaskFinished => match e.reason.as_deref() {
                None => {
                    tracing::info!(target: "taskrunner", task, elapsed = ?e.elapsed, "finished")
                }
                Some(reason) => tracing::warn!(
                    target: "taskrunner",
                    task,
                    elapsed = ?e.elapsed,
                    reason,
                    "finished with failure"
                ),
            },
            EventKind::TaskNotFound => {
                tracing::warn!(target: "taskrunner", task, code = ?e.code, "not found");
            }
            EventKind::TimeoutHit => {
                tracing::warn!(target: "taskrunner", task, timeout_ms = ?e.timeout_ms, "timeout");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(
                    target: "taskrunner",
                    subscriber = task,
                    reason = ?e.reason,
                    "subscriber overflow"
                );
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(
                    target: "taskrunner",
                    subscriber = task,
                    reason = ?e.reason,
                    "subscriber panicked"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
