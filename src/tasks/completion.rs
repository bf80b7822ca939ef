//! # Completion handle for callback bodies.
//!
//! A [`Completion`] is handed to every [`TaskBody::callback`](crate::TaskBody::callback)
//! invocation. Signalling it (once, by value) completes the invocation; dropping
//! it unsignalled resolves the invocation with [`TaskError::Abandoned`].
//!
//! ```rust
//! use std::time::Duration;
//! use taskrunner::TaskBody;
//!
//! let fetch = TaskBody::callback(|done| {
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         done.ok();
//!     });
//! });
//! # let _ = fetch;
//! ```

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::body::{IntoTaskResult, TaskResult};

/// One-shot completion signal for a callback body.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<TaskResult>,
    token: CancellationToken,
}

impl Completion {
    pub(crate) fn new(token: CancellationToken) -> (Self, oneshot::Receiver<TaskResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx, token }, rx)
    }

    /// Signals completion with the given result.
    ///
    /// Ignored if the invocation already ended (timeout or cancellation).
    pub fn complete(self, result: impl IntoTaskResult) {
        let _ = self.tx.send(result.into_task_result());
    }

    /// Signals success.
    pub fn ok(self) {
        self.complete(());
    }

    /// Signals failure with a message.
    pub fn fail(self, error: impl Into<String>) {
        self.complete(Err(TaskError::fail(error)));
    }

    /// True once the invocation was cancelled or timed out.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancellation token of this invocation.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
