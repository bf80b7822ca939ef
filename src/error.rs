//! Error types used by the scheduler and by task completions.
//!
//! This module defines two main error enums:
//!
//! - [`ValidationError`]: contract violations by the caller (bad arguments to
//!   `register` / `run`). Returned as `Err`, never published as events.
//! - [`TaskError`]: failures carried by a task's completion signal.
//!
//! Runtime conditions such as "unknown task id" or "task already running" are
//! **not** errors: they are reported as "not started" (`Ok(None)` / `Ok(false)`).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Contract violations detected at the scheduler surface.
///
/// These are programmer errors: the call is rejected before anything is
/// registered, resolved or published.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Task identifiers must be non-empty.
    #[error("task id must be a non-empty string")]
    EmptyId,
}

impl ValidationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskrunner::ValidationError;
    ///
    /// assert_eq!(ValidationError::EmptyId.as_label(), "validation_empty_id");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ValidationError::EmptyId => "validation_empty_id",
        }
    }
}

/// # Errors carried by a task's completion.
///
/// The scheduler never inspects or retries these; they are forwarded verbatim
/// to whoever awaits the invocation.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task body reported failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Invocation exceeded its timeout duration.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Invocation was cancelled (scheduler shutdown or fail-fast sibling).
    #[error("context cancelled")]
    Canceled,

    /// A callback task dropped its completion handle without completing.
    #[error("completion dropped without a result")]
    Abandoned,

    /// A group child referenced an id with no registration.
    #[error("task not found: {id}")]
    NotFound {
        /// The unresolved id.
        id: String,
    },

    /// One or more children of a best-effort group failed.
    #[error("children failed: {failed:?}")]
    ChildrenFailed {
        /// Ids of the failed children, in group order.
        failed: Vec<String>,
    },

    /// The task body panicked.
    #[error("task panicked: {reason}")]
    Panicked {
        /// Panic payload rendered as text.
        reason: String,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskrunner::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Canceled => "task_canceled",
            TaskError::Abandoned => "task_abandoned",
            TaskError::NotFound { .. } => "task_not_found",
            TaskError::ChildrenFailed { .. } => "task_children_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            TaskError::Canceled => "context cancelled".to_string(),
            TaskError::Abandoned => "completion abandoned".to_string(),
            TaskError::NotFound { id } => format!("not found: {id}"),
            TaskError::ChildrenFailed { failed } => format!("failed children: {failed:?}"),
            TaskError::Panicked { reason } => format!("panic: {reason}"),
        }
    }

    /// Renders a panic payload caught by `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let reason = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        TaskError::Panicked { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(TaskError::fail("x").as_label(), "task_failed");
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
        assert_eq!(TaskError::Abandoned.as_label(), "task_abandoned");
        assert_eq!(
            TaskError::ChildrenFailed { failed: vec![] }.as_label(),
            "task_children_failed"
        );
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let err = TaskError::from_panic(Box::new("boom"));
        assert_eq!(
            err,
            TaskError::Panicked {
                reason: "boom".into()
            }
        );

        let err = TaskError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.as_message(), "panic: owned");

        let err = TaskError::from_panic(Box::new(42u8));
        assert_eq!(err.as_message(), "panic: unknown panic");
    }

    #[test]
    fn display_includes_details() {
        let err = TaskError::NotFound { id: "lint".into() };
        assert_eq!(err.to_string(), "task not found: lint");
        assert_eq!(ValidationError::EmptyId.to_string(), "task id must be a non-empty string");
    }
}
