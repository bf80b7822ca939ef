//! # Lifecycle events emitted by the scheduler.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Task events**: invocation flow (starting, finished, not found, timeout)
//! - **Subscriber events**: delivery problems inside the subscriber fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id,
//! elapsed time and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskrunner::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFinished)
//!     .with_task("build")
//!     .with_elapsed(Duration::from_millis(12))
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFinished);
//! assert_eq!(ev.task.as_deref(), Some("build"));
//! assert_eq!(ev.elapsed, Some(Duration::from_millis(12)));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Status code carried by [`EventKind::TaskNotFound`].
pub const NOT_FOUND: u16 = 404;

/// Classification of scheduler events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task lifecycle events ===
    /// A task body is about to be invoked.
    ///
    /// Sets:
    /// - `task`: registry id, or the body's name for literal bodies
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TaskStarting,

    /// A task body signalled completion (success or failure).
    ///
    /// Sets:
    /// - `task`: same id as the matching `TaskStarting`
    /// - `elapsed`: monotonic time between start and completion
    /// - `reason`: failure message (only when the body failed)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TaskFinished,

    /// `run`/`start` (or a group child) referenced an unknown id.
    ///
    /// Sets:
    /// - `task`: the unresolved id
    /// - `code`: [`NOT_FOUND`]
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TaskNotFound,

    /// Invocation exceeded its timeout (always followed by `TaskFinished`).
    ///
    /// Sets:
    /// - `task`: task id
    /// - `timeout_ms`: configured timeout (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TimeoutHit,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Scheduler event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Task id (or subscriber name for subscriber events).
    pub task: Option<Arc<str>>,
    /// Time spent between `TaskStarting` and `TaskFinished`.
    pub elapsed: Option<Duration>,
    /// Status code (`404` for unknown ids).
    pub code: Option<u16>,
    /// Invocation timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            elapsed: None,
            code: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches the elapsed execution time.
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed = Some(d);
        self
    }

    /// Attaches a status code.
    #[inline]
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a `TaskNotFound` event for `id`.
    #[inline]
    pub fn not_found(id: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::TaskNotFound)
            .with_task(id)
            .with_code(NOT_FOUND)
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// Returns true for failed `TaskFinished` events.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self.kind, EventKind::TaskFinished) && self.reason.is_some()
    }
}
