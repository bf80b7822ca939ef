//! # Task bodies and the running guard.
//!
//! A [`TaskBody`] is the unit of work the scheduler invokes. Its calling
//! convention is chosen once, at construction:
//!
//! | constructor               | contract                                        |
//! |---------------------------|-------------------------------------------------|
//! | [`TaskBody::sync`]        | `Fn() -> R`, completes on return                |
//! | [`TaskBody::callback`]    | `Fn(Completion)`, completes when signalled      |
//! | [`TaskBody::future`]      | `Fn(CancellationToken) -> Fut`, completes on `Fut` |
//! | `Scheduler::parallel/serial` | group of other bodies                        |
//!
//! ## Running guard
//! Every body carries one guard shared by all of its clones. Registering the
//! same body under two ids, or referencing it from a group, still yields a single
//! guard: at most one in-flight invocation per body.
//!
//! ```text
//! TaskBody (clone) ─┐
//! TaskBody (clone) ─┼──► Arc<Shared { kind, running: AtomicBool }>
//! registry entry  ──┘
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::core::Group;
use crate::error::TaskError;
use crate::tasks::completion::Completion;

/// Result carried by every completion signal.
pub type TaskResult = Result<(), TaskError>;

/// Name reported for literal bodies that were never named.
pub const ANONYMOUS: &str = "anonymous";

/// Conversion of a task's return value into a [`TaskResult`].
///
/// - `()` and `true` are success;
/// - `false` is failure;
/// - `Result<(), TaskError>` passes through.
pub trait IntoTaskResult {
    fn into_task_result(self) -> TaskResult;
}

impl IntoTaskResult for () {
    fn into_task_result(self) -> TaskResult {
        Ok(())
    }
}

impl IntoTaskResult for bool {
    fn into_task_result(self) -> TaskResult {
        if self {
            Ok(())
        } else {
            Err(TaskError::fail("task returned false"))
        }
    }
}

impl IntoTaskResult for TaskResult {
    fn into_task_result(self) -> TaskResult {
        self
    }
}

type SyncFn = dyn Fn() -> TaskResult + Send + Sync;
type CallbackFn = dyn Fn(Completion) + Send + Sync;
type FutureFn = dyn Fn(CancellationToken) -> BoxFuture<'static, TaskResult> + Send + Sync;

/// Calling convention of a body.
pub(crate) enum BodyKind {
    Sync(Box<SyncFn>),
    Callback(Box<CallbackFn>),
    Future(Box<FutureFn>),
    Group(Group),
}

struct Shared {
    kind: BodyKind,
    running: AtomicBool,
}

/// Shared handle to a unit of work.
///
/// Cheap to clone; clones share the calling convention and the running guard.
/// Name and timeout are per-handle settings.
#[derive(Clone)]
pub struct TaskBody {
    name: Cow<'static, str>,
    timeout: Option<Duration>,
    shared: Arc<Shared>,
}

impl TaskBody {
    fn from_kind(kind: BodyKind) -> Self {
        Self {
            name: Cow::Borrowed(ANONYMOUS),
            timeout: None,
            shared: Arc::new(Shared {
                kind,
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Synchronous body: completes as soon as `f` returns.
    ///
    /// ## Example
    /// ```rust
    /// use taskrunner::TaskBody;
    ///
    /// let ok = TaskBody::sync(|| {});
    /// let failing = TaskBody::sync(|| false);
    /// assert!(!ok.is_running());
    /// # let _ = failing;
    /// ```
    pub fn sync<F, R>(f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoTaskResult,
    {
        Self::from_kind(BodyKind::Sync(Box::new(move || f().into_task_result())))
    }

    /// Continuation body: completes when the [`Completion`] passed to `f` is signalled.
    ///
    /// `f` is expected to return promptly and signal later (e.g. from a spawned task).
    /// Dropping the completion without signalling resolves the invocation with
    /// [`TaskError::Abandoned`].
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Completion) + Send + Sync + 'static,
    {
        Self::from_kind(BodyKind::Callback(Box::new(f)))
    }

    /// Future body: a fresh future is created per invocation.
    ///
    /// The token is cancelled on timeout, on scheduler shutdown and when a
    /// fail-fast group aborts its remaining children.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoTaskResult,
    {
        Self::from_kind(BodyKind::Future(Box::new(move |ctx| {
            let fut = f(ctx);
            async move { fut.await.into_task_result() }.boxed()
        })))
    }

    pub(crate) fn group(name: &'static str, group: Group) -> Self {
        Self::from_kind(BodyKind::Group(group)).named(name)
    }

    /// Sets the name reported in events when the body is run as a literal.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a per-invocation timeout (overrides the scheduler default; zero disables).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the body's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the per-body timeout, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// True while an invocation of this body is in flight.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// True if both handles refer to the same body (and therefore the same guard).
    pub fn ptr_eq(&self, other: &TaskBody) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn kind(&self) -> &BodyKind {
        &self.shared.kind
    }

    /// Atomically moves the body from idle to running.
    ///
    /// Returns `None` if an invocation is already in flight.
    pub(crate) fn try_acquire(&self) -> Option<RunGuard> {
        self.shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                shared: Arc::clone(&self.shared),
            })
    }
}

impl fmt::Debug for TaskBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind() {
            BodyKind::Sync(_) => "sync",
            BodyKind::Callback(_) => "callback",
            BodyKind::Future(_) => "future",
            BodyKind::Group(_) => "group",
        };
        f.debug_struct("TaskBody")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("timeout", &self.timeout)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Holds a body in the running state; released on drop (including unwinding).
pub(crate) struct RunGuard {
    shared: Arc<Shared>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
    }
}
