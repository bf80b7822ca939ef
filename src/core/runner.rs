//! # Execution wrapper: one guarded invocation of a task body.
//!
//! Splits an invocation into two phases so callers learn synchronously whether
//! the invocation was accepted. [`drive`] then polls the completion once on the
//! caller's stack, so the body is called before `run` returns and a sync body has
//! already finished:
//!
//! ```text
//! begin():    guard CAS ──✗──► None (no events, body not called)
//!                │✓
//!                ├─► start instant, child token
//!                └─► publish TaskStarting
//!
//! complete(): dispatch by body kind ──┬─ Sync      → call, result immediately
//!             (timeout / cancel /     ├─ Callback  → await Completion
//!              panic isolation)       ├─ Future    → await future
//!                                     └─ Group     → parallel / serial fan-out
//!                ├─► release guard
//!                ├─► publish TaskFinished { elapsed, reason? }
//!                └─► return TaskResult
//! ```
//!
//! ## Rules
//! - `TaskStarting` / `TaskFinished` are published in pairs, only for accepted invocations
//! - `TimeoutHit` is published **in addition to** `TaskFinished` on timeout
//! - Each invocation derives a **child token** (isolated cancellation)
//! - The guard is released before `TaskFinished`, so listeners may re-run the task
//! - Only an invocation still pending after its first poll is handed to the runtime

use std::future::{self, Future};
use std::panic::AssertUnwindSafe;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::scheduler::Core;
use crate::error::TaskError;
use crate::events::{Event, EventKind};
use crate::tasks::{BodyKind, Completion, RunGuard, TaskBody, TaskResult};

/// An invocation that passed the guard and is ready to be driven.
pub(crate) struct Started {
    id: Arc<str>,
    body: TaskBody,
    guard: RunGuard,
    token: CancellationToken,
    at: Instant,
}

impl Started {
    pub fn id(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }
}

/// Claims `body` and publishes `TaskStarting`.
///
/// Returns `None` without side effects if the body is already running.
pub(crate) fn begin(
    core: &Core,
    id: Arc<str>,
    body: TaskBody,
    parent: &CancellationToken,
) -> Option<Started> {
    let Some(guard) = body.try_acquire() else {
        tracing::debug!(task = %id, "already running; invocation rejected");
        return None;
    };
    let at = Instant::now();
    let token = parent.child_token();

    core.bus
        .publish(Event::new(EventKind::TaskStarting).with_task(Arc::clone(&id)));

    Some(Started {
        id,
        body,
        guard,
        token,
        at,
    })
}

/// Outcome of the inline first poll of an invocation.
pub(crate) enum Driven {
    /// Finished on the caller's stack (`TaskFinished` already published).
    Ready(TaskResult),
    /// Waiting on a continuation, a future or group children; spawn the rest.
    Pending(BoxFuture<'static, TaskResult>),
}

/// Polls the completion of `started` once, inline.
///
/// Must be called within a tokio runtime (timers are registered on first poll).
pub(crate) fn drive(core: &Arc<Core>, started: Started) -> Driven {
    let core = Arc::clone(core);
    let mut fut = async move { complete(&core, started).await }.boxed();
    match (&mut fut).now_or_never() {
        Some(res) => Driven::Ready(res),
        None => Driven::Pending(fut),
    }
}

/// Drives a started invocation to completion and publishes `TaskFinished`.
///
/// ### Timeout behavior
/// The body's own timeout wins over `SchedulerConfig::timeout`; zero disables it.
/// On timeout the invocation token is cancelled and `TimeoutHit` is published.
///
/// ### Cancellation semantics
/// If the invocation token is cancelled (shutdown, fail-fast sibling, enclosing
/// group cancelled) the result is [`TaskError::Canceled`].
pub(crate) async fn complete(core: &Core, started: Started) -> TaskResult {
    let Started {
        id,
        body,
        guard,
        token,
        at,
    } = started;

    let timeout = body
        .timeout()
        .or_else(|| core.cfg.default_timeout())
        .filter(|d| *d > Duration::ZERO);

    let work = AssertUnwindSafe(dispatch(&body, token.clone()))
        .catch_unwind()
        .map(|res| res.unwrap_or_else(|panic| Err(TaskError::from_panic(panic))));
    let mut work = pin!(work);

    let deadline = async move {
        match timeout {
            Some(dur) => {
                time::sleep(dur).await;
                dur
            }
            None => future::pending().await,
        }
    };

    let res = tokio::select! {
        biased;
        r = &mut work => r,
        _ = token.cancelled() => {
            settle(&body, work.as_mut()).await;
            Err(TaskError::Canceled)
        }
        dur = deadline => {
            token.cancel();
            core.bus.publish(
                Event::new(EventKind::TimeoutHit)
                    .with_task(Arc::clone(&id))
                    .with_timeout(dur),
            );
            settle(&body, work.as_mut()).await;
            Err(TaskError::Timeout { timeout: dur })
        }
    };

    drop(guard);
    let elapsed = at.elapsed();

    let mut ev = Event::new(EventKind::TaskFinished)
        .with_task(id)
        .with_elapsed(elapsed);
    if let Err(e) = &res {
        ev = ev.with_reason(e.to_string());
    }
    core.bus.publish(ev);

    res
}

/// Drives a cancelled group until its children have published `TaskFinished`.
///
/// Other kinds are dropped as-is: a late completion signal is ignored.
async fn settle<F>(body: &TaskBody, work: Pin<&mut F>)
where
    F: Future<Output = TaskResult>,
{
    if matches!(body.kind(), BodyKind::Group(_)) {
        let _ = work.await;
    }
}

/// Invokes the body according to its calling convention.
async fn dispatch(body: &TaskBody, token: CancellationToken) -> TaskResult {
    match body.kind() {
        BodyKind::Sync(f) => f(),
        BodyKind::Callback(f) => {
            let (completion, rx) = Completion::new(token);
            f(completion);
            rx.await.unwrap_or(Err(TaskError::Abandoned))
        }
        BodyKind::Future(f) => f(token).await,
        BodyKind::Group(group) => group.run(token).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SchedulerConfig;
    use crate::events::Bus;

    fn core() -> Core {
        Core::new(SchedulerConfig::default(), Bus::new(64))
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn rejected_invocation_has_no_side_effects() {
        let core = core();
        let mut rx = core.bus.subscribe();
        let body = TaskBody::sync(|| {});
        let parent = CancellationToken::new();

        let first = begin(&core, "a".into(), body.clone(), &parent).expect("idle");
        assert!(begin(&core, "a".into(), body.clone(), &parent).is_none());
        assert_eq!(drain(&mut rx).len(), 1);

        assert_eq!(complete(&core, first).await, Ok(()));
        assert!(!body.is_running());

        let kinds: Vec<EventKind> = drain(&mut rx).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::TaskFinished]);
    }

    #[tokio::test]
    async fn sync_false_is_reported_as_failure() {
        let core = core();
        let mut rx = core.bus.subscribe();
        let started = begin(
            &core,
            "f".into(),
            TaskBody::sync(|| false),
            &CancellationToken::new(),
        )
        .expect("idle");

        assert!(complete(&core, started).await.is_err());
        let events = drain(&mut rx);
        assert!(events[1].is_failure());
    }

    #[tokio::test]
    async fn abandoned_completion_resolves() {
        let core = core();
        let body = TaskBody::callback(|done: Completion| drop(done));
        let started = begin(&core, "a".into(), body, &CancellationToken::new()).unwrap();
        assert_eq!(complete(&core, started).await, Err(TaskError::Abandoned));
    }

    #[tokio::test]
    async fn panics_are_isolated_and_release_the_guard() {
        let core = core();
        let body = TaskBody::sync(|| -> bool { panic!("boom") });
        let started = begin(&core, "p".into(), body.clone(), &CancellationToken::new()).unwrap();

        let res = complete(&core, started).await;
        assert_eq!(
            res,
            Err(TaskError::Panicked {
                reason: "boom".into()
            })
        );
        assert!(!body.is_running());
    }

    #[tokio::test]
    async fn timeout_cancels_and_reports() {
        let core = core();
        let mut rx = core.bus.subscribe();
        let body = TaskBody::future(|ctx: CancellationToken| async move {
            ctx.cancelled().await;
        })
        .with_timeout(Duration::from_millis(10));

        let started = begin(&core, "slow".into(), body, &CancellationToken::new()).unwrap();
        let res = complete(&core, started).await;
        assert_eq!(
            res,
            Err(TaskError::Timeout {
                timeout: Duration::from_millis(10)
            })
        );

        let kinds: Vec<EventKind> = drain(&mut rx).iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TaskStarting,
                EventKind::TimeoutHit,
                EventKind::TaskFinished
            ]
        );
    }

    #[tokio::test]
    async fn drive_finishes_sync_bodies_inline() {
        let core = Arc::new(core());
        let mut rx = core.bus.subscribe();
        let body = TaskBody::sync(|| {});

        let started = begin(&core, "s".into(), body.clone(), &CancellationToken::new()).unwrap();
        assert!(matches!(drive(&core, started), Driven::Ready(Ok(()))));
        assert!(!body.is_running());

        let kinds: Vec<EventKind> = drain(&mut rx).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::TaskStarting, EventKind::TaskFinished]);
    }

    #[tokio::test]
    async fn drive_calls_callbacks_inline_and_defers_the_wait() {
        let core = Arc::new(core());
        let (tx, rx) = std::sync::mpsc::channel::<Completion>();
        let tx = std::sync::Mutex::new(tx);
        let body = TaskBody::callback(move |done| {
            let _ = tx.lock().unwrap().send(done);
        });

        let started = begin(&core, "cb".into(), body.clone(), &CancellationToken::new()).unwrap();
        let Driven::Pending(rest) = drive(&core, started) else {
            panic!("continuation not signalled yet");
        };
        let done = rx.try_recv().expect("body called inline");
        assert!(body.is_running());

        done.ok();
        assert_eq!(rest.await, Ok(()));
        assert!(!body.is_running());
    }

    #[tokio::test]
    async fn parent_cancellation_propagates() {
        let core = core();
        let parent = CancellationToken::new();
        let body = TaskBody::future(|_ctx: CancellationToken| futures::future::pending::<()>());
        let started = begin(&core, "c".into(), body, &parent).unwrap();
        parent.cancel();
        assert_eq!(complete(&core, started).await, Err(TaskError::Canceled));
    }
}
