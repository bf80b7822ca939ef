//! # Parallel and serial task groups.
//!
//! A group is a synthetic body whose children are registered ids or literal
//! bodies. Children are resolved when the group runs, not when it is built, and
//! each child goes through the execution wrapper, so it publishes its own
//! `TaskStarting` / `TaskFinished` pair and honors its own guard.
//!
//! ## Parallel
//! ```text
//! resolve all ──► begin each (list order) ──► poll all concurrently ──► fan-in
//!    │ unknown id → TaskNotFound, failure     │ running → skipped
//! ```
//!
//! ## Serial
//! ```text
//! child[0] ──done──► child[1] ──done──► ... ──► group done
//!   (resolved lazily; running children are skipped without blocking)
//! ```
//!
//! ## Rules
//! - A child whose guard is held is skipped: not started, not a failure
//! - An empty group (or one where every child was skipped) succeeds immediately
//! - Failure handling follows [`GroupPolicy`]
//! - A cancelled group lets its started children finish as `Canceled` and
//!   starts no further children

use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;

use crate::core::runner;
use crate::core::scheduler::Core;
use crate::error::TaskError;
use crate::events::Event;
use crate::policies::GroupPolicy;
use crate::tasks::{TaskBody, TaskResult, Target};

/// Composition mode of a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupKind {
    /// Start every child at once; done when all started children are done.
    Parallel,
    /// Run children one at a time, in list order.
    Serial,
}

impl GroupKind {
    /// Name reported in events when the group runs as a literal.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Parallel => "parallel",
            GroupKind::Serial => "serial",
        }
    }
}

/// Group definition stored inside a [`TaskBody`].
pub(crate) struct Group {
    kind: GroupKind,
    policy: GroupPolicy,
    children: Vec<Target>,
    core: Weak<Core>,
}

impl Group {
    /// Builds a group body bound to the scheduler owning `core`.
    pub fn body(
        core: &Arc<Core>,
        kind: GroupKind,
        policy: GroupPolicy,
        children: Vec<Target>,
    ) -> TaskBody {
        let group = Group {
            kind,
            policy,
            children,
            core: Arc::downgrade(core),
        };
        TaskBody::group(kind.as_str(), group)
    }

    /// Runs the group under the invocation token `token`.
    pub fn run(&self, token: CancellationToken) -> BoxFuture<'_, TaskResult> {
        async move {
            let Some(core) = self.core.upgrade() else {
                return Err(TaskError::Canceled);
            };
            match self.kind {
                GroupKind::Parallel => {
                    run_parallel(&core, &self.children, self.policy, &token).await
                }
                GroupKind::Serial => run_serial(&core, &self.children, self.policy, &token).await,
            }
        }
        .boxed()
    }
}

/// Resolves a child; unknown ids publish `TaskNotFound`.
fn resolve_child(core: &Core, child: &Target) -> Result<(Arc<str>, TaskBody), TaskError> {
    core.registry.resolve(child).ok_or_else(|| {
        let id = child.label();
        core.bus.publish(Event::not_found(id));
        TaskError::NotFound { id: id.to_string() }
    })
}

async fn run_parallel(
    core: &Core,
    children: &[Target],
    policy: GroupPolicy,
    token: &CancellationToken,
) -> TaskResult {
    // A fail-fast group with an unknown child starts nothing.
    let mut resolved = Vec::with_capacity(children.len());
    let mut failed: Vec<(usize, String)> = Vec::new();
    for (idx, child) in children.iter().enumerate() {
        match resolve_child(core, child) {
            Ok(found) => resolved.push((idx, found)),
            Err(e) if policy == GroupPolicy::FailFast => return Err(e),
            Err(_) => failed.push((idx, child.label().to_string())),
        }
    }

    let fan = token.child_token();
    let mut pending = FuturesUnordered::new();
    for (idx, (id, body)) in resolved {
        match runner::begin(core, id, body, &fan) {
            Some(started) => pending.push(async move {
                let id = started.id();
                (idx, id, runner::complete(core, started).await)
            }),
            None => tracing::debug!(index = idx, "parallel child already running; skipped"),
        }
    }

    let mut first_err = None;
    while let Some((idx, id, res)) = pending.next().await {
        let Err(e) = res else { continue };
        match policy {
            GroupPolicy::FailFast => {
                if first_err.is_none() {
                    fan.cancel();
                    first_err = Some(e);
                }
            }
            GroupPolicy::BestEffort => failed.push((idx, id.to_string())),
        }
    }

    if let Some(e) = first_err {
        return Err(e);
    }
    if token.is_cancelled() {
        return Err(TaskError::Canceled);
    }
    aggregate(failed)
}

async fn run_serial(
    core: &Core,
    children: &[Target],
    policy: GroupPolicy,
    token: &CancellationToken,
) -> TaskResult {
    let mut failed: Vec<(usize, String)> = Vec::new();

    for (idx, child) in children.iter().enumerate() {
        if token.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        let (id, body) = match resolve_child(core, child) {
            Ok(found) => found,
            Err(e) if policy == GroupPolicy::FailFast => return Err(e),
            Err(_) => {
                failed.push((idx, child.label().to_string()));
                continue;
            }
        };

        let Some(started) = runner::begin(core, Arc::clone(&id), body, token) else {
            tracing::debug!(task = %id, "serial child already running; skipped");
            continue;
        };

        if let Err(e) = runner::complete(core, started).await {
            match policy {
                GroupPolicy::FailFast => return Err(e),
                GroupPolicy::BestEffort => failed.push((idx, id.to_string())),
            }
        }
    }

    if token.is_cancelled() {
        return Err(TaskError::Canceled);
    }
    aggregate(failed)
}

/// Collapses best-effort failures into one result, in group order.
fn aggregate(mut failed: Vec<(usize, String)>) -> TaskResult {
    if failed.is_empty() {
        return Ok(());
    }
    failed.sort_by_key(|(idx, _)| *idx);
    Err(TaskError::ChildrenFailed {
        failed: failed.into_iter().map(|(_, id)| id).collect(),
    })
}
