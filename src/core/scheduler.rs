//! # Scheduler: registry, invocation entry points and group construction.
//!
//! The [`Scheduler`] owns the task registry, the event bus and (optionally) a
//! [`SubscriberSet`]. It resolves targets, drives invocations through the
//! execution wrapper and builds parallel/serial groups.
//!
//! ## Invocation flow
//! ```text
//! run(target)
//!   ├─ empty id ─────────────────► Err(ValidationError::EmptyId)
//!   ├─ unknown id ───────────────► publish TaskNotFound{404}, Ok(None)
//!   ├─ body already running ─────► Ok(None)
//!   └─ accepted ─► TaskStarting ─► body called inline
//!                     ├─ finished ─► TaskFinished ─► done(result) ─► Ok(Some(ready))
//!                     └─ pending ──► tokio::spawn(rest) ─► Ok(Some(Invocation))
//!                                        └─► TaskFinished ─► done(result)
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskrunner::{Scheduler, TaskBody};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = Scheduler::new();
//!
//!     runner.register("lint", TaskBody::sync(|| true))?;
//!     runner.register("test", TaskBody::callback(|done| {
//!         tokio::spawn(async move {
//!             tokio::time::sleep(Duration::from_millis(5)).await;
//!             done.ok();
//!         });
//!     }))?;
//!     runner.register("default", runner.serial(["lint", "test"]))?;
//!
//!     let invocation = runner.start()?.expect("registered and idle");
//!     invocation.await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::builder::SchedulerBuilder;
use crate::core::config::SchedulerConfig;
use crate::core::group::{Group, GroupKind};
use crate::core::invocation::Invocation;
use crate::core::registry::Registry;
use crate::core::runner::{self, Driven, Started};
use crate::error::ValidationError;
use crate::events::{Bus, Event};
use crate::policies::GroupPolicy;
use crate::subscribers::SubscriberSet;
use crate::tasks::{TaskBody, TaskResult, Target};

/// State shared by the scheduler, its invocations and the groups it built.
pub(crate) struct Core {
    pub cfg: SchedulerConfig,
    pub bus: Bus,
    pub registry: Registry,
    pub runtime_token: CancellationToken,
}

impl Core {
    pub fn new(cfg: SchedulerConfig, bus: Bus) -> Self {
        Self {
            cfg,
            bus,
            registry: Registry::new(),
            runtime_token: CancellationToken::new(),
        }
    }
}

/// Subscriber fan-out plus the listener feeding it from the bus.
pub(crate) struct Delivery {
    pub set: Arc<SubscriberSet>,
    pub listener: JoinHandle<()>,
}

/// Named-task scheduler.
pub struct Scheduler {
    core: Arc<Core>,
    delivery: Option<Delivery>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates a scheduler with default configuration and no subscribers.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Creates a scheduler with the given configuration and no subscribers.
    pub fn with_config(cfg: SchedulerConfig) -> Self {
        SchedulerBuilder::new(cfg).build()
    }

    /// Returns a builder (use it to attach subscribers).
    pub fn builder(cfg: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(core: Arc<Core>, delivery: Option<Delivery>) -> Self {
        Self { core, delivery }
    }

    /// Returns the scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.core.cfg
    }

    /// Registers `body` under `id`, replacing any previous registration.
    ///
    /// Returns the stored body so the same handle (and guard) can be passed to groups.
    pub fn register(
        &self,
        id: impl Into<String>,
        body: TaskBody,
    ) -> Result<TaskBody, ValidationError> {
        self.core.registry.insert(id.into(), body)
    }

    /// Returns the body registered under `id`.
    pub fn get(&self, id: &str) -> Option<TaskBody> {
        self.core.registry.get(id)
    }

    /// True if `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.core.registry.contains(id)
    }

    /// Returns sorted list of registered ids.
    pub fn ids(&self) -> Vec<String> {
        self.core.registry.ids()
    }

    /// Number of registered ids.
    pub fn len(&self) -> usize {
        self.core.registry.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while the body registered under `id` has an invocation in flight.
    pub fn is_running(&self, id: &str) -> bool {
        self.get(id).is_some_and(|body| body.is_running())
    }

    /// Invokes a registered id or a literal body.
    ///
    /// Returns `Ok(None)` when the invocation was not started (unknown id, or the
    /// body is already running). The body is called before this returns; a sync
    /// body has already finished and released its guard. Must be called within a
    /// tokio runtime.
    pub fn run(&self, target: impl Into<Target>) -> Result<Option<Invocation>, ValidationError> {
        let Some(started) = self.begin(target.into())? else {
            return Ok(None);
        };
        let id = started.id();
        let invocation = match runner::drive(&self.core, started) {
            Driven::Ready(res) => Invocation::ready(id, res),
            Driven::Pending(rest) => Invocation::spawned(id, tokio::spawn(rest)),
        };
        Ok(Some(invocation))
    }

    /// Invokes a target and passes its result to `done` after `TaskFinished`.
    ///
    /// When the body finishes during the call, `done` runs before this returns.
    /// Returns `Ok(false)` when the invocation was not started; `done` is then
    /// never called.
    pub fn run_with<F>(&self, target: impl Into<Target>, done: F) -> Result<bool, ValidationError>
    where
        F: FnOnce(TaskResult) + Send + 'static,
    {
        let Some(started) = self.begin(target.into())? else {
            return Ok(false);
        };
        match runner::drive(&self.core, started) {
            Driven::Ready(res) => done(res),
            Driven::Pending(rest) => {
                tokio::spawn(async move { done(rest.await) });
            }
        }
        Ok(true)
    }

    /// Runs the entry point task (`"default"` unless configured otherwise).
    pub fn start(&self) -> Result<Option<Invocation>, ValidationError> {
        self.run(&*self.core.cfg.entry_point)
    }

    /// Runs the entry point task and passes its result to `done`.
    pub fn start_with<F>(&self, done: F) -> Result<bool, ValidationError>
    where
        F: FnOnce(TaskResult) + Send + 'static,
    {
        self.run_with(&*self.core.cfg.entry_point, done)
    }

    /// Builds a parallel group with the configured failure policy.
    ///
    /// Children are resolved when the group runs. The group is not registered.
    pub fn parallel<I, T>(&self, children: I) -> TaskBody
    where
        I: IntoIterator<Item = T>,
        T: Into<Target>,
    {
        self.group(GroupKind::Parallel, self.core.cfg.group_policy, children)
    }

    /// Builds a serial group with the configured failure policy.
    pub fn serial<I, T>(&self, children: I) -> TaskBody
    where
        I: IntoIterator<Item = T>,
        T: Into<Target>,
    {
        self.group(GroupKind::Serial, self.core.cfg.group_policy, children)
    }

    /// Builds a group with an explicit kind and failure policy.
    pub fn group<I, T>(&self, kind: GroupKind, policy: GroupPolicy, children: I) -> TaskBody
    where
        I: IntoIterator<Item = T>,
        T: Into<Target>,
    {
        let children = children.into_iter().map(Into::into).collect();
        Group::body(&self.core, kind, policy, children)
    }

    /// Returns a receiver observing every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.core.bus.subscribe()
    }

    /// Cancels every in-flight invocation and drains subscriber workers.
    ///
    /// Cancelled invocations complete with `TaskError::Canceled`.
    pub async fn shutdown(self) {
        self.core.runtime_token.cancel();

        if let Some(Delivery { set, listener }) = self.delivery {
            let _ = listener.await;
            match Arc::try_unwrap(set) {
                Ok(set) => set.shutdown().await,
                Err(_) => tracing::warn!("subscriber set still shared; workers not drained"),
            }
        }
    }

    fn begin(&self, target: Target) -> Result<Option<Started>, ValidationError> {
        if matches!(&target, Target::Id(id) if id.is_empty()) {
            return Err(ValidationError::EmptyId);
        }
        match self.core.registry.resolve(&target) {
            Some((id, body)) => Ok(runner::begin(
                &self.core,
                id,
                body,
                &self.core.runtime_token,
            )),
            None => {
                self.core.bus.publish(Event::not_found(target.label()));
                Ok(None)
            }
        }
    }
}
