//! # taskrunner
//!
//! **taskrunner** is a named-task scheduler for tokio.
//!
//! Register units of work under ids, run them individually, compose them into
//! parallel (fan-out/fan-in) or serial (strictly ordered) groups, and observe
//! their lifecycle through events. A body never runs twice concurrently.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   register(id, TaskBody)        parallel([..]) / serial([..])
//!            │                               │
//!            ▼                               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler                                                        │
//! │  - Registry (id → TaskBody, shared running guard per body)        │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ run(id | body)
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Execution wrapper                                                │
//! │  guard CAS → TaskStarting → dispatch (sync | callback | future |  │
//! │  group) → release guard → TaskFinished{elapsed} → result          │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ publish
//!        ▼
//!   Bus ──► subscriber_listener ──► SubscriberSet ──► LogWriter / custom
//!      └──► Scheduler::subscribe() receivers
//! ```
//!
//! ### Task states
//! ```text
//! Idle ──run (guard acquired)──► Running ──completion (ok or err)──► Idle
//!   ▲                              │
//!   └──────── run while Running: rejected (Ok(None)), no events ────┘
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types                              |
//! |-------------------|----------------------------------------------------------|----------------------------------------|
//! | **Tasks**         | Sync, callback and future bodies with a shared guard     | [`TaskBody`], [`Completion`]           |
//! | **Scheduling**    | Registry, invocation, entry point                        | [`Scheduler`], [`Invocation`]          |
//! | **Groups**        | Parallel / serial composition with failure policies      | [`GroupKind`], [`GroupPolicy`]         |
//! | **Events**        | Lifecycle notifications                                  | [`Event`], [`EventKind`], [`Subscribe`]|
//! | **Errors**        | Contract violations vs task failures                     | [`ValidationError`], [`TaskError`]     |
//! | **Configuration** | Bus capacity, default timeout, group policy, entry point | [`SchedulerConfig`]                    |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber writing events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskrunner::{Scheduler, TaskBody, Target};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = Scheduler::new();
//!
//!     runner.register("clean", TaskBody::sync(|| {}))?;
//!     runner.register("fetch", TaskBody::future(|_ctx| async {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!     }))?;
//!     let inline = TaskBody::sync(|| true).named("inline");
//!
//!     let build = runner.parallel([Target::from("fetch"), Target::from(inline)]);
//!     runner.register("default", runner.serial([Target::from("clean"), Target::from(build)]))?;
//!
//!     if let Some(invocation) = runner.start()? {
//!         invocation.await?;
//!     }
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{GroupKind, Invocation, Scheduler, SchedulerBuilder, SchedulerConfig};
pub use error::{TaskError, ValidationError};
pub use events::{Bus, Event, EventKind, NOT_FOUND};
pub use policies::GroupPolicy;
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{ANONYMOUS, Completion, IntoTaskResult, TaskBody, TaskResult, Target};

// Optional: a subscriber writing every event to `tracing`.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
