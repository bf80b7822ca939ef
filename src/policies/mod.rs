//! Group policies.
//!
//! ## Contents
//! - [`GroupPolicy`] what a parallel/serial group does when a child fails
//!
//! ## Defaults
//! - `GroupPolicy::BestEffort`, overridable via `SchedulerConfig::group_policy`
//!   or per group with `Scheduler::group`.

mod group;

pub use group::GroupPolicy;
