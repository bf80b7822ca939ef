//! Scheduling core: registry, execution wrapper, groups and the façade.
//!
//! The public API from this module is [`Scheduler`] (plus its builder, config,
//! [`Invocation`] handle and [`GroupKind`]).
//!
//! Internal modules:
//! - [`registry`]: id → body mapping;
//! - [`runner`]: guarded invocation of one body with event publishing;
//! - [`group`]: parallel/serial fan-out over registered or literal children;
//! - [`scheduler`]: the façade tying them together.

mod builder;
mod config;
mod group;
mod invocation;
mod registry;
mod runner;
mod scheduler;

pub use builder::SchedulerBuilder;
pub use config::SchedulerConfig;
pub(crate) use group::Group;
pub use group::GroupKind;
pub use invocation::Invocation;
pub use scheduler::Scheduler;
