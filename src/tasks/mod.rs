//! # Task bodies and run targets.
//!
//! This module provides the task-related types:
//! - [`TaskBody`] - shared handle to a sync, callback or future body (plus its guard)
//! - [`Completion`] - completion signal handed to callback bodies
//! - [`Target`] - registered id or literal body, used by `run` and group children
//! - [`IntoTaskResult`] - what a body may return

mod body;
mod completion;
mod target;

pub(crate) use body::{BodyKind, RunGuard};
pub use body::{ANONYMOUS, IntoTaskResult, TaskBody, TaskResult};
pub use completion::Completion;
pub use target::Target;
