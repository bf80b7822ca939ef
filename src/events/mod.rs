//! Scheduler events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the scheduler, the execution wrapper,
//! group combinators and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler::run` (not found), `core::runner` (starting,
//!   finished, timeout), `core::group` (not found children), `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: the scheduler's subscriber listener (fans out to
//!   `SubscriberSet`) and any receiver obtained from `Scheduler::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, NOT_FOUND};
