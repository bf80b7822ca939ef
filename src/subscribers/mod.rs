//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! used by the scheduler to deliver [`Event`](crate::Event)s broadcast through the bus.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   wrapper ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                     │
//!                                                       ┌─────────────┼────────────┐
//!                                                       ▼             ▼            ▼
//!                                                   LogWriter      Metrics      Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
