//! # Scheduler configuration.
//!
//! Provides [`SchedulerConfig`] centralized settings for a scheduler instance.
//!
//! ## Sentinel values
//! - `timeout = 0s` → no timeout (treated as `None` by [`SchedulerConfig::default_timeout`])
//! - `bus_capacity = 0` → clamped to 1

use std::borrow::Cow;
use std::time::Duration;

use crate::policies::GroupPolicy;

/// Configuration for a [`Scheduler`](crate::Scheduler).
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `timeout`: Default per-invocation timeout (`0s` = no timeout)
/// - `group_policy`: Failure policy of groups built with `parallel` / `serial`
/// - `entry_point`: Task id run by `start()`
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging behind by more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// Default invocation timeout.
    ///
    /// - `Duration::ZERO` = no timeout (task runs until it completes)
    /// - `> 0` = applied to every invocation without a per-body timeout
    pub timeout: Duration,

    /// Failure policy for groups built with `Scheduler::parallel` / `Scheduler::serial`.
    pub group_policy: GroupPolicy,

    /// Id of the task run by `Scheduler::start`.
    pub entry_point: Cow<'static, str>,
}

impl SchedulerConfig {
    /// Returns the default invocation timeout as an `Option`.
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SchedulerConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `timeout = 0s` (no timeout)
    /// - `group_policy = GroupPolicy::BestEffort`
    /// - `entry_point = "default"`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            timeout: Duration::ZERO,
            group_policy: GroupPolicy::default(),
            entry_point: Cow::Borrowed("default"),
        }
    }
}
