//! # Failure policies for task groups.
//!
//! [`GroupPolicy`] determines what a group does when one of its children fails.
//!
//! ```text
//! BestEffort:  a ✓ ── b ✗ ── c ✓   → group Err(ChildrenFailed { failed: ["b"] })
//! FailFast:    a ✓ ── b ✗ ╳ c      → group Err(<b's error>), c never started (serial)
//!                                    or cancelled (parallel)
//! ```

/// Policy controlling how child failures affect a group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupPolicy {
    /// Run every child; report all failed children once the group is done (default).
    #[default]
    BestEffort,
    /// Stop at the first failure and report that failure.
    ///
    /// Serial groups do not start later children; parallel groups cancel the
    /// children still in flight and wait for them to wind down.
    FailFast,
}
