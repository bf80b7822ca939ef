//! # Run targets and group children.
//!
//! [`Target`] names what to run: a registered id (resolved when the invocation
//! happens) or a literal [`TaskBody`]. The same type describes group children.

use crate::tasks::body::TaskBody;

/// Registered id or literal body.
#[derive(Clone, Debug)]
pub enum Target {
    /// Resolved against the registry at invocation time.
    Id(String),
    /// Used as-is; reported under the body's name.
    Body(TaskBody),
}

impl Target {
    /// Id used in events for this target.
    pub fn label(&self) -> &str {
        match self {
            Target::Id(id) => id,
            Target::Body(body) => body.name(),
        }
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Target::Id(id.to_string())
    }
}

impl From<String> for Target {
    fn from(id: String) -> Self {
        Target::Id(id)
    }
}

impl From<&String> for Target {
    fn from(id: &String) -> Self {
        Target::Id(id.clone())
    }
}

impl From<TaskBody> for Target {
    fn from(body: TaskBody) -> Self {
        Target::Body(body)
    }
}

impl From<&TaskBody> for Target {
    fn from(body: &TaskBody) -> Self {
        Target::Body(body.clone())
    }
}
