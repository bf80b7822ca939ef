//! # Task registry - id to body mapping.
//!
//! ## Rules
//! - Ids are non-empty; re-registration overwrites silently
//! - Entries are never removed individually (they live as long as the scheduler)
//! - The stored body is returned to the caller, so the same handle (and guard)
//!   can be referenced from groups

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::ValidationError;
use crate::tasks::{TaskBody, Target};

/// Registry of named task bodies.
pub(crate) struct Registry {
    tasks: RwLock<HashMap<String, TaskBody>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Stores `body` under `id` and returns the stored handle.
    pub fn insert(&self, id: String, body: TaskBody) -> Result<TaskBody, ValidationError> {
        if id.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        self.write().insert(id, body.clone());
        Ok(body)
    }

    /// Returns the body registered under `id`.
    pub fn get(&self, id: &str) -> Option<TaskBody> {
        self.read().get(id).cloned()
    }

    /// True if `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    /// Returns sorted list of registered ids.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Resolves a target to the id used in events and the body to run.
    ///
    /// Literal bodies pass through under their own name; unknown ids yield `None`.
    pub fn resolve(&self, target: &Target) -> Option<(Arc<str>, TaskBody)> {
        match target {
            Target::Id(id) => self.get(id).map(|body| (Arc::from(id.as_str()), body)),
            Target::Body(body) => Some((Arc::from(body.name()), body.clone())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, TaskBody>> {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, TaskBody>> {
        self.tasks.write().unwrap_or_else(PoisonError::into_inner)
    }
}
