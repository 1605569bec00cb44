//! Concurrent keyed registry of in-flight scheduled actions.
//!
//! The store is constructed explicitly and handed to the scheduler at
//! construction time; there is no process-wide static registry. All mutation
//! of a given action happens from the scheduler's serialized tick context,
//! while request-side code only inserts new entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::domain::action::{ActionId, ScheduledAction};

#[derive(Clone, Debug, Default)]
pub struct ActionStore {
    actions: Arc<Mutex<HashMap<ActionId, ScheduledAction>>>,
}

impl ActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by id.
    pub fn insert(&self, action: ScheduledAction) {
        let mut actions = self.lock();
        actions.insert(action.id.clone(), action);
    }

    /// Add-if-absent semantics used for alternative actions: an id collision
    /// (including with a terminal action) silently no-ops rather than
    /// overwriting. Returns whether the action was inserted.
    pub fn insert_if_absent(&self, action: ScheduledAction) -> bool {
        let mut actions = self.lock();
        if actions.contains_key(&action.id) {
            return false;
        }
        actions.insert(action.id.clone(), action);
        true
    }

    pub fn get(&self, id: &ActionId) -> Option<ScheduledAction> {
        self.lock().get(id).cloned()
    }

    /// Write back a mutated action. The entry must already exist.
    pub fn update(&self, action: ScheduledAction) -> bool {
        let mut actions = self.lock();
        match actions.get_mut(&action.id) {
            Some(slot) => {
                *slot = action;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &ActionId) -> Option<ScheduledAction> {
        self.lock().remove(id)
    }

    /// All actions that are `Pending` with `execute_at <= now`, ordered by
    /// `(priority asc, execute_at asc, id asc)`. The id is the deterministic
    /// tie-break for actions sharing identical priority and execute time.
    pub fn due_actions(&self, now: DateTime<Utc>) -> Vec<ScheduledAction> {
        let mut due: Vec<ScheduledAction> =
            self.lock().values().filter(|action| action.is_due(now)).cloned().collect();
        due.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.execute_at.cmp(&b.execute_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        due
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<ScheduledAction> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ActionId, ScheduledAction>> {
        // Lock poisoning only happens if a panic escaped a prior critical
        // section; recovering the inner map is safe for this registry.
        self.actions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
