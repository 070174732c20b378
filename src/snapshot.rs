//! Snapshots and the ambient task store.
//!
//! A [`Snapshot`] is an immutable point-in-time mapping of field keys to
//! values. It is never mutated in place: every logical write builds a new
//! snapshot and installs it as current, so readers that captured an earlier
//! snapshot keep observing exactly what they captured.
//!
//! The [`TaskStore`] holds the current snapshot of every context for one
//! logical task. One store lives in a thread local as the ambient store;
//! task wrappers (see [`crate::task`]) swap their own forked store in and
//! out around every poll, which is what gives cooperative tasks independent
//! copy-on-write lineages.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::ContextId;

/// Immutable point-in-time mapping of field keys to values.
///
/// Cloning is cheap (the backing map is shared); "mutating" constructors
/// return a new snapshot with a freshly built map.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Arc<HashMap<String, Value>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_map(entries: HashMap<String, Value>) -> Self {
        Snapshot {
            entries: Arc::new(entries),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// New snapshot equal to this one with `key` replaced by `value`.
    pub fn with_value(&self, key: impl Into<String>, value: Value) -> Snapshot {
        let mut entries: HashMap<String, Value> = (*self.entries).clone();
        entries.insert(key.into(), value);
        Snapshot::from_map(entries)
    }

    /// New snapshot equal to this one without `key`, or `None` if the key
    /// was absent.
    pub fn without(&self, key: &str) -> Option<Snapshot> {
        if !self.entries.contains_key(key) {
            return None;
        }
        let mut entries: HashMap<String, Value> = (*self.entries).clone();
        entries.remove(key);
        Some(Snapshot::from_map(entries))
    }

    /// Snapshot built from a seed map with overrides applied on top
    /// (overrides win).
    pub fn merged(
        seed: HashMap<String, Value>,
        overrides: impl IntoIterator<Item = (String, Value)>,
    ) -> Snapshot {
        let mut entries = seed;
        for (key, value) in overrides {
            entries.insert(key, value);
        }
        Snapshot::from_map(entries)
    }

    /// Whether two snapshots share the same backing map.
    pub(crate) fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

/// Per-task view of every context's current snapshot.
///
/// Cloning a store forks it: the clone shares the snapshots themselves
/// (cheap `Arc` clones) but installs into its own slot map, so writes after
/// the fork are invisible to the original.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    current: HashMap<ContextId, Snapshot>,
}

impl TaskStore {
    /// Current snapshot for a context; empty if none was ever installed.
    pub(crate) fn snapshot(&self, id: ContextId) -> Snapshot {
        self.current.get(&id).cloned().unwrap_or_default()
    }

    pub(crate) fn install(&mut self, id: ContextId, snapshot: Snapshot) {
        self.current.insert(id, snapshot);
    }
}

thread_local! {
    static AMBIENT: RefCell<TaskStore> = RefCell::new(TaskStore::default());
}

/// Run `f` against the ambient task store.
pub(crate) fn with_store<R>(f: impl FnOnce(&mut TaskStore) -> R) -> R {
    AMBIENT.with(|cell| f(&mut cell.borrow_mut()))
}

/// Fork the ambient store: a copy seeded from every context's current
/// snapshot at the time of the call.
pub(crate) fn fork_store() -> TaskStore {
    with_store(|store| store.clone())
}

/// Replace the ambient store, returning the previous one.
pub(crate) fn swap_store(next: TaskStore) -> TaskStore {
    AMBIENT.with(|cell| cell.replace(next))
}
