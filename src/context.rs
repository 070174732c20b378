//! Contexts: identified scoped-storage slots.
//!
//! A [`Context`] names one slot in the ambient task store. Every context
//! class binds to exactly one context; multiple contexts coexist without
//! collision, each with its own snapshot chain. A process-wide default
//! context backs classes declared without an explicit one.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::snapshot::{self, Snapshot};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identifier of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An isolated, inheritable, snapshot-chained storage slot.
///
/// The handle is cheap to clone; all handles to the same context share one
/// identity. The context itself holds no data: the current snapshot lives
/// in the ambient [`TaskStore`](crate::snapshot::TaskStore), which is what
/// lets concurrently scheduled tasks observe independent values.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: ContextId,
    name: String,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Context {
            inner: Arc::new(ContextInner {
                id: ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
                name: name.into(),
            }),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The current snapshot of this context in the ambient store.
    pub fn snapshot(&self) -> Snapshot {
        snapshot::with_store(|store| store.snapshot(self.id()))
    }

    /// Install a new current snapshot, returning a token that restores the
    /// previous one.
    pub fn install(&self, next: Snapshot) -> RestoreToken {
        let previous = snapshot::with_store(|store| {
            let previous = store.snapshot(self.id());
            store.install(self.id(), next);
            previous
        });
        trace!(context = self.name(), id = %self.id(), "installed snapshot");
        RestoreToken {
            context: self.clone(),
            previous,
        }
    }

    /// Replace the current snapshot without producing a restore token.
    pub(crate) fn replace(&self, next: Snapshot) {
        snapshot::with_store(|store| store.install(self.id(), next));
    }

    /// Install the snapshot produced by `f` from the current one.
    ///
    /// `f` runs without holding the store, so it may itself read fields.
    pub(crate) fn update(&self, f: impl FnOnce(&Snapshot) -> Snapshot) {
        let current = self.snapshot();
        self.replace(f(&current));
    }

    /// Like [`update`](Self::update), but `f` may decline by returning
    /// `None`; reports whether a new snapshot was installed.
    pub(crate) fn try_update(&self, f: impl FnOnce(&Snapshot) -> Option<Snapshot>) -> bool {
        let current = self.snapshot();
        match f(&current) {
            Some(next) => {
                self.replace(next);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Context {}

static DEFAULT_CONTEXT: Lazy<Context> = Lazy::new(|| Context::new("default"));

/// The process-wide default context.
///
/// Created once at first use, never destroyed. Context classes declared
/// without an explicit context bind to it.
pub fn default_context() -> &'static Context {
    &DEFAULT_CONTEXT
}

/// Opaque handle identifying the snapshot to reinstate when a scope ends.
///
/// Redeeming installs the snapshot that was current when the token was
/// issued, discarding anything installed since.
#[derive(Debug)]
pub struct RestoreToken {
    context: Context,
    previous: Snapshot,
}

impl RestoreToken {
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn redeem(self) {
        trace!(
            context = self.context.name(),
            id = %self.context.id(),
            "restored snapshot"
        );
        self.context.replace(self.previous);
    }
}
