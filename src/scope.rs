//! Scoped snapshot replacement with guaranteed restoration.
//!
//! Entering a scope captures a restore token for the context's current
//! snapshot and installs a new one: a copy of the current snapshot when no
//! seed or overrides are given (isolating writes without changing visible
//! values), or exactly the seed merged with overrides when they are. The
//! guard restores the entry snapshot when dropped, on every exit path.

use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

use crate::class::ContextClass;
use crate::context::{default_context, Context, RestoreToken};
use crate::error::ContextError;
use crate::snapshot::Snapshot;

/// Builder for a scope over one context.
///
/// When obtained from [`ContextClass::scope`], seed and override keys are
/// field names resolved through the class; otherwise they are raw snapshot
/// keys.
#[derive(Debug)]
pub struct ScopeBuilder {
    context: Context,
    class: Option<ContextClass>,
    seed: Option<HashMap<String, Value>>,
    overrides: Vec<(String, Value)>,
}

impl ScopeBuilder {
    pub(crate) fn for_context(context: &Context) -> Self {
        ScopeBuilder {
            context: context.clone(),
            class: None,
            seed: None,
            overrides: Vec::new(),
        }
    }

    pub(crate) fn for_class(class: &ContextClass) -> Self {
        ScopeBuilder {
            context: class.context().clone(),
            class: Some(class.clone()),
            seed: None,
            overrides: Vec::new(),
        }
    }

    /// Seed mapping: the new snapshot becomes exactly this map (plus
    /// overrides), discarding prior values.
    pub fn seed(mut self, seed: HashMap<String, Value>) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Single override; overrides win over the seed.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Install the new snapshot, returning a guard that restores the
    /// previous one on drop.
    pub fn enter(self) -> Result<ScopeGuard, ContextError> {
        let ScopeBuilder {
            context,
            class,
            seed,
            overrides,
        } = self;
        let resolve = |key: String| -> Result<String, ContextError> {
            match &class {
                Some(class) => Ok(class.key_of(&key)?.to_string()),
                None => Ok(key),
            }
        };

        let replace = seed.is_some() || !overrides.is_empty();
        let snapshot = if replace {
            let seed = seed
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| Ok((resolve(key)?, value)))
                .collect::<Result<HashMap<_, _>, ContextError>>()?;
            let overrides = overrides
                .into_iter()
                .map(|(key, value)| Ok((resolve(key)?, value)))
                .collect::<Result<Vec<_>, ContextError>>()?;
            Snapshot::merged(seed, overrides)
        } else {
            // Copy mode: same visible values, writes stay inside the scope.
            context.snapshot()
        };
        let token = context.install(snapshot);
        trace!(context = context.name(), replaced = replace, "entered scope");
        Ok(ScopeGuard { token: Some(token) })
    }
}

/// Guard restoring the pre-scope snapshot on drop.
#[derive(Debug)]
pub struct ScopeGuard {
    token: Option<RestoreToken>,
}

impl ScopeGuard {
    /// Explicit exit; equivalent to dropping the guard.
    pub fn exit(self) {}
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.redeem();
        }
    }
}

impl Context {
    /// Scope builder over this context.
    pub fn scope(&self) -> ScopeBuilder {
        ScopeBuilder::for_context(self)
    }
}

/// Scope builder over the process-wide default context.
pub fn default_scope() -> ScopeBuilder {
    ScopeBuilder::for_context(default_context())
}
