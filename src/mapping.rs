//! Mutable-mapping projection over a context class.
//!
//! Exposes one class's resolved fields as a conventional key/value view,
//! keyed by field alias. Iteration yields only fields that currently have a
//! value (without materializing defaults); reads and writes follow the same
//! resolution as field access. Deletion through the view is unsupported and
//! must go through the field API directly.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::class::{lookup, ContextClass};
use crate::error::ContextError;
use crate::field::FieldDef;

/// Mapping view over one context class, keyed by alias.
pub struct ContextMapping {
    class: ContextClass,
    aliased: IndexMap<String, Arc<FieldDef>>,
}

impl ContextMapping {
    pub(crate) fn new(class: &ContextClass) -> Self {
        let aliased = class
            .fields()
            .values()
            .map(|def| (def.alias().to_string(), def.clone()))
            .collect();
        ContextMapping {
            class: class.clone(),
            aliased,
        }
    }

    pub fn class(&self) -> &ContextClass {
        &self.class
    }

    /// Resolve a value by alias, materializing defaults like field access.
    ///
    /// Unknown aliases and unset fields both fail with
    /// [`ContextError::MissingKey`].
    pub fn get(&self, alias: &str) -> Result<Value, ContextError> {
        let def = self
            .aliased
            .get(alias)
            .ok_or_else(|| ContextError::MissingKey(alias.to_string()))?;
        def.get().map_err(|err| match err {
            ContextError::Unset(_) => ContextError::MissingKey(alias.to_string()),
            other => other,
        })
    }

    /// Write through to the backing field.
    pub fn insert<T: Serialize + ?Sized>(
        &self,
        alias: &str,
        value: &T,
    ) -> Result<(), ContextError> {
        let def = self
            .aliased
            .get(alias)
            .ok_or_else(|| ContextError::MissingKey(alias.to_string()))?;
        def.set(value)
    }

    /// Bulk write, the mapping equivalent of `update`.
    pub fn extend<I>(&self, pairs: I) -> Result<(), ContextError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (alias, value) in pairs {
            let def = self
                .aliased
                .get(&alias)
                .ok_or_else(|| ContextError::MissingKey(alias.clone()))?;
            def.set_value(value);
        }
        Ok(())
    }

    /// Always fails: partial deletion would desynchronize the alias view.
    pub fn remove(&self, _alias: &str) -> Result<Value, ContextError> {
        Err(ContextError::UnsupportedDeletion)
    }

    /// Whether the alias names a field that would resolve.
    pub fn contains_key(&self, alias: &str) -> bool {
        self.aliased
            .get(alias)
            .map(|def| def.has_value())
            .unwrap_or(false)
    }

    /// Aliases of fields that currently have a value, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.aliased
            .iter()
            .filter(|(_, def)| def.has_value())
            .map(|(alias, _)| alias.as_str())
    }

    pub fn len(&self) -> usize {
        self.keys().count()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().next().is_none()
    }

    /// Resolve every field that has a value into a plain map.
    ///
    /// Materializes defaults, like collecting a mapping does.
    pub fn to_map(&self) -> Result<serde_json::Map<String, Value>, ContextError> {
        let mut map = serde_json::Map::new();
        for (alias, def) in &self.aliased {
            if def.has_value() {
                map.insert(alias.clone(), def.get()?);
            }
        }
        Ok(map)
    }
}

impl fmt::Debug for ContextMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextMapping")
            .field("class", &self.class.name())
            .field("aliases", &self.aliased.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Mapping view over a class handle.
pub fn as_mapping(class: &ContextClass) -> ContextMapping {
    ContextMapping::new(class)
}

/// Mapping view over a registered class, failing with
/// [`ContextError::NotAContextClass`] for unknown names.
pub fn as_mapping_of(name: &str) -> Result<ContextMapping, ContextError> {
    Ok(ContextMapping::new(&lookup(name)?))
}
