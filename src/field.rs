//! Field declarations and accessors.
//!
//! A [`FieldSpec`] describes one declared field: optional alias, optional
//! default value, optional default factory. Building a context class binds
//! each spec into a [`FieldDef`], the accessor that owns read/write/delete
//! logic against the class's context. [`Field`] is the typed facade over a
//! `FieldDef`, converting through serde at the boundary.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{ContextError, DeclarationError};

type Factory = Arc<dyn Fn() -> Result<Value, ContextError> + Send + Sync>;

/// Declaration of one context field.
#[derive(Clone)]
pub struct FieldSpec {
    alias: Option<String>,
    default: Option<Value>,
    factory: Option<Factory>,
}

impl FieldSpec {
    pub fn new() -> Self {
        FieldSpec {
            alias: None,
            default: None,
            factory: None,
        }
    }

    /// Alias used by the mapping projection instead of the field name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Default value, materialized into the snapshot on first read.
    ///
    /// Array- or object-valued defaults are rejected when the class is
    /// built; use [`default_factory`](Self::default_factory) for those.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Default factory, invoked lazily on first read and cached into the
    /// snapshot. The factory runs with full field resolution available, so
    /// it may read other fields.
    pub fn default_factory<T, F>(mut self, factory: F) -> Self
    where
        T: Serialize,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(move || {
            serde_json::to_value(factory()).map_err(ContextError::from)
        }));
        self
    }

    /// Fallible variant of [`default_factory`](Self::default_factory), for
    /// factories that resolve other fields.
    pub fn try_default_factory<T, F>(mut self, factory: F) -> Self
    where
        T: Serialize,
        F: Fn() -> Result<T, ContextError> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(move || {
            serde_json::to_value(factory()?).map_err(ContextError::from)
        }));
        self
    }

    /// Validate the declaration and bind it to its owning class and context.
    pub(crate) fn bind(
        self,
        owner: &str,
        name: &str,
        context: &Context,
    ) -> Result<FieldDef, DeclarationError> {
        if self.default.is_some() && self.factory.is_some() {
            return Err(DeclarationError::DefaultConflict(name.to_string()));
        }
        match &self.default {
            Some(Value::Array(_)) => {
                return Err(DeclarationError::MutableDefault {
                    name: name.to_string(),
                    kind: "array",
                })
            }
            Some(Value::Object(_)) => {
                return Err(DeclarationError::MutableDefault {
                    name: name.to_string(),
                    kind: "object",
                })
            }
            _ => {}
        }
        Ok(FieldDef {
            name: name.to_string(),
            key: format!("{}_{}", owner, name),
            owner: owner.to_string(),
            alias: self.alias,
            default: self.default,
            factory: self.factory,
            context: context.clone(),
        })
    }
}

impl Default for FieldSpec {
    fn default() -> Self {
        FieldSpec::new()
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("alias", &self.alias)
            .field("default", &self.default)
            .field("factory", &self.factory.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Bound accessor for one declared field.
///
/// The key is namespaced by the declaring class (`{class}_{name}`), so two
/// unrelated classes sharing a context never collide. Derived classes share
/// the base's `FieldDef`, which is why a field written through a subclass is
/// visible through the base.
pub struct FieldDef {
    name: String,
    key: String,
    owner: String,
    alias: Option<String>,
    default: Option<Value>,
    factory: Option<Factory>,
    context: Context,
}

impl FieldDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The snapshot key: `{declaring class}_{field name}`.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name of the class that declared this field.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Declared alias, or the field name when none was given.
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some() || self.factory.is_some()
    }

    /// Whether a read would resolve, without materializing anything.
    pub fn has_value(&self) -> bool {
        self.context.snapshot().contains(&self.key) || self.has_default()
    }

    /// Resolve the current value.
    ///
    /// Key present in the current snapshot wins; otherwise a declared
    /// default is deep-copied into the snapshot, or a declared factory is
    /// invoked once and its result cached. With neither, the field is unset.
    pub fn get(&self) -> Result<Value, ContextError> {
        if let Some(value) = self.context.snapshot().get(&self.key) {
            return Ok(value.clone());
        }
        if let Some(default) = &self.default {
            // Value::clone is a deep copy, so scopes never alias a default.
            let value = default.clone();
            self.set_value(value.clone());
            return Ok(value);
        }
        if let Some(factory) = &self.factory {
            // The factory may read (and thereby materialize) other fields;
            // set_value re-reads the current snapshot, so those writes
            // survive.
            let value = (factory.as_ref())()?;
            self.set_value(value.clone());
            return Ok(value);
        }
        Err(ContextError::Unset(self.name.clone()))
    }

    /// Install a new snapshot with this field's key replaced.
    pub fn set_value(&self, value: Value) {
        self.context
            .update(|current| current.with_value(self.key.clone(), value));
    }

    pub fn set<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), ContextError> {
        self.set_value(serde_json::to_value(value)?);
        Ok(())
    }

    /// Remove the key from the current snapshot.
    ///
    /// Deletion is transient with respect to defaults: the next read of a
    /// defaulted field re-materializes the default, because defaults resolve
    /// from absence.
    pub fn delete(&self) -> Result<(), ContextError> {
        if self.context.try_update(|current| current.without(&self.key)) {
            Ok(())
        } else {
            Err(ContextError::Unset(self.name.clone()))
        }
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("alias", &self.alias)
            .field("default", &self.default)
            .field("factory", &self.factory.as_ref().map(|_| "<fn>"))
            .field("context", &self.context)
            .finish()
    }
}

/// Typed accessor for one declared field.
///
/// Values convert through serde on the way in and out; the conversion is
/// the only place a type can fail, and it fails loudly.
pub struct Field<T> {
    def: Arc<FieldDef>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Field {
            def: self.def.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("def", &self.def).finish()
    }
}

impl<T> Field<T> {
    /// Typed facade over a bound accessor.
    pub(crate) fn new(def: Arc<FieldDef>) -> Self {
        Field {
            def,
            _marker: PhantomData,
        }
    }

    pub fn def(&self) -> &FieldDef {
        &self.def
    }

    pub fn has_value(&self) -> bool {
        self.def.has_value()
    }

    pub fn delete(&self) -> Result<(), ContextError> {
        self.def.delete()
    }
}

impl<T: Serialize + DeserializeOwned> Field<T> {
    pub fn get(&self) -> Result<T, ContextError> {
        Ok(serde_json::from_value(self.def.get()?)?)
    }

    pub fn set(&self, value: &T) -> Result<(), ContextError> {
        self.def.set(value)
    }
}
