//! Context classes: declaration, inheritance, and the class registry.
//!
//! A context class is a named group of fields bound to one context. The
//! builder is the declaration surface: only explicitly declared fields
//! participate in context resolution. Derived classes inherit the full
//! ordered field list of their bases (parent fields first) and must share
//! the base's context; that is checked when the class is built, not at
//! first access.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::context::{default_context, Context};
use crate::error::{ContextError, DeclarationError};
use crate::field::{Field, FieldDef, FieldSpec};
use crate::mapping::ContextMapping;
use crate::scope::ScopeBuilder;

/// Ordered name to field-accessor map of one class.
pub type FieldMap = IndexMap<String, Arc<FieldDef>>;

/// A live context class: ordered fields bound to one context.
///
/// Handles are cheap to clone and share one identity.
#[derive(Clone)]
pub struct ContextClass {
    inner: Arc<ClassInner>,
}

struct ClassInner {
    name: String,
    context: Context,
    fields: FieldMap,
}

impl ContextClass {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    /// Ordered name to accessor map, parent fields first.
    pub fn fields(&self) -> &FieldMap {
        &self.inner.fields
    }

    /// Raw accessor for a declared field.
    pub fn def(&self, name: &str) -> Result<&Arc<FieldDef>, ContextError> {
        self.inner
            .fields
            .get(name)
            .ok_or_else(|| ContextError::UnknownField {
                class: self.name().to_string(),
                field: name.to_string(),
            })
    }

    /// Typed accessor for a declared field.
    pub fn field<T>(&self, name: &str) -> Result<Field<T>, ContextError> {
        Ok(Field::new(self.def(name)?.clone()))
    }

    /// Snapshot key of a declared field.
    pub fn key_of(&self, name: &str) -> Result<&str, ContextError> {
        Ok(self.def(name)?.key())
    }

    /// Read a declared field, resolving defaults.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ContextError> {
        Ok(serde_json::from_value(self.def(name)?.get()?)?)
    }

    /// Write a declared field.
    pub fn set<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), ContextError> {
        self.def(name)?.set(value)
    }

    /// Scope builder bound to this class's context, with field-name
    /// resolution for seeds and overrides.
    pub fn scope(&self) -> ScopeBuilder {
        ScopeBuilder::for_class(self)
    }

    /// Mutable-mapping projection over this class's fields.
    pub fn as_mapping(&self) -> ContextMapping {
        ContextMapping::new(self)
    }
}

impl fmt::Debug for ContextClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextClass")
            .field("name", &self.inner.name)
            .field("context", &self.inner.context)
            .field("fields", &self.inner.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Declaration surface for a context class.
pub struct ClassBuilder {
    name: String,
    context: Option<Context>,
    bases: Vec<ContextClass>,
    declared: Vec<(String, FieldSpec)>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ClassBuilder {
            name: name.into(),
            context: None,
            bases: Vec::new(),
            declared: Vec::new(),
        }
    }

    /// Bind the class to an explicit context instead of the default one.
    pub fn context(mut self, context: &Context) -> Self {
        self.context = Some(context.clone());
        self
    }

    /// Inherit the full ordered field list of `base`.
    pub fn extends(mut self, base: &ContextClass) -> Self {
        self.bases.push(base.clone());
        self
    }

    /// Declare a field with no default.
    pub fn field(self, name: impl Into<String>) -> Self {
        self.field_with(name, FieldSpec::new())
    }

    /// Declare a field from a full spec.
    pub fn field_with(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.declared.push((name.into(), spec));
        self
    }

    /// Validate the declaration, bind the fields, register the class.
    ///
    /// Fails fast on default/factory conflicts, mutable defaults, duplicate
    /// field names, and context mismatches across the inheritance chain.
    pub fn build(self) -> Result<ContextClass, DeclarationError> {
        let mut context = self.context;
        for base in &self.bases {
            match &context {
                None => context = Some(base.context().clone()),
                Some(bound) if bound == base.context() => {}
                Some(bound) => {
                    return Err(DeclarationError::ContextMismatch {
                        class: self.name.clone(),
                        base: base.name().to_string(),
                        bound: bound.name().to_string(),
                        expected: base.context().name().to_string(),
                    })
                }
            }
        }
        let context = context.unwrap_or_else(|| default_context().clone());

        let mut fields: FieldMap = IndexMap::new();
        for base in &self.bases {
            for (name, def) in base.fields() {
                // Shared accessor: the key stays namespaced by the declaring
                // class, so base and derived handles hit the same slot.
                fields.insert(name.clone(), def.clone());
            }
        }
        // Repeats within one declaration are duplicates even when the name
        // overrides a base field; overriding once is fine.
        let mut own_names: HashSet<String> = HashSet::new();
        for (name, spec) in self.declared {
            if !own_names.insert(name.clone()) {
                return Err(DeclarationError::DuplicateField {
                    class: self.name.clone(),
                    field: name,
                });
            }
            let def = spec.bind(&self.name, &name, &context)?;
            fields.insert(name, Arc::new(def));
        }

        let class = ContextClass {
            inner: Arc::new(ClassInner {
                name: self.name,
                context,
                fields,
            }),
        };
        debug!(
            class = class.name(),
            context = class.context().name(),
            fields = class.fields().len(),
            "registered context class"
        );
        registry().write().insert(class.name().to_string(), class.clone());
        Ok(class)
    }
}

static REGISTRY: Lazy<RwLock<HashMap<String, ContextClass>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn registry() -> &'static RwLock<HashMap<String, ContextClass>> {
    &REGISTRY
}

/// Whether `name` refers to a registered context class.
pub fn is_context_class(name: &str) -> bool {
    registry().read().contains_key(name)
}

/// Registered class handle by name.
pub fn lookup(name: &str) -> Result<ContextClass, ContextError> {
    registry()
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| ContextError::NotAContextClass(name.to_string()))
}

/// Ordered field map of a registered class.
pub fn fields_of(name: &str) -> Result<FieldMap, ContextError> {
    Ok(lookup(name)?.fields().clone())
}
