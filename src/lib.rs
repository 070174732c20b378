//! Contextclass: typed, scope-isolated context fields for cooperative tasks.
//!
//! A context class declares named fields whose storage lives in an isolated,
//! inheritable, per-execution-context mapping. Concurrently scheduled
//! cooperative tasks each observe an independent value for the same field,
//! and nested scopes override and restore values transactionally.
//!
//! ```
//! use contextclass::{ClassBuilder, ContextError, FieldSpec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = ClassBuilder::new("Request")
//!     .field("user")
//!     .field_with("retries", FieldSpec::new().default(3))
//!     .build()?;
//!
//! assert!(matches!(ctx.get::<String>("user"), Err(ContextError::Unset(_))));
//! ctx.set("user", "alice")?;
//! assert_eq!(ctx.get::<String>("user")?, "alice");
//! assert_eq!(ctx.get::<i64>("retries")?, 3);
//!
//! {
//!     let _scope = ctx.scope().set("retries", 0).enter()?;
//!     assert_eq!(ctx.get::<i64>("retries")?, 0);
//! }
//! assert_eq!(ctx.get::<i64>("retries")?, 3);
//! # Ok(())
//! # }
//! ```

pub mod class;
pub mod context;
pub mod error;
pub mod field;
pub mod mapping;
pub mod scope;
pub mod snapshot;
pub mod task;

pub use class::{fields_of, is_context_class, lookup, ClassBuilder, ContextClass, FieldMap};
pub use context::{default_context, Context, ContextId, RestoreToken};
pub use error::{ContextError, DeclarationError};
pub use field::{Field, FieldDef, FieldSpec};
pub use mapping::{as_mapping, as_mapping_of, ContextMapping};
pub use scope::{default_scope, ScopeBuilder, ScopeGuard};
pub use task::{fork_context, ContextPropagate, WithContext};
