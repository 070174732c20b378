//! Scope entry/exit semantics across contexts and classes

use contextclass::{default_scope, ClassBuilder, Context, ContextError, FieldSpec};
use serde_json::json;
use std::collections::HashMap;

use super::init_tracing;

#[test]
fn test_values_set_inside_a_scope_vanish_on_exit() {
    init_tracing();
    let class = ClassBuilder::new("ItScopeCtx")
        .context(&Context::new("it-scope"))
        .field("attr")
        .build()
        .unwrap();

    class.set("attr", &"outer").unwrap();
    {
        let _scope = class.scope().enter().unwrap();
        class.set("attr", &"inner").unwrap();
        assert_eq!(class.get::<String>("attr").unwrap(), "inner");
    }
    assert_eq!(class.get::<String>("attr").unwrap(), "outer");
}

#[test]
fn test_nested_scopes_restore_in_lifo_order() {
    init_tracing();
    let class = ClassBuilder::new("ItNestedScopeCtx")
        .context(&Context::new("it-nested"))
        .field("n")
        .build()
        .unwrap();

    class.set("n", &0).unwrap();
    {
        let _outer = class.scope().set("n", 1).enter().unwrap();
        assert_eq!(class.get::<i64>("n").unwrap(), 1);
        {
            let _inner = class.scope().set("n", 2).enter().unwrap();
            assert_eq!(class.get::<i64>("n").unwrap(), 2);
        }
        assert_eq!(class.get::<i64>("n").unwrap(), 1);
    }
    assert_eq!(class.get::<i64>("n").unwrap(), 0);
}

#[test]
fn test_seeded_scope_discards_values_outside_the_seed() {
    init_tracing();
    let ctx = Context::new("it-seeded");
    let class = ClassBuilder::new("ItSeededCtx")
        .context(&ctx)
        .field("kept")
        .field("dropped")
        .build()
        .unwrap();

    class.set("kept", &"old").unwrap();
    class.set("dropped", &"old").unwrap();

    let mut seed = HashMap::new();
    seed.insert("kept".to_string(), json!("seeded"));
    {
        let _scope = class.scope().seed(seed).enter().unwrap();
        assert_eq!(class.get::<String>("kept").unwrap(), "seeded");
        assert!(matches!(
            class.get::<String>("dropped"),
            Err(ContextError::Unset(_))
        ));
    }
    assert_eq!(class.get::<String>("kept").unwrap(), "old");
    assert_eq!(class.get::<String>("dropped").unwrap(), "old");
}

#[test]
fn test_scope_exit_restores_after_errors() {
    init_tracing();
    let class = ClassBuilder::new("ItErrScopeCtx")
        .context(&Context::new("it-err-scope"))
        .field("attr")
        .build()
        .unwrap();
    class.set("attr", &"before").unwrap();

    fn failing_body(class: &contextclass::ContextClass) -> Result<(), ContextError> {
        let _scope = class.scope().enter()?;
        class.set("attr", &"during")?;
        // Early return through `?`: the guard still restores.
        class.get::<i64>("no_such_field")?;
        Ok(())
    }

    assert!(failing_body(&class).is_err());
    assert_eq!(class.get::<String>("attr").unwrap(), "before");
}

#[test]
fn test_default_scope_round_trips_default_context_classes() {
    init_tracing();
    let class = ClassBuilder::new("ItDefaultScopedCtx")
        .field("attr")
        .build()
        .unwrap();

    {
        let _scope = default_scope().enter().unwrap();
        class.set("attr", &42).unwrap();
        assert_eq!(class.get::<i64>("attr").unwrap(), 42);
    }
    assert!(matches!(
        class.get::<i64>("attr"),
        Err(ContextError::Unset(_))
    ));
}

#[test]
fn test_independent_contexts_scope_independently() {
    init_tracing();
    let ctx_a = Context::new("it-multi-a");
    let ctx_b = Context::new("it-multi-b");
    let a = ClassBuilder::new("ItMultiA")
        .context(&ctx_a)
        .field("v")
        .build()
        .unwrap();
    let b = ClassBuilder::new("ItMultiB")
        .context(&ctx_b)
        .field("v")
        .build()
        .unwrap();

    a.set("v", &"a0").unwrap();
    b.set("v", &"b0").unwrap();
    {
        let _scope_a = a.scope().set("v", "a1").enter().unwrap();
        assert_eq!(a.get::<String>("v").unwrap(), "a1");
        // Scoping one context leaves the other untouched.
        assert_eq!(b.get::<String>("v").unwrap(), "b0");
    }
    assert_eq!(a.get::<String>("v").unwrap(), "a0");
}

#[test]
fn test_fresh_lineages_get_independent_default_copies() {
    init_tracing();
    let class = ClassBuilder::new("ItCopyCtx")
        .context(&Context::new("it-copy"))
        .field_with(
            "items",
            FieldSpec::new().default_factory(|| vec!["seed".to_string()]),
        )
        .build()
        .unwrap();
    let items = class.field::<Vec<String>>("items").unwrap();

    {
        let _scope = class.scope().set("items", json!(["seed"])).enter().unwrap();
        let mut mine = items.get().unwrap();
        mine.push("first".to_string());
        items.set(&mine).unwrap();
        assert_eq!(items.get().unwrap(), ["seed", "first"]);
    }

    // A second, unrelated lineage materializes its own copy.
    {
        let _scope = class.scope().seed(HashMap::new()).enter().unwrap();
        assert_eq!(items.get().unwrap(), ["seed"]);
    }
}
