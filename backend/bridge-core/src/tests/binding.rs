// Unit tests for binding sources
// Tests name validation, prefixing, aggregates and deferred materialization

use crate::binding::{Aggregate, BindingSource, Members, validate_name};
use crate::dispatch::{Arg, Binding};
use crate::error::BindingError;
use crate::ipc::SessionContext;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;

struct Greeter {
    greeting: String,
}

impl Aggregate for Greeter {
    fn export(self: Arc<Self>, members: &mut Members) {
        let this = Arc::clone(&self);
        members
            .method("Greet", move |name: String| {
                let this = Arc::clone(&this);
                async move { format!("{}, {name}", this.greeting) }
            })
            .method("helper", || async { 1 })
            .field("Greeting", {
                let greeting = self.greeting.clone();
                move || greeting.clone()
            });
    }
}

struct Hidden;

impl Aggregate for Hidden {
    fn export(self: Arc<Self>, members: &mut Members) {
        members.method("internal", || async {});
    }
}

fn add() -> Binding {
    Binding::new(|a: i64, b: i64| async move { a + b }).expect("valid binding")
}

fn keys(source: &BindingSource) -> Vec<String> {
    source
        .materialize(&SessionContext::detached())
        .expect("materializes")
        .into_keys()
        .collect()
}

// ============================================
// NAMES
// ============================================

/// **VALUE**: Verifies the two front-end names can never be bound.
///
/// **WHY THIS MATTERS**: `Bridge` receives the ready notification and `context`
/// holds the front end's token objects. Binding over either breaks the client.
///
/// **BUG THIS CATCHES**: Would catch a check that only compares whole names and
/// lets `context.cancel` or a `Bridge` prefix through.
#[test]
fn given_reserved_names_when_validated_then_rejected() {
    for name in ["Bridge", "context", "context.cancel", "Bridge.ready"] {
        assert!(
            matches!(validate_name(name), Err(BindingError::ReservedName { .. })),
            "{name} should be reserved"
        );
    }
    let prefixed = BindingSource::from_binding("add", add())
        .expect("valid")
        .with_prefix("context");
    assert!(matches!(prefixed, Err(BindingError::ReservedName { .. })));
}

/// **VALUE**: Verifies malformed names are construction errors.
///
/// **BUG THIS CATCHES**: Would catch an empty segment (`a..b`) or a leading digit
/// slipping into the announced names, where the client cannot define them.
#[test]
fn given_malformed_names_when_validated_then_rejected() {
    for name in ["", "1abc", "a..b", "a.", "has space", "dash-ed"] {
        assert!(
            matches!(validate_name(name), Err(BindingError::InvalidName { .. })),
            "{name:?} should be invalid"
        );
    }
    for name in ["add", "$scope", "_private", "app.user.save", "Bridged"] {
        assert!(validate_name(name).is_ok(), "{name} should be valid");
    }
}

// ============================================
// NAMES MATCH MATERIALIZATION
// ============================================

/// **VALUE**: Verifies `names()` is exactly the key set of `materialize()` for
/// function, map and aggregate sources.
///
/// **WHY THIS MATTERS**: The server announces `names()` in the client script
/// before any session exists; a session then binds `materialize()`. A mismatch
/// means the page calls functions that were never bound.
///
/// **BUG THIS CATCHES**: Would catch private aggregate members leaking into the
/// names, or names not lower-cased the same way in both paths.
#[test]
fn given_valid_sources_when_names_then_equal_materialized_keys() {
    let function = BindingSource::from_binding("add", add()).expect("valid");
    let map = BindingSource::from_map([("add", add()), ("sum", add())]).expect("valid");
    let aggregate = BindingSource::from_aggregate(Arc::new(Greeter {
        greeting: "hello".to_string(),
    }))
    .expect("valid");

    for source in [&function, &map, &aggregate] {
        assert_eq!(source.names(), keys(source));
    }
    assert_eq!(aggregate.names(), vec!["greet", "greeting"]);
}

/// **VALUE**: Verifies an aggregate exposing nothing is rejected.
///
/// **BUG THIS CATCHES**: Would catch a source silently binding zero names, which
/// the caller almost certainly did not intend.
#[test]
fn given_aggregate_without_exported_members_when_built_then_empty_names_error() {
    let result = BindingSource::from_aggregate(Arc::new(Hidden));
    assert!(matches!(result, Err(BindingError::EmptyNames { .. })));
}

// ============================================
// PREFIX
// ============================================

/// **VALUE**: Verifies a prefixed source announces `prefix.name` and its
/// callables behave exactly like the inner ones.
///
/// **BUG THIS CATCHES**: Would catch the prefix wrapper changing arity, or the
/// names and the materialized keys disagreeing on the separator.
#[tokio::test]
async fn given_prefixed_source_when_called_then_behaves_like_inner() {
    // GIVEN: A map source wrapped in a prefix
    let inner = BindingSource::from_map([("add", add())]).expect("valid");
    let prefixed = inner.clone().with_prefix("math").expect("valid prefix");

    // THEN: Names are prefixed
    assert_eq!(prefixed.names(), vec!["math.add"]);
    assert_eq!(prefixed.names(), keys(&prefixed));

    // WHEN: Both callables are invoked with the same arguments
    let context = SessionContext::detached();
    let plain = inner.materialize(&context).expect("inner")["add"].clone();
    let wrapped = prefixed.materialize(&context).expect("prefixed")["math.add"].clone();
    let args = || vec![Arg::Value(json!(2)), Arg::Value(json!(5))];

    // THEN: Same signature, same result
    assert_eq!(plain.signature(), wrapped.signature());
    assert_eq!(
        plain.call(args()).await.expect("inner call"),
        wrapped.call(args()).await.expect("prefixed call")
    );
}

// ============================================
// DEFERRED
// ============================================

/// **VALUE**: Verifies a deferred source whose factory yields other names fails
/// to materialize, naming what is missing and what is unexpected.
///
/// **WHY THIS MATTERS**: Deferred names are announced up front; a factory that
/// drifts from the declaration would leave the page with dead functions.
///
/// **BUG THIS CATCHES**: Would catch a subset check that ignores extra names.
#[test]
fn given_deferred_mismatch_when_materialized_then_error_lists_difference() {
    let deferred = BindingSource::deferred(["add", "sub"], |_context: &SessionContext| {
        BindingSource::from_map([("add", add()), ("mul", add())])
    })
    .expect("valid declaration");

    let error = deferred
        .materialize(&SessionContext::detached())
        .expect_err("mismatch");

    let message = error.to_string();
    assert!(matches!(error, BindingError::DeferredMismatch { .. }));
    assert!(message.contains("missing: [sub]"), "{message}");
    assert!(message.contains("unexpected: [mul]"), "{message}");
}

/// **VALUE**: Verifies the factory sees the session context and the prototype
/// supplies the declared names.
///
/// **BUG THIS CATCHES**: Would catch the factory being called with a stale or
/// detached context instead of the connecting session's.
#[tokio::test]
async fn given_deferred_like_prototype_when_materialized_then_factory_sees_context() {
    let prototype = BindingSource::from_aggregate(Arc::new(Greeter {
        greeting: String::new(),
    }))
    .expect("prototype");
    let deferred = BindingSource::deferred_like(&prototype, |context: &SessionContext| {
        let greeting = context.query_param("greeting").unwrap_or_default();
        BindingSource::from_aggregate(Arc::new(Greeter { greeting }))
    })
    .expect("valid declaration");
    assert_eq!(deferred.names(), prototype.names());

    let context = SessionContext::new("/bridge?greeting=hi", None);
    let bindings = deferred.materialize(&context).expect("materializes");
    let names: BTreeSet<&String> = bindings.keys().collect();
    assert_eq!(names.len(), 2);

    let greeting = bindings["greeting"].call(Vec::new()).await.expect("getter");
    assert_eq!(greeting, json!("hi"));
}

/// **VALUE**: Verifies an empty declaration is refused up front.
#[test]
fn given_no_names_when_deferred_then_empty_names_error() {
    let result = BindingSource::deferred(Vec::<String>::new(), |_context: &SessionContext| {
        BindingSource::from_map([("add", add())])
    });
    assert!(matches!(result, Err(BindingError::EmptyNames { .. })));
}

// ============================================
// RESULTS
// ============================================

/// **VALUE**: Verifies a handler with more than two results is refused when the
/// binding is built.
///
/// **BUG THIS CATCHES**: Would catch nested results slipping through and being
/// flattened into an ambiguous reply at call time.
#[test]
fn given_nested_result_handler_when_bound_then_too_many_results() {
    let result = BindingSource::from_function("nested", || async {
        Ok::<Result<i64, String>, String>(Ok(1))
    });
    assert!(matches!(result, Err(BindingError::TooManyResults { count: 3, .. })));
}
