mod common;

use std::sync::Arc;

use doclift::{
    LiftConfig, LiftError, Lifter, Pipe, PipeMember, TransformRegistry, lifter, pipe, recipe,
    rule, Lift,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn rename(from: &str, to: &str) -> Lifter {
    lifter([rule::src(from).dst(to)]).unwrap()
}

#[test]
fn test_simple_pipe() {
    let lift = pipe([rename("$.id", "$.ident"), rename("$.ident", "$.ID")]);
    assert_eq!(lift.invoke(&json!({"id": "ABC"})).unwrap(), json!({"ID": "ABC"}));
}

#[test]
fn test_empty_pipe() {
    let lift = pipe(Vec::<Lifter>::new());
    let doc = json!({"id": "ABC"});
    assert_eq!(lift.invoke(&doc).unwrap(), doc);
}

#[test]
fn test_nested_pipes_compose() {
    let inner = pipe([rename("$.a", "$.b"), rename("$.b", "$.c")]);
    let outer = pipe(vec![
        PipeMember::from(inner),
        PipeMember::from(rename("$.c", "$.d")),
    ]);
    assert_eq!(outer.invoke(&json!({"a": 1})).unwrap(), json!({"d": 1}));
}

#[test]
fn test_pipe_stages_share_context_parameters() {
    let first = lifter([rule::src("@.who").dst("$.first")]).unwrap();
    let second = lifter([rule::src("$.first"), rule::src("@.who").dst("$.second")]).unwrap();
    let lift = pipe([first, second]);
    let got = lift
        .invoke_with(&json!({}), None, Some(json!({"local": {"who": "me"}})))
        .unwrap();
    assert_eq!(got, json!({"first": "me", "second": "me"}));
}

#[test]
fn test_pipe_as_via_transform() {
    let cleanup = pipe([
        rename("$.raw", "$.trimmed"),
        lifter([rule::src("$.trimmed").dst("$.value")]).unwrap(),
    ]);
    let lift = lifter([rule::src("$.items[*]").dst("$.values").mv().via(Arc::new(cleanup))]).unwrap();
    let doc = json!({"items": [{"raw": 1}, {"raw": 2}]});
    assert_eq!(
        lift.invoke(&doc).unwrap(),
        json!({"values": [{"value": 1}, {"value": 2}]})
    );
}

#[test]
fn test_pipe_as_recipe_entry() {
    let stage = pipe([rename("$.id", "$.ident")]);
    let lift = lifter(recipe![stage, rule::set("x").dst("$.kind")]).unwrap();
    assert_eq!(
        lift.invoke(&json!({"id": 4})).unwrap(),
        json!({"ident": 4, "kind": "x"})
    );
}

#[test]
fn test_declarative_pipe() {
    let registry = TransformRegistry::with_builtins();
    let lift = Pipe::from_value(
        &json!([
            [{"src": "$.name", "dst": "$.title", "via": "uppercase"}],
            [{"src": "$.title", "dst": "$.heading"}]
        ]),
        &registry,
        LiftConfig::default(),
    )
    .unwrap();
    assert_eq!(
        lift.invoke(&json!({"name": "report"})).unwrap(),
        json!({"heading": "REPORT"})
    );
}

#[test]
fn test_bad_pipe_member() {
    let registry = TransformRegistry::new();
    let err = Pipe::from_value(&json!([{}]), &registry, LiftConfig::default()).unwrap_err();
    assert!(matches!(err, LiftError::InvalidPipeMember { index: 0, .. }));
    assert!(err.to_string().to_lowercase().contains("pipe member"));
}
