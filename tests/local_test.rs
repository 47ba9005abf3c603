mod common;

use doclift::{LiftConfig, LiftError, Lifter, lifter, recipe, rule, transform, Lift};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_access_seeded_local_storage() {
    let lift = lifter([
        rule::set("OK").dst("$.status"),
        rule::src("@.id").dst("$.ident"),
    ])
    .unwrap();
    let got = lift
        .invoke_with(&json!({}), Some(json!({})), Some(json!({"local": {"id": "ABC"}})))
        .unwrap();
    assert_eq!(got, json!({"status": "OK", "ident": "ABC"}));
}

#[test]
fn test_local_storage_round_trip() {
    let lift = lifter([
        rule::src("$.ident").dst("@.id").via(transform::map(common::lower)),
        rule::set("OK").dst("$.status"),
        rule::src("@.id").dst("$.ID").via(transform::map(common::reverse)),
    ])
    .unwrap();
    assert_eq!(
        lift.invoke(&json!({"ident": "XYZ"})).unwrap(),
        json!({"ID": "zyx", "status": "OK"})
    );
}

#[test]
fn test_nested_recipes_get_a_private_copy() {
    let inner = lifter([
        rule::src("$.ident").dst("@.id").via(transform::map(common::lower)),
        rule::src("@.id").dst("$.ID").via(transform::map(common::reverse)),
    ])
    .unwrap();
    let lift = lifter(recipe![
        rule::src("$.ident").dst("@.id").via(transform::map(common::lower)),
        rule::src("$.parts[*]").via(std::sync::Arc::new(inner)),
        rule::src("@.id").dst("$.ID").via(transform::map(common::reverse)),
    ])
    .unwrap();

    let doc = json!({
        "ident": "XYZ",
        "parts": [{"ident": "ABC"}, {"ident": "DEF"}, {"ident": "GHI"}]
    });
    assert_eq!(
        lift.invoke(&doc).unwrap(),
        json!({
            "ID": "zyx",
            "parts": [{"ID": "cba"}, {"ID": "fed"}, {"ID": "ihg"}]
        })
    );
}

#[test]
fn test_nested_recipe_reads_enclosing_local() {
    let lift = lifter([
        rule::src("$.tenant").dst("@.tenant"),
        rule::src("$.items[*]").via_recipe([
            rule::src("$.sku"),
            rule::src("@.tenant").dst("$.tenant"),
        ]),
    ])
    .unwrap();
    let doc = json!({"tenant": "acme", "items": [{"sku": 1}, {"sku": 2}]});
    assert_eq!(
        lift.invoke(&doc).unwrap(),
        json!({"items": [
            {"sku": 1, "tenant": "acme"},
            {"sku": 2, "tenant": "acme"}
        ]})
    );
}

#[test]
fn test_local_values_never_reach_output_unless_copied() {
    let lift = lifter([
        rule::src("$.secret").dst("@.secret"),
        rule::src("$.public"),
    ])
    .unwrap();
    assert_eq!(
        lift.invoke(&json!({"secret": 1, "public": 2})).unwrap(),
        json!({"public": 2})
    );
}

#[test]
fn test_local_multivalue_and_wildcards() {
    let lift = lifter([
        rule::src("$.rows[*].tag").dst("@.tags").mv(),
        rule::src("@.tags[*]").dst("$.labels").mv(),
    ])
    .unwrap();
    let doc = json!({"rows": [{"tag": "a"}, {"tag": "b"}]});
    assert_eq!(lift.invoke(&doc).unwrap(), json!({"labels": ["a", "b"]}));
}

#[test]
fn test_custom_local_sigil() {
    let config = LiftConfig {
        local_sigil: '%',
        ..LiftConfig::default()
    };
    let lift = Lifter::with_config(
        [rule::src("$.id").dst("%.id"), rule::src("%.id").dst("$.copy")],
        config,
    )
    .unwrap();
    assert_eq!(lift.invoke(&json!({"id": 9})).unwrap(), json!({"copy": 9}));
}

#[test]
fn test_context_parameters_reach_transforms() {
    let lift = lifter([rule::src("$.name").dst("$.greeting").via(transform::func(
        |value, _, context| {
            let prefix = context
                .param("prefix")
                .and_then(|v| v.as_str())
                .unwrap_or("Hi");
            Ok(json!(format!("{} {}", prefix, value.as_str().unwrap_or_default())))
        },
    ))])
    .unwrap();
    let got = lift
        .invoke_with(&json!({"name": "Syd"}), None, Some(json!({"prefix": "Hello"})))
        .unwrap();
    assert_eq!(got, json!({"greeting": "Hello Syd"}));
    assert_eq!(
        lift.invoke(&json!({"name": "Syd"})).unwrap(),
        json!({"greeting": "Hi Syd"})
    );
}

#[test]
fn test_context_seed_must_be_an_object() {
    let lift = lifter([rule::src("$")]).unwrap();
    assert!(matches!(
        lift.invoke_with(&json!({}), None, Some(json!(3))),
        Err(LiftError::InvalidContextSeed(_))
    ));
}
