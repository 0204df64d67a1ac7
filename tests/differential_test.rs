//! Differential tests: verdicts must agree with the `jsonschema` crate.

use combined_schema::{is_valid, parse_schema, LoadError};
use serde_json::{json, Value};

fn assert_agrees(schema: &Value, instances: &[Value]) {
    let graph = parse_schema(schema).unwrap();
    let reference = jsonschema::validator_for(schema).unwrap();

    for instance in instances {
        assert_eq!(
            is_valid(&graph, instance),
            reference.is_valid(instance),
            "verdicts differ for schema {} and instance {}",
            schema,
            instance
        );
    }
}

fn instances() -> Vec<Value> {
    vec![
        json!(null),
        json!(true),
        json!(0),
        json!(-3),
        json!(2.5),
        json!(42),
        json!(""),
        json!("ab"),
        json!("abcdefgh"),
        json!([]),
        json!([1, "two"]),
        json!({}),
        json!({ "card": "4111111111111111" }),
        json!({ "iban": "DE89" }),
        json!({ "card": "4111", "iban": "DE89" }),
        json!({ "card": 7 }),
    ]
}

#[test]
fn all_of() {
    assert_agrees(
        &json!({ "allOf": [{ "type": "string" }, { "minLength": 2 }, { "maxLength": 4 }] }),
        &instances(),
    );
}

#[test]
fn any_of() {
    assert_agrees(
        &json!({ "anyOf": [{ "type": "null" }, { "type": "integer", "minimum": 0 }] }),
        &instances(),
    );
}

#[test]
fn one_of() {
    assert_agrees(
        &json!({
            "type": "object",
            "oneOf": [{ "required": ["card"] }, { "required": ["iban"] }]
        }),
        &instances(),
    );
}

#[test]
fn one_of_with_overlapping_branches() {
    assert_agrees(
        &json!({ "oneOf": [{ "type": "number" }, { "type": "integer" }] }),
        &instances(),
    );
}

#[test]
fn nested_combinators() {
    assert_agrees(
        &json!({
            "anyOf": [
                { "allOf": [{ "type": "string" }, { "maxLength": 2 }] },
                { "oneOf": [{ "type": "array" }, { "type": "boolean" }] },
                { "properties": { "card": { "type": "string" } }, "required": ["card"] }
            ]
        }),
        &instances(),
    );
}

#[test]
fn type_lists() {
    assert_agrees(&json!({ "type": ["string", "null"] }), &instances());
    assert_agrees(
        &json!({ "type": ["integer", "array"], "minimum": 1, "maxItems": 1 }),
        &instances(),
    );
}

#[test]
fn keywords_beside_combinators() {
    assert_agrees(
        &json!({
            "type": "object",
            "properties": { "card": { "type": "string", "minLength": 12 } },
            "additionalProperties": false,
            "anyOf": [{ "required": ["card"] }, { "required": ["iban"] }]
        }),
        &instances(),
    );
}

#[test]
fn const_enum_and_false() {
    assert_agrees(
        &json!({ "anyOf": [{ "const": 0 }, { "enum": ["ab", null] }] }),
        &instances(),
    );
    assert_agrees(&json!({ "oneOf": [false, true] }), &instances());
    assert_agrees(&json!({ "allOf": [true, { "not": {} }] }), &instances());
}

#[test]
fn array_items() {
    assert_agrees(
        &json!({
            "type": "array",
            "items": { "anyOf": [{ "type": "integer" }, { "type": "string" }] },
            "minItems": 1
        }),
        &instances(),
    );
}

#[test]
fn unmodelled_assertions_fail_to_load() {
    let documents = [
        json!({ "type": "string", "pattern": "^a" }),
        json!({ "anyOf": [{ "type": "integer", "multipleOf": 2 }] }),
        json!({ "type": "number", "exclusiveMinimum": 5 }),
        json!({ "type": "object", "minProperties": 1 }),
    ];
    for document in &documents {
        // The reference validator understands these keywords; dropping them
        // would make the verdicts diverge.
        assert!(jsonschema::validator_for(document).is_ok());
        assert!(
            matches!(
                parse_schema(document),
                Err(LoadError::UnsupportedKeyword { .. })
            ),
            "{} should not load",
            document
        );
    }
}
