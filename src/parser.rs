//! Schema parsing - turns a JSON Schema document into a [`Schema`] graph.
//!
//! Composition keywords become [`CombinedSchema`] nodes. Two shapes are
//! desugared into synthetic nodes:
//!
//! - `"type": [..]` with several names becomes a synthetic `anyOf` with one
//!   leaf per type;
//! - an object carrying more than one constraint group (for example `allOf`
//!   next to `"type": "object"`) becomes a synthetic `allOf` of the explicit
//!   combined nodes followed by the leaves.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::combined::{CombinedSchema, CombinedSchemaBuilder};
use crate::criterion::Criterion;
use crate::error::LoadError;
use crate::schema::{
    ArraySchema, ConstSchema, EnumSchema, NumberSchema, ObjectSchema, Schema, SchemaMeta,
    StringSchema,
};
use crate::types::{escape_pointer_segment, json_type_name, COMBINATOR_KEYWORDS};

const STRING_KEYWORDS: &[&str] = &["minLength", "maxLength"];
const NUMBER_KEYWORDS: &[&str] = &["minimum", "maximum"];
const OBJECT_KEYWORDS: &[&str] = &["properties", "required", "additionalProperties"];
const ARRAY_KEYWORDS: &[&str] = &["items", "minItems", "maxItems"];
const LEAF_KEYWORDS: &[&str] = &["type", "not", "const", "enum"];
/// Keywords that never constrain an instance.
const ANNOTATION_KEYWORDS: &[&str] = &[
    "$schema",
    "$id",
    "title",
    "description",
    "$comment",
    "default",
    "examples",
    "format",
    "$defs",
];

/// Parse a schema document into a schema graph.
///
/// The document is checked against its metaschema first, so structurally
/// invalid documents are rejected before any node is built.
///
/// # Errors
///
/// Returns `LoadError::UnsupportedKeyword` for `$ref` and any other keyword
/// the graph cannot represent, `LoadError::InvalidSchema` if the metaschema
/// rejects the document, and other `LoadError` variants for keyword values
/// this parser cannot interpret.
pub fn parse_schema(document: &Value) -> Result<Schema, LoadError> {
    // Runs first: compiling a validator would try to resolve `$ref`.
    reject_unsupported(document, "")?;
    jsonschema::validator_for(document).map_err(|e| LoadError::InvalidSchema {
        message: e.to_string(),
    })?;
    parse_value(document, "")
}

fn is_supported(keyword: &str) -> bool {
    ANNOTATION_KEYWORDS.contains(&keyword)
        || LEAF_KEYWORDS.contains(&keyword)
        || COMBINATOR_KEYWORDS.contains(&keyword)
        || [STRING_KEYWORDS, NUMBER_KEYWORDS, OBJECT_KEYWORDS, ARRAY_KEYWORDS]
            .iter()
            .any(|group| group.contains(&keyword))
}

/// Fail on the first keyword this parser would otherwise drop, walking every
/// position that holds a subschema.
fn reject_unsupported(value: &Value, path: &str) -> Result<(), LoadError> {
    let Value::Object(map) = value else {
        return Ok(());
    };

    if let Some(keyword) = map.keys().find(|keyword| !is_supported(keyword)) {
        return Err(LoadError::UnsupportedKeyword {
            path: display_path(path),
            keyword: keyword.clone(),
        });
    }

    for &keyword in COMBINATOR_KEYWORDS {
        if let Some(Value::Array(items)) = map.get(keyword) {
            let combinator_path = child_path(path, keyword);
            for (i, item) in items.iter().enumerate() {
                reject_unsupported(item, &child_path(&combinator_path, &i.to_string()))?;
            }
        }
    }

    if let Some(Value::Object(properties)) = map.get("properties") {
        let props_path = child_path(path, "properties");
        for (name, property) in properties {
            let prop_path = child_path(&props_path, &escape_pointer_segment(name));
            reject_unsupported(property, &prop_path)?;
        }
    }

    for keyword in ["items", "not", "additionalProperties"] {
        if let Some(subschema) = map.get(keyword) {
            reject_unsupported(subschema, &child_path(path, keyword))?;
        }
    }

    Ok(())
}

fn parse_value(value: &Value, path: &str) -> Result<Schema, LoadError> {
    match value {
        Value::Bool(true) => Ok(Schema::Empty(SchemaMeta::default())),
        Value::Bool(false) => Ok(Schema::False(SchemaMeta::default())),
        Value::Object(map) => parse_object(map, path),
        other => Err(LoadError::UnexpectedType {
            path: display_path(path),
            expected: "object or boolean",
            actual: json_type_name(other).to_string(),
        }),
    }
}

fn parse_object(map: &Map<String, Value>, path: &str) -> Result<Schema, LoadError> {
    if map.contains_key("$ref") {
        return Err(LoadError::UnsupportedKeyword {
            path: display_path(path),
            keyword: "$ref".to_string(),
        });
    }

    let meta = parse_meta(map, path)?;

    let mut parts = Vec::new();
    for &keyword in COMBINATOR_KEYWORDS {
        if let Some(value) = map.get(keyword) {
            parts.push(parse_combinator(keyword, value, &child_path(path, keyword))?);
        }
    }
    parts.extend(parse_leaves(map, path)?);

    let schema = match parts.len() {
        0 => Schema::Empty(SchemaMeta::default()),
        1 => parts.remove(0),
        _ => {
            debug!(
                path = %display_path(path),
                parts = parts.len(),
                "desugaring into synthetic allOf"
            );
            build(CombinedSchema::all_of(parts).synthetic(true), path)?
        }
    };

    Ok(schema.with_meta(meta))
}

fn parse_meta(map: &Map<String, Value>, path: &str) -> Result<SchemaMeta, LoadError> {
    Ok(SchemaMeta {
        id: optional_string(map, "$id", path)?,
        title: optional_string(map, "title", path)?,
        description: optional_string(map, "description", path)?,
    })
}

fn parse_combinator(keyword: &str, value: &Value, path: &str) -> Result<Schema, LoadError> {
    let items = value.as_array().ok_or_else(|| LoadError::UnexpectedType {
        path: display_path(path),
        expected: "array",
        actual: json_type_name(value).to_string(),
    })?;

    let subschemas = items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_value(item, &child_path(path, &i.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    let mut builder = CombinedSchema::builder_with(subschemas);
    if let Some(criterion) = Criterion::from_keyword(keyword) {
        builder = builder.criterion(criterion);
    }
    build(builder, path)
}

fn build(builder: CombinedSchemaBuilder, path: &str) -> Result<Schema, LoadError> {
    builder
        .build()
        .map(Schema::Combined)
        .map_err(|source| LoadError::Build {
            path: display_path(path),
            source,
        })
}

/// Collect the non-combinator constraint groups of a schema object.
fn parse_leaves(map: &Map<String, Value>, path: &str) -> Result<Vec<Schema>, LoadError> {
    let mut leaves = Vec::new();

    match map.get("type") {
        Some(Value::String(name)) => {
            leaves.push(parse_typed(name, map, &child_path(path, "type"), path)?);
        }
        Some(Value::Array(names)) => {
            let type_path = child_path(path, "type");
            let typed = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let name_path = child_path(&type_path, &i.to_string());
                    match name {
                        Value::String(name) => parse_typed(name, map, &name_path, path),
                        other => Err(LoadError::UnexpectedType {
                            path: display_path(&name_path),
                            expected: "string",
                            actual: json_type_name(other).to_string(),
                        }),
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;

            if typed.len() == 1 {
                leaves.extend(typed);
            } else {
                debug!(
                    path = %display_path(&type_path),
                    types = typed.len(),
                    "desugaring type list into synthetic anyOf"
                );
                leaves.push(build(
                    CombinedSchema::any_of(typed).synthetic(true),
                    &type_path,
                )?);
            }
        }
        Some(other) => {
            return Err(LoadError::UnexpectedType {
                path: display_path(&child_path(path, "type")),
                expected: "string or array",
                actual: json_type_name(other).to_string(),
            });
        }
        None => {
            // Constraints without a type only apply to matching instances.
            if has_any(map, STRING_KEYWORDS) {
                leaves.push(Schema::String(parse_string(map, path, false)?));
            }
            if has_any(map, NUMBER_KEYWORDS) {
                leaves.push(Schema::Number(parse_number(map, path, false, false)?));
            }
            if has_any(map, OBJECT_KEYWORDS) {
                leaves.push(Schema::Object(parse_object_leaf(map, path, false)?));
            }
            if has_any(map, ARRAY_KEYWORDS) {
                leaves.push(Schema::Array(parse_array(map, path, false)?));
            }
        }
    }

    // Only the "reject everything" form of `not` is understood.
    match map.get("not") {
        None => {}
        Some(Value::Bool(true)) => leaves.push(Schema::False(SchemaMeta::default())),
        Some(Value::Object(negated)) if negated.is_empty() => {
            leaves.push(Schema::False(SchemaMeta::default()));
        }
        Some(_) => {
            return Err(LoadError::UnsupportedKeyword {
                path: display_path(&child_path(path, "not")),
                keyword: "not".to_string(),
            });
        }
    }

    if let Some(value) = map.get("const") {
        leaves.push(Schema::Const(ConstSchema {
            meta: SchemaMeta::default(),
            value: value.clone(),
        }));
    }

    if let Some(value) = map.get("enum") {
        let values = value.as_array().ok_or_else(|| LoadError::UnexpectedType {
            path: display_path(&child_path(path, "enum")),
            expected: "array",
            actual: json_type_name(value).to_string(),
        })?;
        leaves.push(Schema::Enum(EnumSchema {
            meta: SchemaMeta::default(),
            values: values.clone(),
        }));
    }

    Ok(leaves)
}

fn parse_typed(
    name: &str,
    map: &Map<String, Value>,
    type_path: &str,
    path: &str,
) -> Result<Schema, LoadError> {
    let schema = match name {
        "string" => Schema::String(parse_string(map, path, true)?),
        "number" => Schema::Number(parse_number(map, path, true, false)?),
        "integer" => Schema::Number(parse_number(map, path, true, true)?),
        "boolean" => Schema::Boolean(SchemaMeta::default()),
        "null" => Schema::Null(SchemaMeta::default()),
        "object" => Schema::Object(parse_object_leaf(map, path, true)?),
        "array" => Schema::Array(parse_array(map, path, true)?),
        unknown => {
            return Err(LoadError::UnknownType {
                path: display_path(type_path),
                value: unknown.to_string(),
            });
        }
    };
    Ok(schema)
}

fn parse_string(
    map: &Map<String, Value>,
    path: &str,
    requires_string: bool,
) -> Result<StringSchema, LoadError> {
    Ok(StringSchema {
        meta: SchemaMeta::default(),
        requires_string,
        min_length: optional_u64(map, "minLength", path)?,
        max_length: optional_u64(map, "maxLength", path)?,
    })
}

fn parse_number(
    map: &Map<String, Value>,
    path: &str,
    requires_number: bool,
    requires_integer: bool,
) -> Result<NumberSchema, LoadError> {
    Ok(NumberSchema {
        meta: SchemaMeta::default(),
        requires_number,
        requires_integer,
        minimum: optional_f64(map, "minimum", path)?,
        maximum: optional_f64(map, "maximum", path)?,
    })
}

fn parse_object_leaf(
    map: &Map<String, Value>,
    path: &str,
    requires_object: bool,
) -> Result<ObjectSchema, LoadError> {
    let mut properties = BTreeMap::new();
    if let Some(value) = map.get("properties") {
        let props_path = child_path(path, "properties");
        let props = value.as_object().ok_or_else(|| LoadError::UnexpectedType {
            path: display_path(&props_path),
            expected: "object",
            actual: json_type_name(value).to_string(),
        })?;
        for (name, prop) in props {
            let prop_path = child_path(&props_path, &escape_pointer_segment(name));
            properties.insert(name.clone(), parse_value(prop, &prop_path)?);
        }
    }

    let mut required = Vec::new();
    if let Some(value) = map.get("required") {
        let required_path = child_path(path, "required");
        let names = value.as_array().ok_or_else(|| LoadError::UnexpectedType {
            path: display_path(&required_path),
            expected: "array",
            actual: json_type_name(value).to_string(),
        })?;
        for (i, name) in names.iter().enumerate() {
            let name = name.as_str().ok_or_else(|| LoadError::UnexpectedType {
                path: display_path(&child_path(&required_path, &i.to_string())),
                expected: "string",
                actual: json_type_name(name).to_string(),
            })?;
            required.push(name.to_string());
        }
    }

    let additional_properties = match map.get("additionalProperties") {
        None => true,
        Some(Value::Bool(allowed)) => *allowed,
        Some(Value::Object(schema)) if schema.is_empty() => true,
        Some(_) => {
            return Err(LoadError::UnsupportedKeyword {
                path: display_path(&child_path(path, "additionalProperties")),
                keyword: "additionalProperties with a schema value".to_string(),
            });
        }
    };

    Ok(ObjectSchema {
        meta: SchemaMeta::default(),
        requires_object,
        properties,
        required,
        additional_properties,
    })
}

fn parse_array(
    map: &Map<String, Value>,
    path: &str,
    requires_array: bool,
) -> Result<ArraySchema, LoadError> {
    let items = match map.get("items") {
        Some(items) => Some(Box::new(parse_value(items, &child_path(path, "items"))?)),
        None => None,
    };
    Ok(ArraySchema {
        meta: SchemaMeta::default(),
        requires_array,
        items,
        min_items: optional_u64(map, "minItems", path)?,
        max_items: optional_u64(map, "maxItems", path)?,
    })
}

fn has_any(map: &Map<String, Value>, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| map.contains_key(*keyword))
}

fn optional_string(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<String>, LoadError> {
    match map.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(LoadError::UnexpectedType {
            path: display_path(&child_path(path, key)),
            expected: "string",
            actual: json_type_name(other).to_string(),
        }),
    }
}

fn optional_u64(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<u64>, LoadError> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .or_else(|| {
                // 2.0 is a valid non-negative integer in JSON Schema.
                value
                    .as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            })
            .map(Some)
            .ok_or_else(|| LoadError::UnexpectedType {
                path: display_path(&child_path(path, key)),
                expected: "non-negative integer",
                actual: json_type_name(value).to_string(),
            }),
    }
}

fn optional_f64(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<f64>, LoadError> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| LoadError::UnexpectedType {
                path: display_path(&child_path(path, key)),
                expected: "number",
                actual: json_type_name(value).to_string(),
            }),
    }
}

fn child_path(path: &str, segment: &str) -> String {
    format!("{}/{}", path, segment)
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(document: Value) -> Schema {
        parse_schema(&document).unwrap()
    }

    #[test]
    fn booleans_and_empty_objects() {
        assert_eq!(parse(json!(true)), Schema::Empty(SchemaMeta::default()));
        assert_eq!(parse(json!(false)), Schema::False(SchemaMeta::default()));
        assert_eq!(parse(json!({})), Schema::Empty(SchemaMeta::default()));
    }

    #[test]
    fn explicit_combinator_is_not_synthetic() {
        let schema = parse(json!({
            "anyOf": [{ "type": "string" }, { "type": "null" }]
        }));
        let combined = schema.as_combined().unwrap();
        assert_eq!(combined.criterion(), &Criterion::ANY);
        assert!(!combined.is_synthetic());
        assert_eq!(combined.subschemas().len(), 2);
    }

    #[test]
    fn type_list_becomes_synthetic_any_of() {
        let schema = parse(json!({ "type": ["string", "integer"], "minimum": 3 }));
        let combined = schema.as_combined().unwrap();
        assert_eq!(combined.criterion(), &Criterion::ANY);
        assert!(combined.is_synthetic());
        assert_eq!(
            combined.subschemas()[1],
            Schema::Number(NumberSchema {
                requires_number: true,
                requires_integer: true,
                minimum: Some(3.0),
                ..Default::default()
            })
        );
    }

    #[test]
    fn combinator_next_to_constraints_becomes_synthetic_all_of() {
        let schema = parse(json!({
            "title": "Payment",
            "type": "object",
            "required": ["amount"],
            "oneOf": [
                { "properties": { "card": { "type": "string" } } },
                { "properties": { "iban": { "type": "string" } } }
            ]
        }));
        let combined = schema.as_combined().unwrap();
        assert_eq!(combined.criterion(), &Criterion::ALL);
        assert!(combined.is_synthetic());
        assert_eq!(combined.meta().title.as_deref(), Some("Payment"));
        assert_eq!(combined.subschemas().len(), 2);
        assert_eq!(
            combined.subschemas()[0].as_combined().unwrap().criterion(),
            &Criterion::ONE
        );
        assert!(matches!(combined.subschemas()[1], Schema::Object(_)));
    }

    #[test]
    fn several_combinators_share_one_synthetic_parent() {
        let schema = parse(json!({
            "allOf": [{ "type": "object" }],
            "anyOf": [{ "required": ["a"] }, { "required": ["b"] }]
        }));
        let combined = schema.as_combined().unwrap();
        assert!(combined.is_synthetic());
        assert_eq!(combined.subschemas().len(), 2);
        assert!(!combined.has_multiple_combined_schemas_of_same_criterion());
    }

    #[test]
    fn untyped_constraints_do_not_require_type() {
        let schema = parse(json!({ "minLength": 2 }));
        assert_eq!(
            schema,
            Schema::String(StringSchema {
                min_length: Some(2),
                ..Default::default()
            })
        );
    }

    #[test]
    fn metadata_lands_on_outermost_node() {
        let schema = parse(json!({
            "$id": "https://example.com/name.json",
            "description": "a name",
            "type": "string"
        }));
        assert_eq!(
            schema.meta().id.as_deref(),
            Some("https://example.com/name.json")
        );
        assert_eq!(schema.meta().description.as_deref(), Some("a name"));
    }

    #[test]
    fn nested_properties_are_parsed() {
        let schema = parse(json!({
            "type": "object",
            "properties": {
                "buyer": {
                    "type": "object",
                    "properties": { "email": { "type": "string" } }
                }
            }
        }));
        assert!(schema.defines_property("buyer/email"));
        assert!(!schema.defines_property("buyer/phone"));
    }

    #[test]
    fn ref_is_rejected() {
        let result = parse_schema(&json!({ "$ref": "#/$defs/thing" }));
        assert!(matches!(
            result,
            Err(LoadError::UnsupportedKeyword { keyword, .. }) if keyword == "$ref"
        ));
    }

    #[test]
    fn unknown_assertions_are_rejected() {
        let result = parse_schema(&json!({ "type": "string", "pattern": "^a" }));
        assert!(matches!(
            result,
            Err(LoadError::UnsupportedKeyword { path, keyword })
                if path == "/" && keyword == "pattern"
        ));

        let result = parse_schema(&json!({
            "type": "object",
            "properties": {
                "count": { "anyOf": [{ "type": "integer", "multipleOf": 2 }] }
            }
        }));
        assert!(matches!(
            result,
            Err(LoadError::UnsupportedKeyword { path, keyword })
                if path == "/properties/count/anyOf/0" && keyword == "multipleOf"
        ));
    }

    #[test]
    fn annotations_are_accepted() {
        let schema = parse(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$comment": "internal",
            "type": "string",
            "format": "email",
            "default": "a@example.com",
            "examples": ["b@example.com"]
        }));
        assert!(matches!(schema, Schema::String(_)));
    }

    #[test]
    fn metaschema_violations_are_rejected() {
        let result = parse_schema(&json!({ "allOf": {} }));
        assert!(matches!(result, Err(LoadError::InvalidSchema { .. })));

        let result = parse_schema(&json!(42));
        assert!(matches!(result, Err(LoadError::InvalidSchema { .. })));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = parse_value(&json!({ "type": "text" }), "");
        assert!(matches!(
            result,
            Err(LoadError::UnknownType { value, .. }) if value == "text"
        ));
    }

    #[test]
    fn non_array_combinator_is_rejected_without_metaschema() {
        let result = parse_value(&json!({ "oneOf": { "type": "string" } }), "");
        assert!(matches!(
            result,
            Err(LoadError::UnexpectedType { path, expected: "array", .. }) if path == "/oneOf"
        ));
    }

    #[test]
    fn empty_not_rejects_everything() {
        assert_eq!(
            parse(json!({ "not": {} })),
            Schema::False(SchemaMeta::default())
        );
        let result = parse_schema(&json!({ "not": { "type": "string" } }));
        assert!(matches!(
            result,
            Err(LoadError::UnsupportedKeyword { keyword, .. }) if keyword == "not"
        ));
    }

    #[test]
    fn const_and_enum_are_leaves() {
        let schema = parse(json!({ "const": "EUR" }));
        assert!(matches!(schema, Schema::Const(ref c) if c.value == json!("EUR")));

        let schema = parse(json!({ "enum": ["EUR", "USD"], "type": "string" }));
        let combined = schema.as_combined().unwrap();
        assert!(combined.is_synthetic());
        assert!(matches!(combined.subschemas()[1], Schema::Enum(_)));
    }
}
