//! Schema writer - describes a [`Schema`] graph as a JSON Schema document.
//!
//! The writer works from insertion-ordered subschemas, so the output lists
//! composition branches the way the author wrote them. Synthetic nodes are
//! folded back into the keywords they were desugared from when that can be
//! done without losing information.

use serde_json::{Map, Value};

use crate::combined::CombinedSchema;
use crate::criterion::Criterion;
use crate::schema::{Schema, SchemaMeta};
use crate::types::COMBINATOR_KEYWORDS;

/// Describe a schema as a JSON Schema document.
pub fn to_json(schema: &Schema) -> Value {
    match schema {
        Schema::Empty(meta) if meta.is_empty() => Value::Bool(true),
        Schema::False(meta) if meta.is_empty() => Value::Bool(false),
        other => Value::Object(to_map(other)),
    }
}

fn to_map(schema: &Schema) -> Map<String, Value> {
    let mut map = Map::new();
    write_meta(schema.meta(), &mut map);

    match schema {
        Schema::Empty(_) => {}
        Schema::False(_) => {
            map.insert("not".to_string(), Value::Object(Map::new()));
        }
        Schema::Boolean(_) => {
            map.insert("type".to_string(), Value::from("boolean"));
        }
        Schema::Null(_) => {
            map.insert("type".to_string(), Value::from("null"));
        }
        Schema::String(s) => {
            if s.requires_string {
                map.insert("type".to_string(), Value::from("string"));
            }
            insert_opt(&mut map, "minLength", s.min_length.map(Value::from));
            insert_opt(&mut map, "maxLength", s.max_length.map(Value::from));
        }
        Schema::Number(s) => {
            if s.requires_integer {
                map.insert("type".to_string(), Value::from("integer"));
            } else if s.requires_number {
                map.insert("type".to_string(), Value::from("number"));
            }
            insert_opt(&mut map, "minimum", s.minimum.map(Value::from));
            insert_opt(&mut map, "maximum", s.maximum.map(Value::from));
        }
        Schema::Object(s) => {
            if s.requires_object {
                map.insert("type".to_string(), Value::from("object"));
            }
            if !s.properties.is_empty() {
                let properties = s
                    .properties
                    .iter()
                    .map(|(name, property)| (name.clone(), to_json(property)))
                    .collect();
                map.insert("properties".to_string(), Value::Object(properties));
            }
            if !s.required.is_empty() {
                map.insert(
                    "required".to_string(),
                    Value::Array(s.required.iter().cloned().map(Value::String).collect()),
                );
            }
            if !s.additional_properties {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
        }
        Schema::Array(s) => {
            if s.requires_array {
                map.insert("type".to_string(), Value::from("array"));
            }
            if let Some(items) = &s.items {
                map.insert("items".to_string(), to_json(items));
            }
            insert_opt(&mut map, "minItems", s.min_items.map(Value::from));
            insert_opt(&mut map, "maxItems", s.max_items.map(Value::from));
        }
        Schema::Const(s) => {
            map.insert("const".to_string(), s.value.clone());
        }
        Schema::Enum(s) => {
            map.insert("enum".to_string(), Value::Array(s.values.clone()));
        }
        Schema::Combined(combined) => write_combined(combined, &mut map),
    }

    map
}

fn write_combined(combined: &CombinedSchema, map: &mut Map<String, Value>) {
    if combined.is_synthetic() {
        let folded = if combined.criterion() == &Criterion::ALL {
            fold_all_of(combined)
        } else if combined.criterion() == &Criterion::ANY {
            fold_type_list(combined)
        } else {
            None
        };
        if let Some(folded) = folded {
            map.extend(folded);
            return;
        }
    }

    let branches = combined.subschemas().iter().map(to_json).collect();
    map.insert(
        combined.criterion().keyword().to_string(),
        Value::Array(branches),
    );
}

/// Merge the keywords of every branch into one object. Fails when two
/// branches would write the same keyword, which is always the case for
/// sibling combined schemas sharing a criterion.
fn fold_all_of(combined: &CombinedSchema) -> Option<Map<String, Value>> {
    if combined.has_multiple_combined_schemas_of_same_criterion() {
        return None;
    }
    let mut merged = Map::new();
    for subschema in combined.subschemas() {
        if !subschema.meta().is_empty() {
            return None;
        }
        for (key, value) in to_map(subschema) {
            if merged.contains_key(&key) {
                return None;
            }
            merged.insert(key, value);
        }
    }
    Some(merged)
}

/// Rewrite a synthetic anyOf of typed leaves as `"type": [..]`.
fn fold_type_list(combined: &CombinedSchema) -> Option<Map<String, Value>> {
    let mut types = Vec::new();
    let mut merged = Map::new();
    for subschema in combined.subschemas() {
        if !subschema.meta().is_empty() {
            return None;
        }
        let mut branch = to_map(subschema);
        match branch.remove("type") {
            Some(type_name @ Value::String(_)) => types.push(type_name),
            _ => return None,
        }
        if COMBINATOR_KEYWORDS.iter().any(|k| branch.contains_key(*k)) {
            return None;
        }
        for (key, value) in branch {
            match merged.get(&key) {
                Some(existing) if existing != &value => return None,
                _ => {
                    merged.insert(key, value);
                }
            }
        }
    }
    merged.insert("type".to_string(), Value::Array(types));
    Some(merged)
}

fn write_meta(meta: &SchemaMeta, map: &mut Map<String, Value>) {
    insert_opt(map, "$id", meta.id.clone().map(Value::String));
    insert_opt(map, "title", meta.title.clone().map(Value::String));
    insert_opt(
        map,
        "description",
        meta.description.clone().map(Value::String),
    );
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}
