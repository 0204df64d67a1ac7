//! Instance validation - walks a JSON value against a [`Schema`] graph.
//!
//! Combined schemas are evaluated in their combined-first order. Every
//! subschema is evaluated (no short-circuiting), the number that accepted the
//! instance is handed to the node's criterion, and a rejection is reported
//! with the failing subschemas' violations attached as causes.

use serde_json::Value;
use tracing::{debug, trace};

use crate::combined::CombinedSchema;
use crate::criterion::Criterion;
use crate::error::{ValidateError, ValidationError};
use crate::parser::parse_schema;
use crate::schema::{ArraySchema, NumberSchema, ObjectSchema, Schema, StringSchema};
use crate::types::{escape_pointer_segment, json_equal, json_type_name};

/// Validate an instance against a schema document.
///
/// Parses the document, then validates the instance against the result.
///
/// # Errors
///
/// Returns `ValidateError::Load` if the document isn't a usable schema, or
/// `ValidateError::Invalid` if the instance doesn't match it.
pub fn validate(schema: &Value, instance: &Value) -> Result<(), ValidateError> {
    let schema = parse_schema(schema)?;
    validate_against_schema(&schema, instance)
}

/// Validate an instance against an already-parsed schema.
///
/// Use this when validating many instances against one schema.
pub fn validate_against_schema(schema: &Schema, instance: &Value) -> Result<(), ValidateError> {
    let errors = visit(schema, instance, "#");
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

/// Returns true if `instance` matches `schema`.
pub fn is_valid(schema: &Schema, instance: &Value) -> bool {
    visit(schema, instance, "#").is_empty()
}

fn visit(schema: &Schema, instance: &Value, pointer: &str) -> Vec<ValidationError> {
    match schema {
        Schema::Empty(_) => Vec::new(),
        Schema::False(_) => vec![ValidationError::new(
            pointer,
            "false",
            "false schema does not allow any value",
        )],
        Schema::Boolean(_) => expect_type(instance.is_boolean(), "boolean", instance, pointer),
        Schema::Null(_) => expect_type(instance.is_null(), "null", instance, pointer),
        Schema::String(s) => visit_string(s, instance, pointer),
        Schema::Number(s) => visit_number(s, instance, pointer),
        Schema::Object(s) => visit_object(s, instance, pointer),
        Schema::Array(s) => visit_array(s, instance, pointer),
        Schema::Const(s) => {
            if json_equal(&s.value, instance) {
                Vec::new()
            } else {
                vec![ValidationError::new(
                    pointer,
                    "const",
                    format!("value does not match the constant {}", s.value),
                )]
            }
        }
        Schema::Enum(s) => {
            if s.values.iter().any(|value| json_equal(value, instance)) {
                Vec::new()
            } else {
                vec![ValidationError::new(
                    pointer,
                    "enum",
                    format!("{} is not a valid enum value", instance),
                )]
            }
        }
        Schema::Combined(combined) => visit_combined(combined, instance, pointer),
    }
}

fn visit_combined(
    combined: &CombinedSchema,
    instance: &Value,
    pointer: &str,
) -> Vec<ValidationError> {
    let subschemas = combined.subschemas_with_combined_first();
    let subschema_count = subschemas.len();
    let mut failures = Vec::new();

    for subschema in subschemas {
        let mut errors = visit(subschema, instance, pointer);
        trace!(
            pointer,
            criterion = %combined.criterion(),
            matched = errors.is_empty(),
            "evaluated subschema"
        );
        match errors.len() {
            0 => {}
            1 => failures.extend(errors.pop()),
            _ => failures.push(ValidationError::grouped(pointer, errors)),
        }
    }

    let matching_count = subschema_count - failures.len();
    match combined
        .criterion()
        .validate(subschema_count, matching_count)
    {
        Ok(()) => Vec::new(),
        Err(rejection) => {
            debug!(
                pointer,
                criterion = %rejection.keyword,
                subschema_count,
                matching_count,
                "criterion not satisfied"
            );
            if combined.is_synthetic() && combined.criterion() == &Criterion::ALL {
                // Nobody wrote this allOf; surface what its parts reported.
                failures
            } else {
                let error = ValidationError::new(pointer, rejection.keyword, rejection.message);
                vec![error.with_causes(failures)]
            }
        }
    }
}

fn expect_type(
    matches: bool,
    expected: &str,
    instance: &Value,
    pointer: &str,
) -> Vec<ValidationError> {
    if matches {
        Vec::new()
    } else {
        vec![type_error(expected, instance, pointer)]
    }
}

fn type_error(expected: &str, instance: &Value, pointer: &str) -> ValidationError {
    ValidationError::new(
        pointer,
        "type",
        format!(
            "expected type: {}, found: {}",
            expected,
            json_type_name(instance)
        ),
    )
}

fn visit_string(schema: &StringSchema, instance: &Value, pointer: &str) -> Vec<ValidationError> {
    let Some(s) = instance.as_str() else {
        return expect_type(!schema.requires_string, "string", instance, pointer);
    };

    let mut errors = Vec::new();
    let length = s.chars().count() as u64;
    if let Some(min) = schema.min_length {
        if length < min {
            errors.push(ValidationError::new(
                pointer,
                "minLength",
                format!("expected minLength: {}, actual: {}", min, length),
            ));
        }
    }
    if let Some(max) = schema.max_length {
        if length > max {
            errors.push(ValidationError::new(
                pointer,
                "maxLength",
                format!("expected maxLength: {}, actual: {}", max, length),
            ));
        }
    }
    errors
}

fn visit_number(schema: &NumberSchema, instance: &Value, pointer: &str) -> Vec<ValidationError> {
    let Some(number) = instance.as_f64() else {
        let expected = if schema.requires_integer {
            "integer"
        } else {
            "number"
        };
        return expect_type(!schema.requires_number, expected, instance, pointer);
    };

    let mut errors = Vec::new();
    if schema.requires_integer && number.fract() != 0.0 {
        errors.push(type_error("integer", instance, pointer));
    }
    if let Some(minimum) = schema.minimum {
        if number < minimum {
            errors.push(ValidationError::new(
                pointer,
                "minimum",
                format!("{} is not greater or equal to {}", instance, minimum),
            ));
        }
    }
    if let Some(maximum) = schema.maximum {
        if number > maximum {
            errors.push(ValidationError::new(
                pointer,
                "maximum",
                format!("{} is not less or equal to {}", instance, maximum),
            ));
        }
    }
    errors
}

fn visit_object(schema: &ObjectSchema, instance: &Value, pointer: &str) -> Vec<ValidationError> {
    let Some(map) = instance.as_object() else {
        return expect_type(!schema.requires_object, "object", instance, pointer);
    };

    let mut errors = Vec::new();
    for name in &schema.required {
        if !map.contains_key(name) {
            errors.push(ValidationError::new(
                pointer,
                "required",
                format!("required key [{}] not found", name),
            ));
        }
    }

    for (name, property) in &schema.properties {
        if let Some(value) = map.get(name) {
            let child = format!("{}/{}", pointer, escape_pointer_segment(name));
            errors.extend(visit(property, value, &child));
        }
    }

    if !schema.additional_properties {
        for name in map.keys() {
            if !schema.properties.contains_key(name) {
                errors.push(ValidationError::new(
                    pointer,
                    "additionalProperties",
                    format!("extraneous key [{}] is not permitted", name),
                ));
            }
        }
    }
    errors
}

fn visit_array(schema: &ArraySchema, instance: &Value, pointer: &str) -> Vec<ValidationError> {
    let Some(items) = instance.as_array() else {
        return expect_type(!schema.requires_array, "array", instance, pointer);
    };

    let mut errors = Vec::new();
    let count = items.len() as u64;
    if let Some(min) = schema.min_items {
        if count < min {
            errors.push(ValidationError::new(
                pointer,
                "minItems",
                format!("expected minimum item count: {}, found: {}", min, count),
            ));
        }
    }
    if let Some(max) = schema.max_items {
        if count > max {
            errors.push(ValidationError::new(
                pointer,
                "maxItems",
                format!("expected maximum item count: {}, found: {}", max, count),
            ));
        }
    }
    if let Some(item_schema) = &schema.items {
        for (i, item) in items.iter().enumerate() {
            errors.extend(visit(item_schema, item, &format!("{}/{}", pointer, i)));
        }
    }
    errors
}
