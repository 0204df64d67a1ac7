//! The schema graph: leaf schemas plus [`CombinedSchema`] nodes.
//!
//! Every node is a [`Schema`] variant, so a traversal engine recognizes node
//! kinds by matching on the enum. All nodes are immutable once built and
//! implement `Eq + Hash`, which the combined-first ordering relies on.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde_json::Value;

use crate::combined::CombinedSchema;

/// Identity and description metadata shared by every schema node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaMeta {
    /// The `$id` keyword.
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl SchemaMeta {
    /// True when no metadata field is set.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.title.is_none() && self.description.is_none()
    }
}

/// A node in the schema graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Schema {
    /// Accepts everything (`true` or `{}`).
    Empty(SchemaMeta),
    /// Rejects everything (`false`).
    False(SchemaMeta),
    Boolean(SchemaMeta),
    Null(SchemaMeta),
    String(StringSchema),
    Number(NumberSchema),
    Object(ObjectSchema),
    Array(ArraySchema),
    Const(ConstSchema),
    Enum(EnumSchema),
    Combined(CombinedSchema),
}

impl Schema {
    /// Identity and description metadata of this node.
    pub fn meta(&self) -> &SchemaMeta {
        match self {
            Schema::Empty(meta)
            | Schema::False(meta)
            | Schema::Boolean(meta)
            | Schema::Null(meta) => meta,
            Schema::String(s) => &s.meta,
            Schema::Number(s) => &s.meta,
            Schema::Object(s) => &s.meta,
            Schema::Array(s) => &s.meta,
            Schema::Const(s) => &s.meta,
            Schema::Enum(s) => &s.meta,
            Schema::Combined(s) => s.meta(),
        }
    }

    /// Replace this node's metadata.
    pub fn with_meta(self, meta: SchemaMeta) -> Schema {
        match self {
            Schema::Empty(_) => Schema::Empty(meta),
            Schema::False(_) => Schema::False(meta),
            Schema::Boolean(_) => Schema::Boolean(meta),
            Schema::Null(_) => Schema::Null(meta),
            Schema::String(s) => Schema::String(StringSchema { meta, ..s }),
            Schema::Number(s) => Schema::Number(NumberSchema { meta, ..s }),
            Schema::Object(s) => Schema::Object(ObjectSchema { meta, ..s }),
            Schema::Array(s) => Schema::Array(ArraySchema { meta, ..s }),
            Schema::Const(s) => Schema::Const(ConstSchema { meta, ..s }),
            Schema::Enum(s) => Schema::Enum(EnumSchema { meta, ..s }),
            Schema::Combined(s) => Schema::Combined(s.with_meta(meta)),
        }
    }

    /// True for `allOf`/`anyOf`/`oneOf` nodes.
    pub fn is_combined(&self) -> bool {
        matches!(self, Schema::Combined(_))
    }

    /// The combined node, if this is one.
    pub fn as_combined(&self) -> Option<&CombinedSchema> {
        match self {
            Schema::Combined(combined) => Some(combined),
            _ => None,
        }
    }

    /// Whether an instance valid against this schema necessarily has `field`.
    ///
    /// `field` is a `/`-separated path and may carry a leading `#` or `/`
    /// (`"#/buyer/email"`, `"buyer/email"` and `"buyer"` are all accepted).
    /// Only object and combined schemas can define properties.
    pub fn defines_property(&self, field: &str) -> bool {
        match self {
            Schema::Object(object) => object.defines_property(field),
            Schema::Combined(combined) => combined.defines_property(field),
            _ => false,
        }
    }
}

impl From<CombinedSchema> for Schema {
    fn from(combined: CombinedSchema) -> Self {
        Schema::Combined(combined)
    }
}

impl From<StringSchema> for Schema {
    fn from(schema: StringSchema) -> Self {
        Schema::String(schema)
    }
}

impl From<NumberSchema> for Schema {
    fn from(schema: NumberSchema) -> Self {
        Schema::Number(schema)
    }
}

impl From<ObjectSchema> for Schema {
    fn from(schema: ObjectSchema) -> Self {
        Schema::Object(schema)
    }
}

impl From<ArraySchema> for Schema {
    fn from(schema: ArraySchema) -> Self {
        Schema::Array(schema)
    }
}

/// String constraints. `requires_string` is false when the constraints were
/// given without `"type": "string"`, in which case non-strings pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StringSchema {
    pub meta: SchemaMeta,
    pub requires_string: bool,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

/// Numeric constraints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberSchema {
    pub meta: SchemaMeta,
    pub requires_number: bool,
    pub requires_integer: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

// Bounds come from JSON numbers, which are never NaN.
impl Eq for NumberSchema {}

impl Hash for NumberSchema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.hash(state);
        self.requires_number.hash(state);
        self.requires_integer.hash(state);
        self.minimum.map(canonical_bits).hash(state);
        self.maximum.map(canonical_bits).hash(state);
    }
}

/// Bits of `number` with `-0.0` folded into `0.0`, matching `f64` equality.
fn canonical_bits(number: f64) -> u64 {
    if number == 0.0 {
        0.0f64.to_bits()
    } else {
        number.to_bits()
    }
}

/// Hash a JSON value consistently with its `PartialEq`: object keys are
/// visited sorted, since map equality ignores insertion order.
fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2u8.hash(state);
            n.as_f64().map(canonical_bits).hash(state);
        }
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            5u8.hash(state);
            map.len().hash(state);
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|(left, _), (right, _)| left.cmp(right));
            for (key, value) in entries {
                key.hash(state);
                hash_value(value, state);
            }
        }
    }
}

/// Object constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectSchema {
    pub meta: SchemaMeta,
    pub requires_object: bool,
    pub properties: BTreeMap<String, Schema>,
    pub required: Vec<String>,
    pub additional_properties: bool,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self {
            meta: SchemaMeta::default(),
            requires_object: false,
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: true,
        }
    }
}

impl ObjectSchema {
    /// True when the first segment of `field` is a declared property and the
    /// property's schema defines the rest.
    pub fn defines_property(&self, field: &str) -> bool {
        let field = field.trim_start_matches('#').trim_start_matches('/');
        let (head, rest) = match field.split_once('/') {
            Some((head, rest)) => (head, Some(rest)),
            None => (field, None),
        };
        match self.properties.get(head) {
            Some(property) => rest.map_or(true, |rest| property.defines_property(rest)),
            None => false,
        }
    }
}

/// Array constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArraySchema {
    pub meta: SchemaMeta,
    pub requires_array: bool,
    pub items: Option<Box<Schema>>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
}

/// The `const` keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstSchema {
    pub meta: SchemaMeta,
    pub value: Value,
}

impl Hash for ConstSchema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.hash(state);
        hash_value(&self.value, state);
    }
}

/// The `enum` keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSchema {
    pub meta: SchemaMeta,
    pub values: Vec<Value>,
}

impl Hash for EnumSchema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.hash(state);
        self.values.len().hash(state);
        for value in &self.values {
            hash_value(value, state);
        }
    }
}
