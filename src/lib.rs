//! Combined Schemas
//!
//! A JSON Schema object model centred on the `allOf`, `anyOf` and `oneOf`
//! combinators.
//!
//! A [`CombinedSchema`] pairs a [`Criterion`] with its subschemas. The criterion
//! decides, from how many subschemas matched an instance, whether the combined
//! schema as a whole matches. Subschemas are evaluated combined-first, and two
//! combined schemas are equal when their criteria and evaluation orders agree.
//!
//! # Example
//!
//! ```
//! use combined_schema::{is_valid, parse_schema, CombinedSchema, Criterion, Schema, SchemaMeta};
//! use serde_json::json;
//!
//! let schema = CombinedSchema::builder()
//!     .criterion(Criterion::ONE)
//!     .subschema(Schema::Boolean(SchemaMeta::default()))
//!     .subschema(Schema::Null(SchemaMeta::default()))
//!     .build()
//!     .unwrap();
//! let schema = Schema::Combined(schema);
//!
//! assert!(is_valid(&schema, &json!(null)));
//! assert!(!is_valid(&schema, &json!("yes")));
//!
//! // The same graph, loaded from a document
//! let parsed = parse_schema(&json!({ "oneOf": [{ "type": "boolean" }, { "type": "null" }] }));
//! assert_eq!(parsed.unwrap(), schema);
//! ```
//!
//! # Criteria
//!
//! | Keyword | Accepts when |
//! |---------|--------------|
//! | `allOf` | every subschema matched |
//! | `anyOf` | at least one subschema matched |
//! | `oneOf` | exactly one subschema matched |
//!
//! Other criteria can be supplied by implementing [`ValidationCriterion`] and
//! wrapping it with [`Criterion::custom`].

mod combined;
mod criterion;
mod error;
mod linter;
mod loader;
mod parser;
mod schema;
mod types;
mod validator;
mod writer;

pub use combined::{CombinedSchema, CombinedSchemaBuilder};
pub use criterion::{Criterion, ValidationCriterion};
pub use error::{BuildError, CriterionNotSatisfied, LoadError, ValidateError, ValidationError};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{is_url, load_schema, load_schema_auto, load_schema_graph, load_schema_str};
pub use parser::parse_schema;
pub use schema::{
    ArraySchema, ConstSchema, EnumSchema, NumberSchema, ObjectSchema, Schema, SchemaMeta,
    StringSchema,
};
pub use validator::{is_valid, validate, validate_against_schema};
pub use writer::to_json;

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
