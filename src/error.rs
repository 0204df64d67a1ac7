//! Error types for schema construction, loading and validation.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// A validation criterion rejected a tally of matching subschemas.
///
/// Carries the criterion's keyword so the traversal engine can attribute the
/// failure to the `allOf`/`anyOf`/`oneOf` node that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{keyword}: {message}")]
pub struct CriterionNotSatisfied {
    pub keyword: String,
    pub message: String,
}

impl CriterionNotSatisfied {
    /// Rejection reported under `keyword`.
    pub fn new(keyword: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            message: message.into(),
        }
    }
}

/// A combined schema was built from incomplete input.
///
/// This is a programming error in whoever assembled the schema graph, never a
/// verdict about a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("combined schema requires a criterion")]
    MissingCriterion,

    #[error("combined schema requires a subschema collection")]
    MissingSubschemas,
}

/// Errors while loading a schema document or turning it into a schema graph.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Schema errors (exit code 2)
    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("invalid value at {path}: expected {expected}, got {actual}")]
    UnexpectedType {
        path: String,
        expected: &'static str,
        actual: String,
    },

    #[error("unknown type \"{value}\" at {path}")]
    UnknownType { path: String, value: String },

    #[error("unsupported keyword at {path}: {keyword}")]
    UnsupportedKeyword { path: String, keyword: String },

    #[error("cannot build schema at {path}: {source}")]
    Build {
        path: String,
        #[source]
        source: BuildError,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors during validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<ValidationError> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Load(e) => e.exit_code(),
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// A single violation found while walking an instance against a schema.
///
/// Combined schemas report the failures of their subschemas as `causes`, so a
/// violation forms a tree rooted at the outermost node that rejected the
/// instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// JSON Pointer into the instance, `#`-prefixed (e.g. `#/buyer/email`).
    pub path: String,
    /// Keyword that produced the violation, absent for grouped violations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<ValidationError>,
}

impl ValidationError {
    /// A violation of `keyword` at the instance location `path`.
    pub fn new(
        path: impl Into<String>,
        keyword: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            keyword: Some(keyword.into()),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Groups several violations of one subschema under a single entry.
    pub(crate) fn grouped(path: impl Into<String>, causes: Vec<ValidationError>) -> Self {
        Self {
            path: path.into(),
            keyword: None,
            message: format!("{} schema violations found", causes.len()),
            causes,
        }
    }

    /// Attach the subschema violations that led to this one.
    pub fn with_causes(mut self, causes: Vec<ValidationError>) -> Self {
        self.causes = causes;
        self
    }

    /// Number of leaf violations in this tree.
    pub fn violation_count(&self) -> usize {
        if self.causes.is_empty() {
            1
        } else {
            self.causes.iter().map(ValidationError::violation_count).sum()
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("test.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::UnknownType {
            path: "/properties/id/type".into(),
            value: "text".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = LoadError::Build {
            path: "/allOf".into(),
            source: BuildError::MissingCriterion,
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn validate_error_exit_codes() {
        let err = ValidateError::Invalid {
            errors: vec![ValidationError::new(
                "#/id",
                "required",
                "required key [id] not found",
            )],
        };
        assert_eq!(err.exit_code(), 1);

        let err = ValidateError::from(LoadError::InvalidSchema {
            message: "bad".into(),
        });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::new(
            "#/buyer/email",
            "type",
            "expected type: string, found: number",
        );
        assert_eq!(
            err.to_string(),
            "#/buyer/email: expected type: string, found: number"
        );
    }

    #[test]
    fn criterion_failure_is_not_a_build_error() {
        let failure = CriterionNotSatisfied::new("oneOf", "2 subschemas matched instead of one");
        assert_eq!(
            failure.to_string(),
            "oneOf: 2 subschemas matched instead of one"
        );
        assert_eq!(
            BuildError::MissingSubschemas.to_string(),
            "combined schema requires a subschema collection"
        );
    }

    #[test]
    fn violation_count_counts_leaves() {
        let leaf = ValidationError::new("#/a", "type", "expected type: string, found: null");
        let tree = ValidationError::new(
            "#",
            "anyOf",
            "no subschema matched out of the total 2 subschemas",
        )
        .with_causes(vec![
            leaf.clone(),
            ValidationError::grouped("#", vec![leaf.clone(), leaf]),
        ]);
        assert_eq!(tree.violation_count(), 3);
    }
}
