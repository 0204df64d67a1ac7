//! Schema linting - static analysis of schema files.
//!
//! Checks schema files for:
//! - JSON syntax errors
//! - Documents that fail the metaschema or use unsupported keywords
//! - Empty `allOf`/`anyOf`/`oneOf` arrays
//! - Sibling combinators that share a criterion and could be merged

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::LoadError;
use crate::loader::load_schema;
use crate::parser::parse_schema;
use crate::schema::Schema;
use crate::types::{escape_pointer_segment, COMBINATOR_KEYWORDS};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/properties/id/anyOf")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_schema_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        let file_errors = file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        let file_warnings = file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();

        total_errors += file_errors;
        total_warnings += file_warnings;
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single schema file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();

    // Try to load the file (checks syntax)
    let document = match load_schema(file) {
        Ok(document) => document,
        Err(e) => {
            let diagnostic = match e {
                LoadError::InvalidJson { .. } => {
                    Diagnostic::error("E001", file, "/", format!("syntax error: {}", e))
                }
                _ => Diagnostic::error("E002", file, "/", format!("cannot load schema: {}", e)),
            };
            diagnostics.push(diagnostic);
            return FileResult {
                file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
                status: FileStatus::Error,
                diagnostics,
            };
        }
    };

    check_empty_combinators(&document, file, "", &mut diagnostics);

    // The metaschema rejects empty combinator arrays too, so E002 only
    // reports failures not already covered by E003.
    match parse_schema(&document) {
        Ok(schema) => check_combined(&schema, file, "", &mut diagnostics),
        Err(e) if diagnostics.is_empty() => {
            diagnostics.push(Diagnostic::error(
                "E002",
                file,
                "/",
                format!("cannot load schema: {}", e),
            ));
        }
        Err(e) => {
            tracing::debug!(file = %file.display(), error = %e, "parse failure already reported");
        }
    }

    // Check for missing $id (warning)
    if document.is_object() && document.get("$id").is_none() {
        diagnostics.push(Diagnostic::warning("W002", file, "/", "schema missing $id field"));
    }

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

impl Diagnostic {
    fn error(code: &str, file: &Path, path: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, file, path, message)
    }

    fn warning(code: &str, file: &Path, path: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, file, path, message)
    }

    fn new(
        severity: Severity,
        code: &str,
        file: &Path,
        path: &str,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            severity,
            code: code.to_string(),
            file: file.to_path_buf(),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            message: message.into(),
        }
    }
}

/// Walk the raw document looking for combinator keywords with no branches.
fn check_empty_combinators(
    value: &Value,
    file: &Path,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{}/{}", path, escape_pointer_segment(key));
                if COMBINATOR_KEYWORDS.contains(&key.as_str())
                    && child.as_array().is_some_and(Vec::is_empty)
                {
                    diagnostics.push(Diagnostic::error(
                        "E003",
                        file,
                        &child_path,
                        format!("{} must list at least one subschema", key),
                    ));
                }
                check_empty_combinators(child, file, &child_path, diagnostics);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_empty_combinators(item, file, &format!("{}/{}", path, i), diagnostics);
            }
        }
        _ => {}
    }
}

/// Walk the parsed graph for combined nodes whose direct combined children
/// repeat a criterion. Synthetic nodes have no keyword of their own, so their
/// children keep the parent's path.
fn check_combined(schema: &Schema, file: &Path, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    match schema {
        Schema::Combined(combined) => {
            let branch_path = if combined.is_synthetic() {
                path.to_string()
            } else {
                format!("{}/{}", path, combined.criterion().keyword())
            };
            if combined.has_multiple_combined_schemas_of_same_criterion() {
                diagnostics.push(Diagnostic::warning(
                    "W001",
                    file,
                    &branch_path,
                    format!(
                        "{} has several combined subschemas with the same criterion",
                        combined.criterion()
                    ),
                ));
            }
            for (i, subschema) in combined.subschemas().iter().enumerate() {
                let child_path = if combined.is_synthetic() {
                    path.to_string()
                } else {
                    format!("{}/{}", branch_path, i)
                };
                check_combined(subschema, file, &child_path, diagnostics);
            }
        }
        Schema::Object(object) => {
            for (name, property) in &object.properties {
                let child_path = format!("{}/properties/{}", path, escape_pointer_segment(name));
                check_combined(property, file, &child_path, diagnostics);
            }
        }
        Schema::Array(array) => {
            if let Some(items) = &array.items {
                check_combined(items, file, &format!("{}/items", path), diagnostics);
            }
        }
        _ => {}
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn lint_str(content: &str) -> FileResult {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        lint_file(file.path(), file.path().parent().unwrap())
    }

    #[test]
    fn lint_valid_schema() {
        let result = lint_str(
            r#"{
            "$id": "https://example.com/test.json",
            "type": "object",
            "properties": {
                "id": { "anyOf": [{ "type": "string" }, { "type": "integer" }] }
            }
        }"#,
        );
        assert_eq!(result.status, FileStatus::Ok);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn lint_invalid_json_syntax() {
        let result = lint_str("{ not valid json }");
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, "E001");
    }

    #[test]
    fn lint_unreadable_file_is_a_load_failure() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("schema.json");
        std::fs::create_dir(&file).unwrap();

        let result = lint_file(&file, dir.path());
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, "E002");
        assert!(result.diagnostics[0].message.starts_with("cannot load schema"));
    }

    #[test]
    fn lint_unsupported_keyword() {
        let result = lint_str(
            r##"{
            "$id": "https://example.com/test.json",
            "properties": { "data": { "$ref": "#/$defs/data" } }
        }"##,
        );
        assert_eq!(result.status, FileStatus::Error);
        assert!(result.diagnostics.iter().any(|d| d.code == "E002"));
    }

    #[test]
    fn lint_empty_combinator() {
        let result = lint_str(
            r#"{
            "$id": "https://example.com/test.json",
            "properties": { "kind": { "oneOf": [] } }
        }"#,
        );
        assert_eq!(result.status, FileStatus::Error);
        let codes: Vec<_> = result.diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["E003"]);
        assert_eq!(result.diagnostics[0].path, "/properties/kind/oneOf");
    }

    #[test]
    fn lint_duplicate_criteria() {
        let result = lint_str(
            r#"{
            "$id": "https://example.com/test.json",
            "properties": {
                "value": {
                    "anyOf": [
                        { "allOf": [{ "type": "string" }] },
                        { "allOf": [{ "maxLength": 3 }] }
                    ]
                }
            }
        }"#,
        );
        assert_eq!(result.status, FileStatus::Warning);
        let warning = result.diagnostics.iter().find(|d| d.code == "W001").unwrap();
        assert_eq!(warning.path, "/properties/value/anyOf");
    }

    #[test]
    fn lint_missing_id_warning() {
        let result = lint_str(r#"{ "type": "object" }"#);
        assert_eq!(result.status, FileStatus::Warning);
        assert!(result.diagnostics.iter().any(|d| d.code == "W002"));
    }

    #[test]
    fn lint_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("good.json"),
            r#"{ "$id": "https://example.com/good.json", "type": "string" }"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/bad.json"), "{ broken").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = lint(dir.path(), false);
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert!(!result.is_ok());
    }

    #[test]
    fn lint_strict_mode_fails_on_warnings() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("no_id.json"), r#"{ "type": "string" }"#).unwrap();

        assert_eq!(lint(dir.path(), false).failed, 0);
        assert_eq!(lint(dir.path(), true).failed, 1);
    }
}
