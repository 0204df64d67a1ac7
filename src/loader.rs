//! Schema document loading from files, strings and HTTP URLs.

use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;
use crate::parser::parse_schema;
use crate::schema::Schema;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_schema_str(&content)
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a JSON document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the response
/// isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_schema_url(url: &str) -> Result<Value, LoadError> {
    let network_error = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    tracing::debug!(url, "fetching schema");
    client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network_error)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a JSON document from a file path or URL.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_schema_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_schema_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_schema(Path::new(source))
    }
}

/// Load a document from a file path or URL and parse it into a schema graph.
///
/// # Errors
///
/// Returns the loading error, or the parse error from [`parse_schema`].
pub fn load_schema_graph(source: &str) -> Result<Schema, LoadError> {
    parse_schema(&load_schema_auto(source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_schema_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"anyOf": [{{"type": "string"}}]}}"#).unwrap();

        let schema = load_schema(file.path()).unwrap();
        assert!(schema["anyOf"].is_array());
    }

    #[test]
    fn load_schema_file_not_found() {
        let result = load_schema(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_schema_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_schema(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_schema_str_invalid() {
        let result = load_schema_str("not json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/schema.json"));
        assert!(is_url("http://example.com/schema.json"));
        assert!(!is_url("/path/to/schema.json"));
        assert!(!is_url("schema.json"));
    }

    #[test]
    fn load_schema_graph_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"oneOf": [{{"type": "string"}}, {{"type": "null"}}]}}"#).unwrap();

        let schema = load_schema_graph(file.path().to_str().unwrap()).unwrap();
        let combined = schema.as_combined().unwrap();
        assert_eq!(combined.criterion().keyword(), "oneOf");
    }

    #[test]
    fn load_schema_graph_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"allOf": "nope"}}"#).unwrap();

        let result = load_schema_graph(file.path().to_str().unwrap());
        assert!(matches!(result, Err(LoadError::InvalidSchema { .. })));
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_schema_url_valid() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/schema.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"allOf": [{"type": "object"}]}"#)
                .create();

            let url = format!("{}/schema.json", server.url());
            let schema = load_schema_url(&url).unwrap();
            assert!(schema["allOf"].is_array());
            mock.assert();
        }

        #[test]
        fn load_schema_url_404() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("GET", "/missing.json").with_status(404).create();

            let url = format!("{}/missing.json", server.url());
            let result = load_schema_url(&url);
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
        }

        #[test]
        fn load_schema_auto_url() {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("GET", "/schema.json")
                .with_status(200)
                .with_body(r#"{"type": "string"}"#)
                .create();

            let url = format!("{}/schema.json", server.url());
            let schema = load_schema_graph(&url).unwrap();
            assert!(matches!(schema, Schema::String(_)));
        }
    }
}
