//! Combined Schema CLI
//!
//! Command-line interface for validating instances against combinator
//! schemas, describing parsed schema graphs and linting schema files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use combined_schema::{
    lint, load_schema, load_schema_graph, to_json, validate_against_schema, FileStatus, Severity,
    ValidateError,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "combined-schema")]
#[command(about = "Validate, describe and lint allOf/anyOf/oneOf schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an instance document against a schema
    Validate {
        /// Instance file to validate
        instance: PathBuf,

        /// Schema source: file path or URL (http:// or https://)
        #[arg(long)]
        schema: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Parse a schema and write the resulting graph back as JSON Schema
    Describe {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Report whether a schema defines a property (e.g. "#/buyer/email")
    Probe {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Property path, `/`-separated
        field: String,
    },

    /// Lint schema files (syntax, unsupported keywords, combinator issues)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            instance,
            schema,
            json,
        } => run_validate(&instance, &schema, json),
        Commands::Describe {
            schema,
            output,
            pretty,
        } => run_describe(&schema, output, pretty),
        Commands::Probe { schema, field } => run_probe(&schema, &field),
        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_validate(instance_path: &Path, schema_source: &str, json_output: bool) -> Result<(), u8> {
    let instance = load_schema(instance_path).map_err(|e| {
        report_error(json_output, &format!("loading instance: {}", e));
        e.exit_code() as u8
    })?;

    let schema = load_schema_graph(schema_source).map_err(|e| {
        report_error(json_output, &format!("loading schema: {}", e));
        e.exit_code() as u8
    })?;

    match validate_against_schema(&schema, &instance) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in &errors {
                    print_violation(error, 1);
                }
            }
            Err(1)
        }
        Err(ValidateError::Load(e)) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

fn print_violation(error: &combined_schema::ValidationError, depth: usize) {
    eprintln!("{}{}", "  ".repeat(depth), error);
    for cause in &error.causes {
        print_violation(cause, depth + 1);
    }
}

fn run_describe(schema_source: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let schema = load_schema_graph(schema_source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let described = to_json(&schema);
    let json_output = if pretty {
        serde_json::to_string_pretty(&described)
    } else {
        serde_json::to_string(&described)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_probe(schema_source: &str, field: &str) -> Result<(), u8> {
    let schema = load_schema_graph(schema_source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if schema.defines_property(field) {
        println!("defined: {}", field);
        Ok(())
    } else {
        println!("not defined: {}", field);
        Err(1)
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let rendered = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.failed == 0 {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.failed == 0 {
        Ok(())
    } else {
        Err(1)
    }
}
