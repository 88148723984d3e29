//! # Error Handling
//!
//! This module defines the centralized error type for `strata`. It uses the
//! `thiserror` library to build one `Error` enum covering every failure mode
//! of the resolution pipeline, with messages that name the library scope,
//! file, or value path involved.
//!
//! ## Error Families
//!
//! - **Structural**: duplicate files, malformed or unresolved library
//!   references, more than one schema document in a scope. Detected while
//!   the library tree is built.
//! - **Schema policy**: the schema flag was enabled but no schema document
//!   was supplied.
//! - **Merge conflict**: an overlay introduced a key without permission, or
//!   changed a value's type under strict mode.
//! - **Validation**: the resolved values do not match the schema.
//! - **Evaluation**: the template evaluator rejected a template.
//!
//! Every error is fatal. The pipeline never produces partial output, so the
//! first error encountered is the one reported.
//!
//! The `Result` type alias is used to return `Result<T, Error>` from
//! functions throughout the library.

use thiserror::Error;

fn format_hint(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!("\n  hint: {}", h))
        .unwrap_or_default()
}

/// Main error type for strata operations
#[derive(Error, Debug)]
pub enum Error {
    /// The library tree could not be built from the input files.
    #[error("Library tree error: {message}{}", format_hint(hint))]
    LibraryTree {
        message: String,
        /// Optional hint for how to fix the file layout
        hint: Option<String>,
    },

    /// The same logical path was supplied twice.
    #[error("Duplicate file path: {path}")]
    DuplicateFile { path: String },

    /// A library reference does not name a library in the tree.
    #[error("Unresolved library reference '{reference}' in {origin}{}", format_hint(hint))]
    UnresolvedLibrary {
        reference: String,
        /// File or flag that carried the reference
        origin: String,
        hint: Option<String>,
    },

    /// More than one schema document was found in a single library scope.
    #[error("Expected at most one schema document in library {library}, found {count}: {files}")]
    MultipleSchemas {
        library: String,
        count: usize,
        files: String,
    },

    /// The schema enable flag and the presence of a schema document disagree.
    #[error("Schema policy error: {message}{}", format_hint(hint))]
    SchemaPolicy {
        message: String,
        hint: Option<String>,
    },

    /// A schema document could not be turned into a typed schema.
    #[error("Schema error in {source_name}: {message}")]
    Schema {
        source_name: String,
        message: String,
    },

    /// An overlay could not be merged onto the values accumulated so far.
    #[error("Merge conflict in library {library} at '{key_path}' from {source_name}: {message}{}", format_hint(hint))]
    MergeConflict {
        library: String,
        key_path: String,
        source_name: String,
        message: String,
        hint: Option<String>,
    },

    /// The resolved values did not satisfy the schema.
    #[error("Validation error at '{path}': expected {expected}, found {actual}")]
    Validation {
        path: String,
        expected: String,
        actual: String,
    },

    /// The template evaluator failed on a file.
    #[error("Evaluation error in {file} (library {library}): {message}")]
    Evaluation {
        file: String,
        library: String,
        message: String,
    },

    /// An annotation or comment line could not be understood.
    #[error("Annotation error in {file}:{line}: {message}")]
    Annotation {
        file: String,
        line: usize,
        message: String,
    },

    /// A YAML document inside a file could not be parsed.
    #[error("Invalid YAML document {index} in {file}: {message}")]
    Document {
        file: String,
        index: usize,
        message: String,
    },

    /// A data value flag could not be turned into an overlay.
    #[error("Data value flag error: {flag} - {message}")]
    DataValueFlag { flag: String, message: String },

    /// A file mark flag was malformed.
    #[error("File mark error: {mark} - {message}")]
    FileMark { mark: String, message: String },

    /// A file source could not read input or write output.
    #[error("File source error: {message}")]
    FileSource { message: String },

    /// An error occurred with an output filesystem operation.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An error occurred with a path-related operation.
    #[error("Path operation error: {message}")]
    Path { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_library_tree() {
        let error = Error::LibraryTree {
            message: "file directly inside _lib".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Library tree error"));
        assert!(display.contains("file directly inside _lib"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_library_tree_with_hint() {
        let error = Error::LibraryTree {
            message: "bad layout".to_string(),
            hint: Some("Move the file into _lib/<name>/".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("_lib/<name>/"));
    }

    #[test]
    fn test_error_display_unresolved_library() {
        let error = Error::UnresolvedLibrary {
            reference: "@missing".to_string(),
            origin: "values.yml".to_string(),
            hint: Some("Known libraries: a, b".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Unresolved library reference '@missing'"));
        assert!(display.contains("values.yml"));
        assert!(display.contains("Known libraries: a, b"));
    }

    #[test]
    fn test_error_display_multiple_schemas() {
        let error = Error::MultipleSchemas {
            library: "(root)".to_string(),
            count: 2,
            files: "a.yml, b.yml".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("at most one schema document"));
        assert!(display.contains("found 2"));
        assert!(display.contains("a.yml, b.yml"));
    }

    #[test]
    fn test_error_display_merge_conflict() {
        let error = Error::MergeConflict {
            library: "(root)".to_string(),
            key_path: "app.replicas".to_string(),
            source_name: "--data-value 'app.replicas=3'".to_string(),
            message: "key does not exist in earlier layers".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Merge conflict"));
        assert!(display.contains("app.replicas"));
        assert!(display.contains("--data-value"));
    }

    #[test]
    fn test_error_display_validation() {
        let error = Error::Validation {
            path: "ports[0]".to_string(),
            expected: "int".to_string(),
            actual: "string".to_string(),
        };
        let display = format!("{}", error);
        assert_eq!(
            display,
            "Validation error at 'ports[0]': expected int, found string"
        );
    }

    #[test]
    fn test_error_display_evaluation() {
        let error = Error::Evaluation {
            file: "deploy.yml".to_string(),
            library: "(root)".to_string(),
            message: "unknown expression".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Evaluation error in deploy.yml"));
        assert!(display.contains("unknown expression"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_str = "invalid: [unclosed";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: Error = yaml_error.into();
        let display = format!("{}", error);
        assert!(display.contains("YAML parsing error"));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(format!("{}", error).contains("JSON error"));
    }
}
