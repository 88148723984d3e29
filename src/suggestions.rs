//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Errors should tell users what went
//! wrong AND how to fix it.
//!
//! Library-level errors carry hints as plain strings (the `hint` field of
//! [`crate::error::Error`] variants); CLI-level errors are `anyhow` errors.

use crate::defaults::{annotations, PRIVATE_LIBRARY_DIR};
use crate::path::LibraryPath;

/// Hint for a library reference that names no library in the tree.
///
/// Suggests a close match when there is one and lists the known libraries.
pub fn unknown_library_hint(target: &LibraryPath, known: &[LibraryPath]) -> String {
    let names: Vec<String> = known
        .iter()
        .filter(|path| !path.is_root())
        .map(|path| path.to_string())
        .collect();
    if names.is_empty() {
        return format!(
            "No libraries are defined; place library files under {}/<name>/",
            PRIVATE_LIBRARY_DIR
        );
    }

    let candidates: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    let did_you_mean = find_similar(&target.to_string(), &candidates)
        .map(|s| format!("Did you mean '{s}'? "))
        .unwrap_or_default();
    format!("{did_you_mean}Known libraries: {}", names.join(", "))
}

/// Hint for enabling schemas without supplying a schema document.
pub fn schema_document_missing_hint() -> String {
    format!(
        "Add a document annotated with '#@{}' to the root library, or drop --enable-experiment-schema",
        annotations::DATA_VALUES_SCHEMA
    )
}

/// Warning for a schema document supplied while schemas are disabled.
pub fn schema_disabled_warning(source: &str) -> String {
    format!(
        "Schema document in {source} is ignored because schemas are not enabled\n  \
         hint: Pass --enable-experiment-schema to use it"
    )
}

/// Generate an error for a run without any input.
///
/// Includes hints about the available input flags.
pub fn no_input_files() -> anyhow::Error {
    anyhow::anyhow!(
        "No input files given\n\n\
         hint: Use -f/--file to add files or directories ('-' reads stdin)\n\
         hint: Use --bulk-in to pass files as JSON"
    )
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_len][b_len]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<LibraryPath> {
        names.iter().map(|n| LibraryPath::parse(n).unwrap()).collect()
    }

    #[test]
    fn test_unknown_library_suggests_similar() {
        let known = paths(&["/", "frontend", "backend"]);
        let hint = unknown_library_hint(&LibraryPath::parse("frontnd").unwrap(), &known);
        assert!(hint.contains("Did you mean 'frontend'?"));
        assert!(hint.contains("Known libraries: frontend, backend"));
    }

    #[test]
    fn test_unknown_library_no_suggestion_for_very_different() {
        let known = paths(&["frontend"]);
        let hint = unknown_library_hint(&LibraryPath::parse("zzz").unwrap(), &known);
        assert!(!hint.contains("Did you mean"));
        assert!(hint.contains("Known libraries: frontend"));
    }

    #[test]
    fn test_unknown_library_without_libraries() {
        let hint = unknown_library_hint(&LibraryPath::parse("lib").unwrap(), &paths(&["/"]));
        assert!(hint.contains("No libraries are defined"));
        assert!(hint.contains("_lib/<name>/"));
    }

    #[test]
    fn test_schema_hints_name_flag() {
        assert!(schema_document_missing_hint().contains("--enable-experiment-schema"));
        assert!(schema_document_missing_hint().contains("#@data/values-schema"));
        let warning = schema_disabled_warning("schema.yml");
        assert!(warning.contains("schema.yml"));
        assert!(warning.contains("hint:"));
    }

    #[test]
    fn test_no_input_files_includes_hints() {
        let message = no_input_files().to_string();
        assert!(message.contains("No input files"));
        assert!(message.contains("-f/--file"));
        assert!(message.contains("--bulk-in"));
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("frontend", "frontend"), 0);
        assert_eq!(edit_distance("frontnd", "frontend"), 1);
        assert_eq!(edit_distance("backend", "frontend"), 5);
    }

    #[test]
    fn test_find_similar() {
        let candidates = ["app", "db", "cache"];

        assert_eq!(find_similar("ap", &candidates), Some("app"));
        assert_eq!(find_similar("cach", &candidates), Some("cache"));
        assert_eq!(find_similar("zzzzzz", &candidates), None);
    }
}
