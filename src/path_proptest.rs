//! Property-based tests for path manipulation functions.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{glob_match, implicit_library, normalize_logical_path, LibraryPath, LibraryRef};
    use proptest::prelude::*;

    fn segment() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,8}"
    }

    // ============================================================================
    // normalize_logical_path property tests
    // ============================================================================

    proptest! {
        /// Property: normalizing twice gives the same result as normalizing once
        #[test]
        fn normalize_is_idempotent(segments in prop::collection::vec(segment(), 1..5)) {
            let messy = format!("./{}", segments.join("//"));
            let once = normalize_logical_path(&messy).unwrap();
            let twice = normalize_logical_path(&once).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once, segments.join("/"));
        }

        /// Property: normalized paths never contain backslashes or empty segments
        #[test]
        fn normalize_output_is_clean(input in "[a-z./\\\\]{1,20}") {
            if let Ok(result) = normalize_logical_path(&input) {
                prop_assert!(!result.contains('\\'));
                prop_assert!(!result.split('/').any(|s| s.is_empty() || s == "."));
            }
        }
    }

    // ============================================================================
    // implicit_library property tests
    // ============================================================================

    proptest! {
        /// Property: nesting files under `_lib/<name>/` yields exactly those libraries
        #[test]
        fn implicit_library_recovers_nesting(
            libraries in prop::collection::vec(segment(), 0..4),
            dirs in prop::collection::vec(segment(), 0..3),
            name in "[a-z]{1,8}\\.yml",
        ) {
            let mut parts: Vec<String> = libraries
                .iter()
                .flat_map(|lib| ["_lib".to_string(), lib.clone()])
                .collect();
            parts.extend(dirs.iter().cloned());
            parts.push(name.clone());

            let (library, rest) = implicit_library(&parts.join("/")).unwrap();
            prop_assert_eq!(library.segments(), libraries.as_slice());

            let mut expected_rest = dirs.clone();
            expected_rest.push(name);
            prop_assert_eq!(rest, expected_rest.join("/"));
        }
    }

    // ============================================================================
    // LibraryRef property tests
    // ============================================================================

    proptest! {
        /// Property: a relative reference descends from the declaring library
        #[test]
        fn relative_ref_extends_declaring_path(
            declaring in prop::collection::vec(segment(), 0..3),
            target in prop::collection::vec(segment(), 1..3),
        ) {
            let declaring = LibraryPath::from_segments(declaring).unwrap();
            let reference = LibraryRef::parse(&format!("@{}", target.join("@"))).unwrap();
            let resolved = reference.resolve(&declaring).unwrap();
            prop_assert_eq!(resolved.depth(), declaring.depth() + target.len());
            prop_assert!(resolved.segments().starts_with(declaring.segments()));
        }

        /// Property: an absolute reference ignores the declaring library
        #[test]
        fn absolute_ref_is_independent_of_declaring_path(
            declaring in prop::collection::vec(segment(), 0..3),
            target in prop::collection::vec(segment(), 0..3),
        ) {
            let declaring = LibraryPath::from_segments(declaring).unwrap();
            let reference = LibraryRef::parse(&format!("/{}", target.join("/"))).unwrap();
            let resolved = reference.resolve(&declaring).unwrap();
            prop_assert_eq!(resolved.segments(), target.as_slice());
        }

        /// Property: a path's parent is one segment shorter and a prefix of it
        #[test]
        fn parent_is_prefix(segments in prop::collection::vec(segment(), 1..5)) {
            let path = LibraryPath::from_segments(segments).unwrap();
            let parent = path.parent().unwrap();
            prop_assert_eq!(parent.depth() + 1, path.depth());
            prop_assert_eq!(parent, path.prefix(path.depth() - 1));
        }
    }

    // ============================================================================
    // glob_match property tests
    // ============================================================================

    proptest! {
        /// Property: glob pattern "*" matches any non-empty single path component
        #[test]
        fn glob_star_matches_single_component(path in "[a-zA-Z0-9_.]+") {
            let result = glob_match("*", &path);
            prop_assert!(result.is_ok());
            prop_assert!(result.unwrap(), "Pattern '*' should match '{}'", path);
        }

        /// Property: an exact path is matched by itself used as a pattern
        #[test]
        fn glob_exact_path_matches_itself(segments in prop::collection::vec(segment(), 1..4)) {
            let path = segments.join("/");
            prop_assert!(glob_match(&path, &path).unwrap());
        }
    }
}
