//! Default values and well-known names used across the pipeline.
//!
//! This module centralizes directory names, annotation names and
//! placeholder names so the classifier, the resolver and the CLI agree on
//! them.

/// Directory name that introduces a private library: `_lib/<name>/...`.
pub const PRIVATE_LIBRARY_DIR: &str = "_lib";

/// Logical name given to content read from standard input.
pub const STDIN_FILE_NAME: &str = "stdin.yml";

/// Prefix used for environment variables read by the CLI (e.g. `STRATA_LOG`).
pub const ENV_PREFIX: &str = "STRATA";

/// Separator between nested keys in `--data-values-env` variable names.
pub const ENV_KEY_SEPARATOR: &str = "__";

/// Document annotation names recognized by the classifier.
pub mod annotations {
    /// Marks a document as a data values document.
    pub const DATA_VALUES: &str = "data/values";
    /// Marks a document as the data values schema.
    pub const DATA_VALUES_SCHEMA: &str = "data/values-schema";
    /// Older spelling of the schema marker: `#@schema/match data_values=True`.
    pub const SCHEMA_MATCH: &str = "schema/match";
    /// Targets a data values document at another library.
    pub const LIBRARY_REF: &str = "library/ref";
    /// `#@overlay/match missing_ok=True` permits new keys.
    pub const OVERLAY_MATCH: &str = "overlay/match";
}
