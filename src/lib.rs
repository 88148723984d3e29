//! # Strata Library
//!
//! This library resolves hierarchical data values and renders YAML templates
//! against them. It is designed to be used by the `strata` command-line tool
//! but can also be embedded by applications that want the same data values
//! cascade with their own template evaluator.
//!
//! ## Quick Example
//!
//! ```
//! use strata::config::{FlagOverlays, TemplateOptions};
//! use strata::evaluator::SubstitutionEvaluator;
//! use strata::filesystem::FileSet;
//! use strata::phases::orchestrator;
//!
//! let mut files = FileSet::new();
//! files
//!     .add_file_string("values.yml", "#@data/values\n---\nname: web\n")
//!     .unwrap();
//! files
//!     .add_file_string("app.yml", "name: (@= data.values.name @)\n")
//!     .unwrap();
//!
//! let output = orchestrator::run_with_overlays(
//!     files,
//!     &TemplateOptions::default(),
//!     &SubstitutionEvaluator::new(),
//!     &FlagOverlays::default(),
//! )
//! .unwrap();
//! assert_eq!(output.doc_set.len(), 1);
//! ```
//!
//! ## Core Concepts
//!
//! - **Files (`filesystem`)**: An ordered in-memory set of input files with
//!   logical paths and marks.
//! - **Libraries (`phases`)**: Files under `_lib/<name>/` form private
//!   libraries nested in the root library. Each library resolves its own
//!   data values.
//! - **Data values (`documents`, `merge`)**: YAML documents annotated with
//!   `#@data/values`, layered in declaration order. Documents annotated with
//!   `#@library/ref` are sent to another library.
//! - **Schema (`schema`)**: An optional document that types the root
//!   library's values and supplies their defaults.
//! - **Evaluation (`evaluator`)**: Templates are rendered by a
//!   [`evaluator::TemplateEvaluator`] with their library's final values.
//!
//! ## Execution Flow
//!
//! The main entry point is the `phases::orchestrator`, which executes the
//! following high-level steps:
//!
//! 1.  **Discovery**: Classify files and build the library tree.
//! 2.  **Values**: Layer data values per library.
//! 3.  **Schema**: Pick the schema for the root library.
//! 4.  **Execution**: Route library values, resolve every scope, evaluate
//!     templates.
//! 5.  **Assembly**: Shape the result for the output mode.
//! 6.  **Disk Output**: Optionally write output files to a directory.

pub mod config;
pub mod defaults;
pub mod documents;
pub mod error;
pub mod evaluator;
pub mod filesystem;
pub mod merge;
pub mod output;
pub mod path;
pub mod phases;
pub mod schema;
pub mod source;
pub mod suggestions;

#[cfg(test)]
mod path_proptest;
