//! Phase 5: Assembly
//!
//! Shapes the result of a run according to its [`OutputMode`]:
//!
//! - `Normal`: every document and file produced by the execution.
//! - `ValuesInspect`: a single document holding the root library's final
//!   values. Nothing is evaluated.
//! - `FilesInspect`: a single document listing every file of the tree,
//!   sorted. Values are not resolved and nothing is evaluated.

use serde_yaml::Value as YamlValue;

pub use crate::config::OutputMode;

use super::execution::LibraryExecution;
use super::TemplateOutput;
use crate::documents::DocumentSet;
use crate::error::Result;

/// Executes Phase 5 of the pipeline.
pub fn execute(mode: OutputMode, execution: &LibraryExecution<'_>) -> Result<TemplateOutput> {
    match mode {
        OutputMode::Normal => execution.run(),
        OutputMode::ValuesInspect => Ok(values_inspect(execution.root_values()?)),
        OutputMode::FilesInspect => Ok(files_inspect(
            execution.root().all_files().into_iter().map(|file| file.path()),
        )),
    }
}

/// One document with the given file paths, sorted.
pub fn files_inspect<'a, I>(paths: I) -> TemplateOutput
where
    I: IntoIterator<Item = &'a str>,
{
    let mut paths: Vec<String> = paths.into_iter().map(str::to_string).collect();
    paths.sort();
    let listing = YamlValue::Sequence(paths.into_iter().map(YamlValue::String).collect());
    TemplateOutput {
        doc_set: DocumentSet::single(listing, "files inspect"),
        files: Vec::new(),
    }
}

/// One document with the root library's final values.
pub fn values_inspect(values: YamlValue) -> TemplateOutput {
    TemplateOutput {
        doc_set: DocumentSet::single(values, "data values inspect"),
        files: Vec::new(),
    }
}
