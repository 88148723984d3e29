//! Orchestrator for a complete template run
//!
//! This module coordinates the phases to provide a clean API for one run:
//! input files and options go in, documents and output files come out.

use super::discovery::Placement;
use super::execution::LibraryExecution;
use super::{phase1, phase3, phase5, Library, TemplateOutput};
use crate::config::{apply_file_marks, FlagOverlays, OutputMode, TemplateOptions};
use crate::error::Result;
use crate::evaluator::TemplateEvaluator;
use crate::filesystem::FileSet;

/// Execute a complete run (Phases 1-5)
///
/// 1. Apply file marks, place files in libraries and classify them
/// 2. Turn data value flags into overlays (reads the environment and files)
/// 3. Pick the schema
/// 4. Route library values and execute the tree
/// 5. Assemble the result for the requested output mode
///
/// A files inspection stops once files are placed, before any file content
/// is read.
pub fn run(
    files: FileSet,
    options: &TemplateOptions,
    evaluator: &dyn TemplateEvaluator,
) -> Result<TemplateOutput> {
    let placement = prepare(files, options)?;
    if options.mode == OutputMode::FilesInspect {
        return Ok(phase5::files_inspect(placement.paths()));
    }
    let root = phase1::execute(placement, options)?;
    let flags = options.data_values.as_overlays(options.strict_yaml)?;
    run_tree(&root, options, evaluator, &flags)
}

/// Execute a complete run with flag overlays computed by the caller.
pub fn run_with_overlays(
    files: FileSet,
    options: &TemplateOptions,
    evaluator: &dyn TemplateEvaluator,
    flags: &FlagOverlays,
) -> Result<TemplateOutput> {
    let placement = prepare(files, options)?;
    if options.mode == OutputMode::FilesInspect {
        return Ok(phase5::files_inspect(placement.paths()));
    }
    let root = phase1::execute(placement, options)?;
    run_tree(&root, options, evaluator, flags)
}

fn prepare(mut files: FileSet, options: &TemplateOptions) -> Result<Placement> {
    apply_file_marks(&mut files, &options.file_marks)?;

    // Phase 1: Discovery, up to library membership
    phase1::place(files)
}

fn run_tree(
    root: &Library,
    options: &TemplateOptions,
    evaluator: &dyn TemplateEvaluator,
    flags: &FlagOverlays,
) -> Result<TemplateOutput> {
    // Phase 3: Schema
    let schema = phase3::execute(root, options.schema_enabled)?;

    // Phases 2 and 4: Values and Execution
    let execution = LibraryExecution::new(root, schema.as_ref(), evaluator, options, flags)?;

    // Phase 5: Assembly
    phase5::execute(options.mode, &execution)
}
