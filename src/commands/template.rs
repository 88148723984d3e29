//! # Template Command Implementation
//!
//! This module implements the `template` subcommand (aliases `t`, `tpl`),
//! which runs the full pipeline on a set of input files.
//!
//! ## Functionality
//!
//! - **Input**: files and directories given with `-f` (`-` reads stdin), or
//!   a JSON bundle given with `--bulk-in`.
//! - **Data values**: layered from data values documents, then from the
//!   data value flags in this order: values files, env, env-yaml, `-v`,
//!   `--data-value-yaml`, `--data-value-file`.
//! - **Output**: documents on stdout (`yaml` or `json`), output files under
//!   `--output-files`, or a JSON bundle with `--bulk-out`.
//! - **Inspection**: `--data-values-inspect` prints the root library's final
//!   values; `--files-inspect` lists the input files.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

use strata::config::{DataValuesFlags, FileMark, OutputMode, TemplateOptions};
use strata::evaluator::SubstitutionEvaluator;
use strata::output::{DebugTimer, OutputFormat};
use strata::phases::orchestrator;
use strata::source::{pick_source, BulkFilesSource, FileSource, RegularFilesSource};
use strata::suggestions;

/// Format of documents printed to stdout
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum FormatArg {
    #[default]
    Yaml,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Yaml => OutputFormat::Yaml,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Process YAML templates with layered data values
#[derive(Args, Debug, Default)]
pub struct TemplateArgs {
    /// File or directory to process ('-' reads stdin); repeatable
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub files: Vec<String>,

    /// Write output files under this directory instead of printing documents
    #[arg(long, value_name = "DIR")]
    pub output_files: Option<PathBuf>,

    /// Format of documents printed to stdout
    #[arg(short = 'o', long, value_enum, default_value = "yaml")]
    pub output: FormatArg,

    /// Read input files from JSON: {"files":[{"name":..,"data":..}]}
    #[arg(long, value_name = "JSON")]
    pub bulk_in: Option<String>,

    /// Print output files as JSON
    #[arg(long)]
    pub bulk_out: bool,

    /// Accept comments that are neither '#@' annotations nor '#!' comments
    #[arg(long)]
    pub ignore_unknown_comments: bool,

    /// Let every data values overlay add keys
    #[arg(long)]
    pub implicit_map_key_overrides: bool,

    /// Reject YAML tags and type-changing overlays
    #[arg(short = 's', long)]
    pub strict: bool,

    /// Log the library tree and timings
    #[arg(long)]
    pub debug: bool,

    /// Use the root data values schema document
    #[arg(long, env = "STRATA_ENABLE_EXPERIMENT_SCHEMA")]
    pub enable_experiment_schema: bool,

    /// Mark files: 'glob:key=value' with keys exclude, type, library, for-output
    #[arg(long = "file-mark", value_name = "MARK")]
    pub file_marks: Vec<String>,

    /// Data values file ('@lib:path' targets a library); repeatable
    #[arg(long = "data-values-file", value_name = "PATH")]
    pub data_values_files: Vec<String>,

    /// Read string data values from PREFIX_* environment variables
    #[arg(long = "data-values-env", value_name = "PREFIX")]
    pub data_values_env: Vec<String>,

    /// Read YAML data values from PREFIX_* environment variables
    #[arg(long = "data-values-env-yaml", value_name = "PREFIX")]
    pub data_values_env_yaml: Vec<String>,

    /// String data value '[@lib:]key=value' ('key+=value' adds a new key)
    #[arg(short = 'v', long = "data-value", value_name = "KV")]
    pub data_value: Vec<String>,

    /// YAML data value '[@lib:]key=yaml'
    #[arg(long = "data-value-yaml", value_name = "KV")]
    pub data_value_yaml: Vec<String>,

    /// Data value read from a file '[@lib:]key=path'
    #[arg(long = "data-value-file", value_name = "KV")]
    pub data_value_file: Vec<String>,

    /// Print the final data values of the root library
    #[arg(long, conflicts_with = "files_inspect")]
    pub data_values_inspect: bool,

    /// Print the list of input files
    #[arg(long)]
    pub files_inspect: bool,
}

impl TemplateArgs {
    /// Convert parsed flags into pipeline options.
    pub fn template_options(&self) -> Result<TemplateOptions> {
        let file_marks = self
            .file_marks
            .iter()
            .map(|mark| FileMark::parse(mark))
            .collect::<strata::error::Result<Vec<_>>>()?;

        let mode = if self.files_inspect {
            OutputMode::FilesInspect
        } else if self.data_values_inspect {
            OutputMode::ValuesInspect
        } else {
            OutputMode::Normal
        };

        Ok(TemplateOptions {
            ignore_unknown_comments: self.ignore_unknown_comments,
            implicit_map_key_overrides: self.implicit_map_key_overrides,
            strict_yaml: self.strict,
            debug: self.debug,
            mode,
            schema_enabled: self.enable_experiment_schema,
            file_marks,
            data_values: DataValuesFlags {
                files: self.data_values_files.clone(),
                env_prefixes: self.data_values_env.clone(),
                env_yaml_prefixes: self.data_values_env_yaml.clone(),
                kv_strings: self.data_value.clone(),
                kv_yamls: self.data_value_yaml.clone(),
                kv_files: self.data_value_file.clone(),
            },
        })
    }
}

/// Execute the `template` command.
pub fn execute(args: TemplateArgs) -> Result<()> {
    let _timer = DebugTimer::start("total", args.debug);
    let options = args.template_options()?;

    let bulk = BulkFilesSource {
        input_json: args.bulk_in.clone(),
        bulk_out: args.bulk_out,
    };
    let regular = RegularFilesSource {
        paths: args.files.clone(),
        output_dir: args.output_files.clone(),
        format: args.output.into(),
    };
    let sources: [&dyn FileSource; 2] = [&bulk, &regular];

    let input_source = pick_source(&sources, |s| s.has_input())
        .filter(|s| s.has_input())
        .ok_or_else(suggestions::no_input_files)?;
    let files = input_source.input().context("Failed to read input files")?;

    let evaluator = SubstitutionEvaluator::new();
    let result = orchestrator::run(files, &options, &evaluator);

    let output_source = pick_source(&sources, |s| s.has_output())
        .ok_or_else(|| anyhow::anyhow!("No output destination available"))?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    output_source.output(result, &mut handle)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_options_mode() {
        let args = TemplateArgs {
            files_inspect: true,
            ..Default::default()
        };
        assert_eq!(args.template_options().unwrap().mode, OutputMode::FilesInspect);

        let args = TemplateArgs {
            data_values_inspect: true,
            ..Default::default()
        };
        assert_eq!(args.template_options().unwrap().mode, OutputMode::ValuesInspect);
    }

    #[test]
    fn test_template_options_flags() {
        let args = TemplateArgs {
            strict: true,
            data_value: vec!["a=1".to_string()],
            file_marks: vec!["*.txt:exclude=true".to_string()],
            ..Default::default()
        };
        let options = args.template_options().unwrap();
        assert!(options.strict_yaml);
        assert_eq!(options.data_values.kv_strings, vec!["a=1"]);
        assert_eq!(options.file_marks[0].key, "exclude");
    }

    #[test]
    fn test_invalid_file_mark() {
        let args = TemplateArgs {
            file_marks: vec!["nocolon".to_string()],
            ..Default::default()
        };
        assert!(args.template_options().is_err());
    }
}
