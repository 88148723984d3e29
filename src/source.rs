//! File sources: where a run's input comes from and where its result goes.
//!
//! Two sources exist. [`BulkFilesSource`] exchanges every file as one JSON
//! object, which suits callers driving the tool programmatically.
//! [`RegularFilesSource`] reads files and directories from the host and
//! prints documents to stdout, or writes output files under a directory.
//!
//! The command picks the first source that has input (and separately the
//! first that has output), falling back to the last source.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::defaults::STDIN_FILE_NAME;
use crate::error::{Error, Result};
use crate::filesystem::{File, FileSet};
use crate::output::{render_documents, OutputFormat};
use crate::phases::{phase6, TemplateOutput};

pub trait FileSource {
    fn has_input(&self) -> bool;
    fn has_output(&self) -> bool;
    fn input(&self) -> Result<FileSet>;
    /// Deliver a run's result. A failed run is reported and returned.
    fn output(&self, result: Result<TemplateOutput>, out: &mut dyn Write) -> Result<()>;
}

/// Return the first source matching `predicate`, else the last source.
pub fn pick_source<'a>(
    sources: &[&'a dyn FileSource],
    predicate: impl Fn(&dyn FileSource) -> bool,
) -> Option<&'a dyn FileSource> {
    sources
        .iter()
        .copied()
        .find(|source| predicate(*source))
        .or_else(|| sources.last().copied())
}

/// One file of the bulk JSON format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFile {
    pub name: String,
    pub data: String,
}

/// `{"files": [{"name": ..., "data": ...}], "error": ...}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFiles {
    #[serde(default)]
    pub files: Vec<BulkFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Files exchanged as a single JSON document (`--bulk-in`, `--bulk-out`)
#[derive(Debug, Clone, Default)]
pub struct BulkFilesSource {
    /// JSON text given to `--bulk-in`
    pub input_json: Option<String>,
    pub bulk_out: bool,
}

impl FileSource for BulkFilesSource {
    fn has_input(&self) -> bool {
        self.input_json.is_some()
    }

    fn has_output(&self) -> bool {
        self.bulk_out
    }

    fn input(&self) -> Result<FileSet> {
        let text = self.input_json.as_deref().unwrap_or("{}");
        let bulk: BulkFiles = serde_json::from_str(text).map_err(|e| Error::FileSource {
            message: format!("Failed to parse --bulk-in JSON: {}", e),
        })?;
        let mut files = FileSet::new();
        for file in bulk.files {
            files.add_file_string(&file.name, &file.data)?;
        }
        Ok(files)
    }

    fn output(&self, result: Result<TemplateOutput>, out: &mut dyn Write) -> Result<()> {
        let (bulk, failure) = match result {
            Ok(output) => {
                let files = output
                    .files
                    .into_iter()
                    .map(|file| BulkFile {
                        name: file.path,
                        data: String::from_utf8_lossy(&file.content).into_owned(),
                    })
                    .collect();
                (BulkFiles { files, error: None }, None)
            }
            Err(err) => (
                BulkFiles {
                    files: Vec::new(),
                    error: Some(err.to_string()),
                },
                Some(err),
            ),
        };
        serde_json::to_writer(&mut *out, &bulk)?;
        writeln!(out)?;
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Files and directories on the host (`-f`), output to stdout or a directory
#[derive(Debug, Clone, Default)]
pub struct RegularFilesSource {
    /// Files, directories, or `-` for stdin
    pub paths: Vec<String>,
    /// Directory receiving output files (`--output-files`)
    pub output_dir: Option<PathBuf>,
    /// Format of documents printed to stdout
    pub format: OutputFormat,
}

impl RegularFilesSource {
    fn read_path(&self, path: &str, files: &mut FileSet) -> Result<()> {
        if path == "-" {
            let mut content = Vec::new();
            std::io::stdin().read_to_end(&mut content)?;
            return files.add_file(File::new(STDIN_FILE_NAME, content)?);
        }

        let host_path = Path::new(path);
        if host_path.is_dir() {
            return read_directory(host_path, files);
        }

        let content = std::fs::read(host_path).map_err(|e| Error::FileSource {
            message: format!("Failed to read '{}': {}", path, e),
        })?;
        let name = host_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::FileSource {
                message: format!("Invalid file path '{}'", path),
            })?;
        files.add_file(File::new(name, content)?)
    }
}

/// Add every file under `dir`, named by its path relative to `dir`.
fn read_directory(dir: &Path, files: &mut FileSet) -> Result<()> {
    for entry in walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let file_path = entry.path();
        let relative_path = file_path.strip_prefix(dir).map_err(|_| Error::Path {
            message: format!("Failed to make path relative: {}", file_path.display()),
        })?;
        let logical = relative_path.to_str().ok_or_else(|| Error::Path {
            message: format!("Path is not valid UTF-8: {}", file_path.display()),
        })?;
        let content = std::fs::read(file_path)?;
        debug!("reading {}", file_path.display());
        files.add_file(File::new(logical, content)?)?;
    }
    Ok(())
}

impl FileSource for RegularFilesSource {
    fn has_input(&self) -> bool {
        !self.paths.is_empty()
    }

    fn has_output(&self) -> bool {
        true
    }

    fn input(&self) -> Result<FileSet> {
        let mut files = FileSet::new();
        for path in &self.paths {
            self.read_path(path, &mut files)?;
        }
        Ok(files)
    }

    fn output(&self, result: Result<TemplateOutput>, out: &mut dyn Write) -> Result<()> {
        let output = result?;
        match &self.output_dir {
            Some(dir) => phase6::execute(&output.files, dir),
            None => {
                let rendered = render_documents(&output.doc_set, self.format)?;
                out.write_all(rendered.as_bytes())?;
                Ok(())
            }
        }
    }
}
