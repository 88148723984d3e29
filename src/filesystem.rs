//! In-memory file set holding the pipeline's input files

use std::fmt;
use std::str::FromStr;

use glob::Pattern;

use crate::error::{Error, Result};
use crate::path::normalize_logical_path;

/// How a file is treated by the classifier.
///
/// Derived from the file extension unless a `type=` file mark overrides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// YAML evaluated by the template evaluator
    YamlTemplate,
    /// YAML output as-is
    YamlPlain,
    /// Text evaluated by the template evaluator
    TextTemplate,
    /// Text output as-is
    TextPlain,
    /// Module loadable by templates, never output
    Starlark,
    /// Opaque data, only output when marked `for-output`
    Data,
    /// Every document is a data values document
    DataValues,
    /// Every document is a schema document
    Schema,
}

impl FileKind {
    /// Guess the kind from a logical path's extension.
    pub fn from_path(path: &str) -> Self {
        let extension = path
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("yml") | Some("yaml") => FileKind::YamlTemplate,
            Some("txt") => FileKind::TextTemplate,
            Some("star") => FileKind::Starlark,
            _ => FileKind::Data,
        }
    }
}

impl FromStr for FileKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "yaml-template" => Ok(FileKind::YamlTemplate),
            "yaml-plain" => Ok(FileKind::YamlPlain),
            "text-template" => Ok(FileKind::TextTemplate),
            "text-plain" => Ok(FileKind::TextPlain),
            "starlark" => Ok(FileKind::Starlark),
            "data" => Ok(FileKind::Data),
            "data-values" => Ok(FileKind::DataValues),
            "schema" => Ok(FileKind::Schema),
            other => Err(Error::FileMark {
                mark: format!("type={}", other),
                message: "unknown file type (expected yaml-template, yaml-plain, text-template, text-plain, starlark, data, data-values or schema)".to_string(),
            }),
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::YamlTemplate => "yaml-template",
            FileKind::YamlPlain => "yaml-plain",
            FileKind::TextTemplate => "text-template",
            FileKind::TextPlain => "text-plain",
            FileKind::Starlark => "starlark",
            FileKind::Data => "data",
            FileKind::DataValues => "data-values",
            FileKind::Schema => "schema",
        };
        write!(f, "{}", name)
    }
}

/// Annotations attached to a file from outside its content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMarks {
    /// Drop the file before the library tree is built
    pub exclude: bool,
    /// Override the extension-derived kind
    pub kind: Option<FileKind>,
    /// Explicit root-anchored library assignment (`""` or `/` for the root)
    pub library: Option<String>,
    /// Override whether the file is part of the output
    pub for_output: Option<bool>,
}

/// Represents an input file with content and marks
#[derive(Debug, Clone)]
pub struct File {
    /// Logical `/`-separated path relative to its source
    pub path: String,
    /// File content as bytes
    pub content: Vec<u8>,
    /// Marks applied by flags
    pub marks: FileMarks,
    /// Position in the input, used as the declaration order
    pub order: usize,
}

impl File {
    /// Create a new file with content
    pub fn new(path: &str, content: Vec<u8>) -> Result<Self> {
        Ok(Self {
            path: normalize_logical_path(path)?,
            content,
            marks: FileMarks::default(),
            order: 0,
        })
    }

    /// Create a new file from string content
    pub fn from_string(path: &str, content: &str) -> Result<Self> {
        Self::new(path, content.as_bytes().to_vec())
    }

    /// The effective kind, honoring a `type=` mark.
    pub fn kind(&self) -> FileKind {
        self.marks.kind.unwrap_or_else(|| FileKind::from_path(&self.path))
    }

    /// Content decoded as UTF-8.
    pub fn content_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.content).map_err(|_| Error::Filesystem {
            message: format!("File content of '{}' is not valid UTF-8", self.path),
        })
    }
}

/// Ordered set of input files; insertion order is the declaration order.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: Vec<File>,
}

impl FileSet {
    /// Create a new empty file set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, assigning it the next declaration index
    pub fn add_file(&mut self, mut file: File) -> Result<()> {
        if self.exists(&file.path) {
            return Err(Error::DuplicateFile { path: file.path });
        }
        file.order = self.files.len();
        self.files.push(file);
        Ok(())
    }

    /// Add a file with string content
    pub fn add_file_string(&mut self, path: &str, content: &str) -> Result<()> {
        self.add_file(File::from_string(path, content)?)
    }

    /// Get a file by logical path
    pub fn get_file(&self, path: &str) -> Option<&File> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Check if a file exists
    pub fn exists(&self, path: &str) -> bool {
        self.get_file(path).is_some()
    }

    /// List files matching a glob pattern
    pub fn list_files_glob(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = Pattern::new(pattern).map_err(Error::Glob)?;
        Ok(self
            .files
            .iter()
            .filter(|f| pattern.matches(&f.path))
            .map(|f| f.path.clone())
            .collect())
    }

    /// Mutable access to files matching a glob pattern
    pub fn files_matching_mut(&mut self, pattern: &str) -> Result<Vec<&mut File>> {
        let pattern = Pattern::new(pattern).map_err(Error::Glob)?;
        Ok(self
            .files
            .iter_mut()
            .filter(|f| pattern.matches(&f.path))
            .collect())
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over files in declaration order
    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.files.iter()
    }

    pub fn into_files(self) -> Vec<File> {
        self.files
    }
}

impl FromIterator<File> for FileSet {
    /// Collect files without duplicate checks; the tree builder reports them.
    fn from_iter<T: IntoIterator<Item = File>>(iter: T) -> Self {
        let mut set = FileSet::new();
        for (order, mut file) in iter.into_iter().enumerate() {
            file.order = order;
            set.files.push(file);
        }
        set
    }
}
