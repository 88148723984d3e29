//! Implementation of the phases of a template run.
//!
//! ## Overview
//!
//! A run follows 6 phases:
//! 1. Discovery - Classify input files and build the library tree
//! 2. Values - Layer data values documents and overlays per library
//! 3. Schema - Decide which schema types and defaults the root values
//! 4. Execution - Resolve values and evaluate templates library by library
//! 5. Assembly - Shape the result according to the output mode
//! 6. Writing - Write output files to disk
//!
//! Each phase depends only on the previous phases and the foundation layers
//! (paths, files, documents, merge, schema). The tree built in phase 1 is
//! never modified afterwards.

use std::collections::BTreeMap;

use crate::documents::{DocumentSet, ValuesDocument};
use crate::evaluator::OutputFile;
use crate::filesystem::File;
use crate::path::LibraryPath;

// Phase modules
pub mod assembly;
pub mod discovery;
pub mod execution;
pub mod orchestrator;
pub mod schema;
pub mod values;
pub mod write;

// Numbered aliases, in pipeline order
pub use assembly as phase5;
pub use discovery as phase1;
pub use execution as phase4;
pub use schema as phase3;
pub use values as phase2;
pub use write as phase6;

/// What the pipeline does with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    /// Evaluated by the template evaluator
    Template,
    /// Holds data values documents
    DataValues,
    /// Holds the data values schema document
    Schema,
    /// Loadable by templates, never output on its own
    LibraryModule,
    /// Output verbatim when enabled for output
    Passthrough,
}

/// One data values document of a file
#[derive(Debug, Clone, PartialEq)]
pub struct DataValuesEntry {
    /// Position among the file's documents
    pub index: usize,
    /// Library named by `#@library/ref`, already resolved
    pub target: Option<LibraryPath>,
    pub doc: ValuesDocument,
}

/// A classified file inside a library
#[derive(Debug, Clone)]
pub struct LibraryFile {
    pub file: File,
    /// Path inside the library, without `_lib/<name>/` prefixes
    pub relative_path: String,
    pub role: FileRole,
    /// Data values documents, for `DataValues` files
    pub values: Vec<DataValuesEntry>,
    /// Schema documents, for `Schema` files
    pub schemas: Vec<ValuesDocument>,
}

impl LibraryFile {
    pub fn new(file: File, relative_path: String, role: FileRole) -> Self {
        Self {
            file,
            relative_path,
            role,
            values: Vec::new(),
            schemas: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.file.path
    }
}

/// A node of the library tree
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub path: LibraryPath,
    /// Direct files in declaration order
    pub files: Vec<LibraryFile>,
    /// Child libraries by name
    pub children: BTreeMap<String, Library>,
}

impl Library {
    pub fn new(path: LibraryPath) -> Self {
        Self {
            path,
            files: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    /// Find a descendant (or this library) by absolute path.
    pub fn find(&self, path: &LibraryPath) -> Option<&Library> {
        let depth = self.path.depth();
        if !path.segments().starts_with(self.path.segments()) {
            return None;
        }
        let mut current = self;
        for segment in &path.segments()[depth..] {
            current = current.children.get(segment)?;
        }
        Some(current)
    }

    /// Find or create a descendant by absolute path.
    pub(crate) fn find_or_create(&mut self, path: &LibraryPath) -> &mut Library {
        let depth = self.path.depth();
        let mut current = self;
        for (i, segment) in path.segments().iter().enumerate().skip(depth) {
            current = current
                .children
                .entry(segment.clone())
                .or_insert_with(|| Library::new(path.prefix(i + 1)));
        }
        current
    }

    /// Every library path in the tree, parents before children.
    pub fn library_paths(&self) -> Vec<LibraryPath> {
        let mut paths = vec![self.path.clone()];
        for child in self.children.values() {
            paths.extend(child.library_paths());
        }
        paths
    }

    /// Every file in the tree.
    pub fn all_files(&self) -> Vec<&LibraryFile> {
        let mut files: Vec<&LibraryFile> = self.files.iter().collect();
        for child in self.children.values() {
            files.extend(child.all_files());
        }
        files
    }

    /// Schema documents declared directly in this library.
    pub fn schema_documents(&self) -> Vec<&ValuesDocument> {
        self.files.iter().flat_map(|f| f.schemas.iter()).collect()
    }
}

/// The library being executed and the root of its tree
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub current: &'a Library,
    pub root: &'a Library,
}

/// Documents and files produced by a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateOutput {
    pub doc_set: DocumentSet,
    pub files: Vec<OutputFile>,
}

impl TemplateOutput {
    pub fn append(&mut self, other: TemplateOutput) {
        self.doc_set.append(other.doc_set);
        self.files.extend(other.files);
    }
}
