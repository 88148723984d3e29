//! Phase 1: Discovery
//!
//! This is the first phase of the template pipeline. It classifies every
//! input file and arranges the files into the library tree. Nothing is
//! evaluated here, and the tree is not modified by later phases.
//!
//! ## Process
//!
//! 1.  **Input checks (`place`)**: Duplicate logical paths are rejected and
//!     files marked `exclude` are dropped.
//!
//! 2.  **Library membership (`place`)**: A file belongs to the library
//!     named by its `_lib/<name>/` path segments (`_lib/a/_lib/b/x.yml` is
//!     in `a/b`), unless a `library=` file mark assigns it explicitly. An
//!     explicit library's parent must already be known, either from file
//!     paths or from a shallower explicit declaration.
//!
//!     Placement never reads file contents, so a files inspection can stop
//!     here.
//!
//! 3.  **Classification (`classify_all`)**: Each file gets a role from its
//!     kind and, for YAML templates, from its document annotations. Data values
//!     documents may target another library with `#@library/ref`, which is
//!     resolved against the finished tree.
//!
//! 4.  **Scope checks**: A library holds at most one schema document.

use std::borrow::Cow;
use std::collections::HashSet;

use log::debug;
use ptree::TreeItem;

use super::{DataValuesEntry, FileRole, Library, LibraryFile};
use crate::config::TemplateOptions;
use crate::defaults::annotations;
use crate::documents::{split_documents, RawDocument, ValuesDocument};
use crate::error::{Error, Result};
use crate::filesystem::{File, FileKind, FileSet};
use crate::path::{implicit_library, LibraryPath, LibraryRef};
use crate::suggestions;

/// Files assigned to their libraries, before any content is read
#[derive(Debug, Clone)]
pub struct Placement {
    /// The library tree, without files
    pub root: Library,
    /// Files in input order
    pub files: Vec<PlacedFile>,
}

#[derive(Debug, Clone)]
pub struct PlacedFile {
    pub library: LibraryPath,
    /// Path inside the library, without `_lib/<name>/` prefixes
    pub relative_path: String,
    pub file: File,
}

impl Placement {
    /// Logical paths of every placed file, in input order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|placed| placed.file.path.as_str())
    }
}

/// Executes Phase 1 of the pipeline on placed files.
pub fn execute(placement: Placement, options: &TemplateOptions) -> Result<Library> {
    let root = classify_all(placement, options)?;
    if log::log_enabled!(log::Level::Debug) {
        debug!("library tree:\n{}", render_tree(&root)?);
    }
    Ok(root)
}

/// Build the library tree from input files.
pub fn build(files: FileSet, options: &TemplateOptions) -> Result<Library> {
    classify_all(place(files)?, options)
}

/// Assign every file to its library. File contents are not read.
pub fn place(files: FileSet) -> Result<Placement> {
    let mut seen = HashSet::new();
    for file in files.files() {
        if !seen.insert(file.path.clone()) {
            return Err(Error::DuplicateFile {
                path: file.path.clone(),
            });
        }
    }

    let mut placed: Vec<PlacedFile> = Vec::new();
    let mut explicit: Vec<(LibraryPath, String)> = Vec::new();
    for file in files.into_files() {
        if file.marks.exclude {
            continue;
        }
        let (implicit, relative_path) = implicit_library(&file.path)?;
        let library = match &file.marks.library {
            Some(declared) => {
                let declared = LibraryPath::parse(declared)?;
                explicit.push((declared.clone(), file.path.clone()));
                declared
            }
            None => implicit,
        };
        placed.push(PlacedFile {
            library,
            relative_path,
            file,
        });
    }

    // Libraries implied by file paths exist first; explicit declarations are
    // then accepted shallowest first.
    let mut root = Library::new(LibraryPath::root());
    for placed_file in &placed {
        if placed_file.file.marks.library.is_none() {
            root.find_or_create(&placed_file.library);
        }
    }
    explicit.sort_by_key(|(path, _)| path.depth());
    for (path, origin) in &explicit {
        if let Some(parent) = path.parent() {
            if root.find(&parent).is_none() {
                return Err(Error::UnresolvedLibrary {
                    reference: path.to_string(),
                    origin: origin.clone(),
                    hint: Some(format!(
                        "Parent library '{}' is not declared. {}",
                        parent,
                        suggestions::unknown_library_hint(&parent, &root.library_paths())
                    )),
                });
            }
        }
        root.find_or_create(path);
    }

    Ok(Placement {
        root,
        files: placed,
    })
}

/// Classify placed files and attach them to their libraries.
pub fn classify_all(placement: Placement, options: &TemplateOptions) -> Result<Library> {
    let Placement { mut root, files } = placement;

    let mut classified = Vec::with_capacity(files.len());
    for placed in files {
        let library_file = classify(
            placed.file,
            placed.relative_path,
            &placed.library,
            &root,
            options,
        )?;
        classified.push((placed.library, library_file));
    }
    for (library, library_file) in classified {
        root.find_or_create(&library).files.push(library_file);
    }

    check_schema_counts(&root)?;
    Ok(root)
}

/// Assign a role to a file and extract its values or schema documents.
fn classify(
    file: File,
    relative_path: String,
    library: &LibraryPath,
    root: &Library,
    options: &TemplateOptions,
) -> Result<LibraryFile> {
    let kind = file.kind();
    let role = match kind {
        FileKind::Starlark => FileRole::LibraryModule,
        FileKind::YamlPlain | FileKind::TextPlain | FileKind::Data => FileRole::Passthrough,
        FileKind::TextTemplate => FileRole::Template,
        FileKind::DataValues => FileRole::DataValues,
        FileKind::Schema => FileRole::Schema,
        FileKind::YamlTemplate => FileRole::Template,
    };
    if !matches!(
        kind,
        FileKind::YamlTemplate | FileKind::DataValues | FileKind::Schema
    ) {
        return Ok(LibraryFile::new(file, relative_path, role));
    }

    let documents = split_documents(
        &file.path,
        file.content_str()?,
        options.ignore_unknown_comments,
    )?;

    let role = match kind {
        FileKind::YamlTemplate => role_from_annotations(&file.path, &documents)?,
        _ => role,
    };
    let mut library_file = LibraryFile::new(file, relative_path, role);
    let path = library_file.file.path.clone();

    match role {
        FileRole::DataValues => {
            for raw in &documents {
                let entry = values_entry(&path, raw, library, root, options.strict_yaml)?;
                library_file.values.push(entry);
            }
        }
        FileRole::Schema => {
            for raw in &documents {
                let value = raw.parse(&path, options.strict_yaml)?;
                library_file
                    .schemas
                    .push(ValuesDocument::new(value, document_source(&path, raw)));
            }
        }
        _ => {}
    }
    Ok(library_file)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentRole {
    Template,
    Values,
    Schema,
}

fn document_role(raw: &RawDocument) -> DocumentRole {
    if raw.has_annotation(annotations::DATA_VALUES) {
        DocumentRole::Values
    } else if raw.has_annotation(annotations::DATA_VALUES_SCHEMA)
        || raw
            .annotation(annotations::SCHEMA_MATCH)
            .is_some_and(|a| a.flag("data_values"))
    {
        DocumentRole::Schema
    } else {
        DocumentRole::Template
    }
}

/// A YAML template file is a values or schema file when all of its
/// documents say so; mixing document roles is an error.
fn role_from_annotations(path: &str, documents: &[RawDocument]) -> Result<FileRole> {
    let roles: Vec<DocumentRole> = documents.iter().map(document_role).collect();
    let first = match roles.first() {
        Some(role) => *role,
        None => return Ok(FileRole::Template),
    };
    if let Some(index) = roles.iter().position(|role| *role != first) {
        return Err(Error::LibraryTree {
            message: format!(
                "File '{}' mixes {} documents with {} documents (document {})",
                path,
                describe(first),
                describe(roles[index]),
                index
            ),
            hint: Some(
                "Keep data values, schema and template documents in separate files".to_string(),
            ),
        });
    }
    Ok(match first {
        DocumentRole::Template => FileRole::Template,
        DocumentRole::Values => FileRole::DataValues,
        DocumentRole::Schema => FileRole::Schema,
    })
}

fn describe(role: DocumentRole) -> &'static str {
    match role {
        DocumentRole::Template => "template",
        DocumentRole::Values => "data values",
        DocumentRole::Schema => "schema",
    }
}

fn document_source(path: &str, raw: &RawDocument) -> String {
    format!("{} doc {}", path, raw.index)
}

fn values_entry(
    path: &str,
    raw: &RawDocument,
    library: &LibraryPath,
    root: &Library,
    strict: bool,
) -> Result<DataValuesEntry> {
    let value = raw.parse(path, strict)?;
    let mut doc = ValuesDocument::new(value, document_source(path, raw));
    doc.allow_new_keys = raw
        .annotation(annotations::OVERLAY_MATCH)
        .is_some_and(|a| a.flag("missing_ok"));

    let target = match raw.annotation(annotations::LIBRARY_REF) {
        Some(annotation) => {
            let text = annotation.positional().unwrap_or_default();
            let unresolved = |hint: String| Error::UnresolvedLibrary {
                reference: text.clone(),
                origin: doc.source.clone(),
                hint: Some(hint),
            };
            let reference = LibraryRef::parse(&text).map_err(|e| match e {
                Error::UnresolvedLibrary { hint, .. } => unresolved(hint.unwrap_or_default()),
                other => other,
            })?;
            let target = reference.resolve(library)?;
            if root.find(&target).is_none() {
                return Err(unresolved(suggestions::unknown_library_hint(
                    &target,
                    &root.library_paths(),
                )));
            }
            Some(target).filter(|t| t != library)
        }
        None => None,
    };

    Ok(DataValuesEntry {
        index: raw.index,
        target,
        doc,
    })
}

fn check_schema_counts(library: &Library) -> Result<()> {
    let schemas = library.schema_documents();
    if schemas.len() > 1 {
        return Err(Error::MultipleSchemas {
            library: library.path.to_string(),
            count: schemas.len(),
            files: schemas
                .iter()
                .map(|doc| doc.source.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }
    for child in library.children.values() {
        check_schema_counts(child)?;
    }
    Ok(())
}

/// Tree node structure for ptree rendering
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn from_library(library: &Library) -> Self {
        let label = match library.path.name() {
            Some(name) => format!("@{}", name),
            None => library.path.to_string(),
        };
        let mut children: Vec<TreeNode> = library
            .files
            .iter()
            .map(|f| TreeNode {
                label: format!("{} ({:?})", f.relative_path, f.role),
                children: Vec::new(),
            })
            .collect();
        children.extend(library.children.values().map(TreeNode::from_library));
        TreeNode { label, children }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}

/// Render the library tree with its files, for debug output.
pub fn render_tree(root: &Library) -> Result<String> {
    let mut out = Vec::new();
    ptree::write_tree(&TreeNode::from_library(root), &mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
