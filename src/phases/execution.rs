//! Phase 4: Library Execution
//!
//! This phase walks the library tree, resolves every scope's data values and
//! evaluates its templates.
//!
//! ## Process
//!
//! 1.  **Gather (`gather_library_values`)**: Every scope is partitioned and
//!     its outbound library values are collected in tree order (a scope's own
//!     first, then its children by name). Library-scoped flag overlays come
//!     last. Each document is routed to the library it targets.
//!
//! 2.  **Execute (`LibraryExecution::execute`)**: Top-down, for each scope:
//!     - **Resolve**: Layer the scope's own documents and its inbound
//!       overlays onto the initial values: the schema defaults at the root,
//!       the parent's final values in a library. Root values are validated
//!       by the schema.
//!     - **Descend**: Execute children in name order, each seeded with this
//!       scope's final values.
//!     - **Evaluate**: Run every template through the evaluator in
//!       declaration order and emit passthrough files enabled for output.
//!       Templates marked `for-output=false` are evaluated but not emitted.
//!     - **Propagate**: Return this scope's output followed by its children's.
//!
//! Results flow back up as return values; no scope refers to its parent.

use std::collections::BTreeMap;

use log::debug;
use serde_yaml::Value as YamlValue;

use super::{values, ExecutionContext, FileRole, Library, LibraryFile, TemplateOutput};
use crate::config::{FlagOverlays, TemplateOptions};
use crate::documents::{parse_stream, LibraryValues, ValuesDocument};
use crate::error::{Error, Result};
use crate::evaluator::{EvaluationContext, OutputFile, TemplateEvaluator};
use crate::filesystem::FileKind;
use crate::path::LibraryPath;
use crate::schema::Schema;
use crate::suggestions;

/// Library values routed to their receiving library
pub type RoutedValues = BTreeMap<LibraryPath, Vec<ValuesDocument>>;

/// Collect and route every library values document of the tree.
pub fn gather_library_values(
    root: &Library,
    flag_libraries: &[LibraryValues],
) -> Result<RoutedValues> {
    let mut collected = Vec::new();
    collect_outbound(root, &mut collected);
    collected.extend(flag_libraries.iter().cloned());

    let known = root.library_paths();
    let mut routed = RoutedValues::new();
    for library_values in collected {
        if root.find(&library_values.target).is_none() {
            return Err(Error::UnresolvedLibrary {
                reference: library_values.target.to_string(),
                origin: library_values.doc.source.clone(),
                hint: Some(suggestions::unknown_library_hint(
                    &library_values.target,
                    &known,
                )),
            });
        }
        debug!(
            "routing {} from library {} to library {}",
            library_values.doc.source, library_values.origin, library_values.target
        );
        routed
            .entry(library_values.target)
            .or_default()
            .push(library_values.doc);
    }
    Ok(routed)
}

fn collect_outbound(library: &Library, collected: &mut Vec<LibraryValues>) {
    collected.extend(values::partition(library).outbound);
    for child in library.children.values() {
        collect_outbound(child, collected);
    }
}

/// What executing a scope and its descendants produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeResult {
    /// Final values of the scope
    pub values: YamlValue,
    /// Library values declared in the scope and its descendants
    pub outbound: Vec<LibraryValues>,
    pub output: TemplateOutput,
}

/// Executes libraries of one tree against a schema and an evaluator.
pub struct LibraryExecution<'a> {
    root: &'a Library,
    schema: &'a dyn Schema,
    evaluator: &'a dyn TemplateEvaluator,
    options: &'a TemplateOptions,
    root_overlays: &'a [ValuesDocument],
    routed: RoutedValues,
}

impl<'a> LibraryExecution<'a> {
    /// Prepare an execution, routing library values up front.
    pub fn new(
        root: &'a Library,
        schema: &'a dyn Schema,
        evaluator: &'a dyn TemplateEvaluator,
        options: &'a TemplateOptions,
        flags: &'a FlagOverlays,
    ) -> Result<Self> {
        let routed = gather_library_values(root, &flags.libraries)?;
        Ok(Self {
            root,
            schema,
            evaluator,
            options,
            root_overlays: &flags.root,
            routed,
        })
    }

    pub fn root(&self) -> &'a Library {
        self.root
    }

    /// Final values of the root library, without evaluating anything.
    pub fn root_values(&self) -> Result<YamlValue> {
        self.resolve_values(self.root, None)
    }

    /// Execute the whole tree.
    pub fn run(&self) -> Result<TemplateOutput> {
        Ok(self.execute(self.root, None)?.output)
    }

    /// Execute a scope and its descendants.
    pub fn execute(&self, library: &Library, parent_values: Option<&YamlValue>) -> Result<ScopeResult> {
        let values = self.resolve_values(library, parent_values)?;

        let mut outbound = values::partition(library).outbound;
        let mut children_output = TemplateOutput::default();
        for child in library.children.values() {
            let result = self.execute(child, Some(&values))?;
            outbound.extend(result.outbound);
            children_output.append(result.output);
        }

        let mut output = self.evaluate_library(library, &values)?;
        debug!(
            "library {}: {} documents, {} files",
            library.path,
            output.doc_set.len(),
            output.files.len()
        );
        output.append(children_output);

        Ok(ScopeResult {
            values,
            outbound,
            output,
        })
    }

    fn resolve_values(&self, library: &Library, parent_values: Option<&YamlValue>) -> Result<YamlValue> {
        let is_root = library.path.is_root();

        let mut inbound: Vec<ValuesDocument> = Vec::new();
        if is_root {
            inbound.extend(self.root_overlays.iter().cloned());
        }
        if let Some(routed) = self.routed.get(&library.path) {
            inbound.extend(routed.iter().cloned());
        }

        let resolved = match parent_values {
            Some(parent) => {
                values::resolve_inherited(library, parent.clone(), &inbound, self.options)?
            }
            None => {
                let initial = if is_root {
                    self.schema.defaults()
                } else {
                    YamlValue::Null
                };
                values::resolve(library, initial, &inbound, self.options)?
            }
        };
        if is_root {
            return self.schema.validate(resolved.values);
        }
        Ok(resolved.values)
    }

    fn evaluate_library(&self, library: &Library, values: &YamlValue) -> Result<TemplateOutput> {
        let ctx = EvaluationContext {
            execution: ExecutionContext {
                current: library,
                root: self.root,
            },
            values,
            ignore_unknown_comments: self.options.ignore_unknown_comments,
            strict: self.options.strict_yaml,
        };

        let mut output = TemplateOutput::default();
        for file in &library.files {
            match file.role {
                FileRole::Template => {
                    let evaluated = self.evaluator.evaluate(file, &ctx)?;
                    if file.file.marks.for_output != Some(false) {
                        output.doc_set.append(evaluated.documents);
                        output.files.extend(evaluated.files);
                    }
                }
                FileRole::Passthrough if is_for_output(file) => {
                    if file.file.kind() == FileKind::YamlPlain {
                        let text = file.file.content_str()?;
                        for value in parse_stream(text, file.path(), self.options.strict_yaml)? {
                            output.doc_set.push(value, file.path());
                        }
                    }
                    output.files.push(OutputFile {
                        path: file.path().to_string(),
                        content: file.file.content.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(output)
    }
}

/// Plain YAML and plain text are output by default; other data only when
/// marked `for-output`.
fn is_for_output(file: &LibraryFile) -> bool {
    file.file.marks.for_output.unwrap_or(matches!(
        file.file.kind(),
        FileKind::YamlPlain | FileKind::TextPlain
    ))
}
