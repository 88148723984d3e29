//! Template evaluation.
//!
//! The execution engine hands every template file, together with the final
//! values of its library, to a [`TemplateEvaluator`]. Evaluators are
//! external collaborators; the engine only relies on this trait.
//!
//! [`SubstitutionEvaluator`] is the built-in evaluator. It replaces
//! `(@= data.values.<path> @)` placeholders and nothing else.

use regex::{Captures, Regex};
use serde_yaml::Value as YamlValue;

use crate::documents::{parse_document, split_documents, DocumentSet};
use crate::error::{Error, Result};
use crate::filesystem::FileKind;
use crate::merge::{parse_path, yaml::lookup_yaml_value};
use crate::output::render_yaml_documents;
use crate::phases::{ExecutionContext, LibraryFile};

/// A file produced by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Logical path of the file it was produced from
    pub path: String,
    pub content: Vec<u8>,
}

/// What evaluating one template produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationOutput {
    pub documents: DocumentSet,
    pub files: Vec<OutputFile>,
}

/// Everything a template can see while it is evaluated
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub execution: ExecutionContext<'a>,
    /// Final data values of the current library
    pub values: &'a YamlValue,
    pub ignore_unknown_comments: bool,
    pub strict: bool,
}

pub trait TemplateEvaluator {
    fn evaluate(&self, file: &LibraryFile, ctx: &EvaluationContext<'_>) -> Result<EvaluationOutput>;
}

const PLACEHOLDER_PATTERN: &str = r"\(@=\s*(.*?)\s*@\)";

/// Replaces `(@= data.values.a.b @)` with the value at `a.b`.
///
/// Scalars are inserted as plain text, collections as JSON flow text.
/// YAML templates are parsed after substitution and contribute documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstitutionEvaluator;

impl SubstitutionEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn substitute(&self, text: &str, values: &YamlValue) -> std::result::Result<String, String> {
        let placeholder = Regex::new(PLACEHOLDER_PATTERN).map_err(|e| e.to_string())?;
        let mut failure: Option<String> = None;
        let rendered = placeholder.replace_all(text, |caps: &Captures| {
            if failure.is_some() {
                return String::new();
            }
            match render_expression(&caps[1], values) {
                Ok(text) => text,
                Err(message) => {
                    failure = Some(message);
                    String::new()
                }
            }
        });
        match failure {
            Some(message) => Err(message),
            None => Ok(rendered.into_owned()),
        }
    }
}

fn render_expression(expression: &str, values: &YamlValue) -> std::result::Result<String, String> {
    let path = match expression.strip_prefix("data.values") {
        Some("") => "",
        Some(rest) if rest.starts_with('.') || rest.starts_with('[') => rest,
        _ => return Err(format!("unsupported expression '{}'", expression)),
    };
    let value = lookup_yaml_value(values, &parse_path(path))
        .ok_or_else(|| format!("'{}' is not defined", expression))?;
    match value {
        YamlValue::Null => Ok("null".to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::String(s) => Ok(s.clone()),
        other => serde_json::to_string(other)
            .map_err(|e| format!("cannot render '{}': {}", expression, e)),
    }
}

impl TemplateEvaluator for SubstitutionEvaluator {
    fn evaluate(&self, file: &LibraryFile, ctx: &EvaluationContext<'_>) -> Result<EvaluationOutput> {
        let evaluation_error = |message: String| Error::Evaluation {
            file: file.path().to_string(),
            library: ctx.execution.current.path.to_string(),
            message,
        };

        let text = file.file.content_str()?;
        let rendered = self
            .substitute(text, ctx.values)
            .map_err(&evaluation_error)?;

        let mut output = EvaluationOutput::default();
        if file.file.kind() == FileKind::YamlTemplate {
            let documents = split_documents(file.path(), &rendered, ctx.ignore_unknown_comments)
                .map_err(|e| evaluation_error(e.to_string()))?;
            for raw in &documents {
                let value = parse_document(&raw.body, file.path(), raw.index, ctx.strict)
                    .map_err(|e| evaluation_error(e.to_string()))?;
                output.documents.push(value, file.path());
            }
            let content = render_yaml_documents(output.documents.values())?;
            output.files.push(OutputFile {
                path: file.path().to_string(),
                content: content.into_bytes(),
            });
        } else {
            output.files.push(OutputFile {
                path: file.path().to_string(),
                content: rendered.into_bytes(),
            });
        }
        Ok(output)
    }
}
