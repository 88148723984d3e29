//! Annotated YAML documents.
//!
//! A YAML file is a stream of documents separated by `---`. Lines of the form
//! `#@name args` directly above a document (before its first content line,
//! or before the separator that opens it) are the document's annotations.
//! They decide whether a document is a template, a data values overlay or a
//! schema.
//!
//! ## Comment policy
//!
//! `#@` lines are annotations and `#!` lines are comments. Any other full-line
//! `#` comment is rejected unless unknown comments are ignored.

use regex::Regex;
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::path::LibraryPath;

/// A `#@name args` annotation line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub args: String,
}

impl Annotation {
    /// Split the argument list on top-level commas, keeping quoted commas.
    fn items(&self) -> Vec<&str> {
        let mut items = Vec::new();
        let mut quote: Option<char> = None;
        let mut start = 0;
        for (i, ch) in self.args.char_indices() {
            match (quote, ch) {
                (Some(q), c) if c == q => quote = None,
                (None, '"') | (None, '\'') => quote = Some(ch),
                (None, ',') => {
                    items.push(self.args[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            }
        }
        items.push(self.args[start..].trim());
        items.into_iter().filter(|s| !s.is_empty()).collect()
    }

    /// First positional argument with surrounding quotes removed.
    pub fn positional(&self) -> Option<String> {
        self.items()
            .into_iter()
            .find(|item| !is_kwarg(item))
            .map(unquote)
    }

    /// Value of a `key=value` argument with surrounding quotes removed.
    pub fn kwarg(&self, key: &str) -> Option<String> {
        self.items().into_iter().find_map(|item| {
            let (k, v) = item.split_once('=')?;
            (k.trim() == key).then(|| unquote(v.trim()))
        })
    }

    /// Whether `key=True` is present.
    pub fn flag(&self, key: &str) -> bool {
        self.kwarg(key).as_deref() == Some("True")
    }
}

fn is_kwarg(item: &str) -> bool {
    match item.split_once('=') {
        Some((key, _)) => !key.contains(['"', '\'']),
        None => false,
    }
}

fn unquote(text: &str) -> String {
    let text = text.trim();
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].to_string();
        }
    }
    text.to_string()
}

/// One document of a file, before interpretation.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub annotations: Vec<Annotation>,
    /// Document text without its separator line
    pub body: String,
    /// Position among the file's documents
    pub index: usize,
    /// 1-based line where the document starts
    pub line: usize,
}

impl RawDocument {
    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }

    /// Parse the body as a single YAML value; an empty body is null.
    pub fn parse(&self, file: &str, strict: bool) -> Result<YamlValue> {
        parse_document(&self.body, file, self.index, strict)
    }
}

const ANNOTATION_PATTERN: &str =
    r"^#@([A-Za-z_][A-Za-z0-9_\-]*(?:/[A-Za-z0-9_\-]+)*)(?:\s+(.*))?$";

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed == "---" || trimmed.starts_with("--- #")
}

/// Split a YAML file into annotated documents.
///
/// Blank documents without annotations are dropped; an annotated empty
/// document is kept and parses as null.
pub fn split_documents(
    file: &str,
    content: &str,
    ignore_unknown_comments: bool,
) -> Result<Vec<RawDocument>> {
    let annotation_re = Regex::new(ANNOTATION_PATTERN)?;
    let mut documents = Vec::new();
    let mut annotations: Vec<Annotation> = Vec::new();
    let mut trailing: Vec<(Annotation, &str)> = Vec::new();
    let mut body: Vec<&str> = Vec::new();
    let mut has_content = false;
    let mut start_line = 1;

    for (number, line) in content.lines().enumerate() {
        let number = number + 1;
        let trimmed = line.trim_start();

        if is_separator(line) {
            if has_content {
                finish_document(&mut documents, std::mem::take(&mut annotations), &body, start_line);
                annotations = trailing.drain(..).map(|(a, _)| a).collect();
            }
            // Annotations above an empty leading section belong to the next document.
            body.clear();
            has_content = false;
            start_line = number + 1;
            continue;
        }

        if let Some(captures) = annotation_re.captures(trimmed) {
            let annotation = Annotation {
                name: captures[1].to_string(),
                args: captures
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            };
            if has_content {
                trailing.push((annotation, line));
            } else {
                annotations.push(annotation);
            }
            continue;
        }

        if trimmed.starts_with('#') && !trimmed.starts_with("#@") && !trimmed.starts_with("#!") {
            if !ignore_unknown_comments {
                return Err(Error::Annotation {
                    file: file.to_string(),
                    line: number,
                    message: "Unrecognized comment type (expected '#@' or '#!')".to_string(),
                });
            }
            continue;
        }

        if !trimmed.is_empty() && !trimmed.starts_with('#') {
            // Annotations between content lines annotate nodes, not the document.
            body.extend(trailing.drain(..).map(|(_, raw)| raw));
            has_content = true;
        }
        body.push(line);
    }

    body.extend(trailing.drain(..).map(|(_, raw)| raw));
    finish_document(&mut documents, annotations, &body, start_line);
    Ok(documents)
}

fn finish_document(
    documents: &mut Vec<RawDocument>,
    annotations: Vec<Annotation>,
    body: &[&str],
    line: usize,
) {
    let text = body.join("\n");
    if text.trim().is_empty() && annotations.is_empty() {
        return;
    }
    documents.push(RawDocument {
        annotations,
        body: text,
        index: documents.len(),
        line,
    });
}

/// Parse one YAML document, rejecting tags in strict mode.
pub fn parse_document(text: &str, file: &str, index: usize, strict: bool) -> Result<YamlValue> {
    if text.trim().is_empty() {
        return Ok(YamlValue::Null);
    }
    let value: YamlValue = serde_yaml::from_str(text).map_err(|err| Error::Document {
        file: file.to_string(),
        index,
        message: err.to_string(),
    })?;
    if strict {
        if let Some(tag) = find_tag(&value) {
            return Err(Error::Document {
                file: file.to_string(),
                index,
                message: format!("YAML tag '{}' is not allowed in strict mode", tag),
            });
        }
    }
    Ok(value)
}

/// Parse every document of a plain YAML stream.
pub fn parse_stream(text: &str, file: &str, strict: bool) -> Result<Vec<YamlValue>> {
    let documents = split_documents(file, text, true)?;
    documents
        .iter()
        .map(|doc| doc.parse(file, strict))
        .collect()
}

fn find_tag(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::Tagged(tagged) => Some(tagged.tag.to_string()),
        YamlValue::Sequence(items) => items.iter().find_map(find_tag),
        YamlValue::Mapping(map) => map
            .iter()
            .find_map(|(k, v)| find_tag(k).or_else(|| find_tag(v))),
        _ => None,
    }
}

/// A data values overlay with provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesDocument {
    pub value: YamlValue,
    /// File path and document index, or the flag that produced it
    pub source: String,
    /// Whether this layer may introduce keys absent from earlier layers
    pub allow_new_keys: bool,
}

impl ValuesDocument {
    pub fn new(value: YamlValue, source: impl Into<String>) -> Self {
        Self {
            value,
            source: source.into(),
            allow_new_keys: false,
        }
    }
}

/// A values document aimed at a library other than the one declaring it.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryValues {
    /// Absolute path of the receiving library
    pub target: LibraryPath,
    /// Library that declared the overlay
    pub origin: LibraryPath,
    pub doc: ValuesDocument,
}

/// A rendered output document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub value: YamlValue,
    /// File the document was produced from
    pub source: String,
}

/// Ordered collection of output documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSet {
    pub items: Vec<Document>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(value: YamlValue, source: impl Into<String>) -> Self {
        Self {
            items: vec![Document {
                value,
                source: source.into(),
            }],
        }
    }

    pub fn push(&mut self, value: YamlValue, source: impl Into<String>) {
        self.items.push(Document {
            value,
            source: source.into(),
        });
    }

    pub fn append(&mut self, other: DocumentSet) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &YamlValue> {
        self.items.iter().map(|d| &d.value)
    }
}
