//! # Pipeline Configuration
//!
//! This module defines the options the template pipeline runs with, as
//! well as the parsing of the two flag families that carry structured
//! values: file marks and data value flags.
//!
//! ## Key Components
//!
//! - **`TemplateOptions`**: everything one run needs besides its input files.
//!   The CLI builds it from clap arguments; tests build it directly.
//!
//! - **`FileMark`**: a `glob:key=value` flag that changes how matching files
//!   are classified (`exclude`, `type`, `library`, `for-output`).
//!
//! - **`DataValuesFlags`**: the data value flags, turned into overlays by
//!   [`DataValuesFlags::as_overlays`].
//!
//! ## Data Value Flags
//!
//! Key/value flags take the form `[@lib:]key.path[+]=value`. A library
//! prefix sends the overlay to that library instead of the root. A `+` after
//! the key allows the key to be new. Overlays are produced in this order,
//! each family in the order its flags were given:
//!
//! 1. `--data-values-file`
//! 2. `--data-values-env` (string values)
//! 3. `--data-values-env-yaml` (YAML values)
//! 4. `--data-value` / `-v` (string values)
//! 5. `--data-value-yaml` (YAML values)
//! 6. `--data-value-file` (file contents as string values)

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;

use crate::defaults::ENV_KEY_SEPARATOR;
use crate::documents::{parse_document, parse_stream, LibraryValues, ValuesDocument};
use crate::error::{Error, Result};
use crate::filesystem::{FileKind, FileMarks, FileSet};
use crate::merge::{parse_path, yaml::value_at_path};
use crate::path::{LibraryPath, LibraryRef};

/// What a run produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Documents and files from every library
    #[default]
    Normal,
    /// Only the root library's resolved values
    ValuesInspect,
    /// Only the list of input files
    FilesInspect,
}

/// Options for one pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateOptions {
    /// Accept full-line `#` comments that are neither `#@` nor `#!`
    #[serde(default)]
    pub ignore_unknown_comments: bool,
    /// Let every overlay add keys absent from earlier layers
    #[serde(default)]
    pub implicit_map_key_overrides: bool,
    /// Reject YAML tags and type-changing overlays
    #[serde(default)]
    pub strict_yaml: bool,
    /// Log timing and the library tree
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub mode: OutputMode,
    /// Use the root schema document to type and default data values
    #[serde(default)]
    pub schema_enabled: bool,
    #[serde(default)]
    pub file_marks: Vec<FileMark>,
    #[serde(default)]
    pub data_values: DataValuesFlags,
}

/// A `glob:key=value` file mark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMark {
    /// Glob matched against logical file paths
    pub pattern: String,
    pub key: String,
    pub value: String,
}

impl FileMark {
    /// Parse and validate a mark such as `config/*.yml:type=yaml-plain`.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |message: &str| Error::FileMark {
            mark: text.to_string(),
            message: message.to_string(),
        };
        let (pattern, assignment) = text
            .split_once(':')
            .ok_or_else(|| invalid("expected format 'path:key=value'"))?;
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| invalid("expected format 'path:key=value'"))?;
        if pattern.is_empty() {
            return Err(invalid("path pattern must not be empty"));
        }
        glob::Pattern::new(pattern).map_err(|e| invalid(&e.to_string()))?;

        let mark = Self {
            pattern: pattern.to_string(),
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        };
        match mark.key.as_str() {
            "exclude" | "for-output" => {
                parse_bool(&mark.value).ok_or_else(|| invalid("value must be 'true' or 'false'"))?;
            }
            "type" => {
                mark.value.parse::<FileKind>()?;
            }
            "library" => {
                LibraryPath::parse(&mark.value)?;
            }
            _ => {
                return Err(invalid(
                    "unknown key (expected exclude, type, library or for-output)",
                ))
            }
        }
        Ok(mark)
    }

    fn apply(&self, marks: &mut FileMarks) -> Result<()> {
        match self.key.as_str() {
            "exclude" => marks.exclude = parse_bool(&self.value).unwrap_or(false),
            "for-output" => marks.for_output = parse_bool(&self.value),
            "type" => marks.kind = Some(self.value.parse()?),
            "library" => marks.library = Some(self.value.clone()),
            _ => {}
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Apply file marks to every matching file, later marks winning.
pub fn apply_file_marks(files: &mut FileSet, marks: &[FileMark]) -> Result<()> {
    for mark in marks {
        for file in files.files_matching_mut(&mark.pattern)? {
            mark.apply(&mut file.marks)?;
        }
    }
    Ok(())
}

/// Data value flags, kept in the order they were given
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataValuesFlags {
    /// `--data-values-file [@lib:]PATH`
    #[serde(default)]
    pub files: Vec<String>,
    /// `--data-values-env PREFIX`
    #[serde(default)]
    pub env_prefixes: Vec<String>,
    /// `--data-values-env-yaml PREFIX`
    #[serde(default)]
    pub env_yaml_prefixes: Vec<String>,
    /// `--data-value [@lib:]key=value`
    #[serde(default)]
    pub kv_strings: Vec<String>,
    /// `--data-value-yaml [@lib:]key=yaml`
    #[serde(default)]
    pub kv_yamls: Vec<String>,
    /// `--data-value-file [@lib:]key=path`
    #[serde(default)]
    pub kv_files: Vec<String>,
}

/// Overlays produced from data value flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagOverlays {
    /// Overlays for the root library
    pub root: Vec<ValuesDocument>,
    /// Overlays addressed to other libraries
    pub libraries: Vec<LibraryValues>,
}

impl FlagOverlays {
    fn push(&mut self, library: Option<LibraryPath>, doc: ValuesDocument) {
        match library {
            Some(target) if !target.is_root() => self.libraries.push(LibraryValues {
                target,
                origin: LibraryPath::root(),
                doc,
            }),
            _ => self.root.push(doc),
        }
    }
}

/// A parsed `[@lib:]key[+]=value` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyValueFlag {
    library: Option<LibraryPath>,
    key: String,
    allow_new_keys: bool,
    value: String,
}

impl KeyValueFlag {
    fn parse(flag_name: &str, text: &str) -> Result<Self> {
        let invalid = |message: &str| Error::DataValueFlag {
            flag: format!("{} '{}'", flag_name, text),
            message: message.to_string(),
        };
        let (library, rest) = split_library_prefix(text, true)
            .map_err(|e| invalid(&e.to_string()))?;
        let (key, value) = rest
            .split_once('=')
            .ok_or_else(|| invalid("expected format '[@lib:]key=value'"))?;
        let (key, allow_new_keys) = match key.strip_suffix('+') {
            Some(key) => (key, true),
            None => (key, false),
        };
        if key.trim().is_empty() {
            return Err(invalid("key must not be empty"));
        }
        Ok(Self {
            library,
            key: key.trim().to_string(),
            allow_new_keys,
            value: value.to_string(),
        })
    }

    fn into_document(self, value: YamlValue, source: String) -> Result<(Option<LibraryPath>, ValuesDocument)> {
        let tree = value_at_path(&parse_path(&self.key), value)?;
        let mut doc = ValuesDocument::new(tree, source);
        doc.allow_new_keys = self.allow_new_keys;
        Ok((self.library, doc))
    }
}

/// Split an optional `@lib:` prefix from a flag value. Key/value flags also
/// accept a root-anchored `/lib:` prefix.
fn split_library_prefix(text: &str, allow_absolute: bool) -> Result<(Option<LibraryPath>, &str)> {
    let scoped = text.starts_with('@') || (allow_absolute && text.starts_with('/'));
    if !scoped {
        return Ok((None, text));
    }
    match text.split_once(':') {
        Some((reference, rest)) => {
            let library = LibraryRef::parse(reference)?.resolve(&LibraryPath::root())?;
            Ok((Some(library), rest))
        }
        None => Err(Error::DataValueFlag {
            flag: text.to_string(),
            message: "library-scoped values take the form '@lib:...'".to_string(),
        }),
    }
}

impl DataValuesFlags {
    /// Whether no data value flag was given.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
            && self.env_prefixes.is_empty()
            && self.env_yaml_prefixes.is_empty()
            && self.kv_strings.is_empty()
            && self.kv_yamls.is_empty()
            && self.kv_files.is_empty()
    }

    /// Turn the flags into overlays, reading the process environment and
    /// the local filesystem.
    pub fn as_overlays(&self, strict: bool) -> Result<FlagOverlays> {
        let env: Vec<(String, String)> = std::env::vars().collect();
        self.as_overlays_from(strict, &env, &|path: &str| -> Result<String> {
            Ok(std::fs::read_to_string(path)?)
        })
    }

    /// Turn the flags into overlays using the given environment and file reader.
    pub fn as_overlays_from(
        &self,
        strict: bool,
        env: &[(String, String)],
        read_file: &dyn Fn(&str) -> Result<String>,
    ) -> Result<FlagOverlays> {
        let mut overlays = FlagOverlays::default();

        for spec in &self.files {
            let (library, path) = split_library_prefix(spec, false)?;
            let source = format!("--data-values-file '{}'", spec);
            let content = read_file(path).map_err(|e| Error::DataValueFlag {
                flag: source.clone(),
                message: e.to_string(),
            })?;
            for (index, value) in parse_stream(&content, path, strict)?.into_iter().enumerate() {
                let doc = ValuesDocument::new(value, format!("{} doc {}", source, index));
                overlays.push(library.clone(), doc);
            }
        }

        for prefix in &self.env_prefixes {
            for (key, value) in env_values(env, prefix) {
                let source = format!("--data-values-env {} ({})", prefix, key);
                let tree = value_at_path(&parse_path(&key), YamlValue::String(value))?;
                overlays.push(None, ValuesDocument::new(tree, source));
            }
        }

        for prefix in &self.env_yaml_prefixes {
            for (key, value) in env_values(env, prefix) {
                let source = format!("--data-values-env-yaml {} ({})", prefix, key);
                let parsed = parse_document(&value, &source, 0, strict)?;
                let tree = value_at_path(&parse_path(&key), parsed)?;
                overlays.push(None, ValuesDocument::new(tree, source));
            }
        }

        for text in &self.kv_strings {
            let flag = KeyValueFlag::parse("--data-value", text)?;
            let value = YamlValue::String(flag.value.clone());
            let (library, doc) = flag.into_document(value, format!("--data-value '{}'", text))?;
            overlays.push(library, doc);
        }

        for text in &self.kv_yamls {
            let flag = KeyValueFlag::parse("--data-value-yaml", text)?;
            let source = format!("--data-value-yaml '{}'", text);
            let value = parse_document(&flag.value, &source, 0, strict)?;
            let (library, doc) = flag.into_document(value, source)?;
            overlays.push(library, doc);
        }

        for text in &self.kv_files {
            let flag = KeyValueFlag::parse("--data-value-file", text)?;
            let source = format!("--data-value-file '{}'", text);
            let content = read_file(&flag.value).map_err(|e| Error::DataValueFlag {
                flag: source.clone(),
                message: e.to_string(),
            })?;
            let (library, doc) = flag.into_document(YamlValue::String(content), source)?;
            overlays.push(library, doc);
        }

        Ok(overlays)
    }
}

/// Environment variables under `PREFIX_`, sorted by name, with `__` turned
/// into key path dots.
fn env_values(env: &[(String, String)], prefix: &str) -> Vec<(String, String)> {
    let prefix = format!("{}_", prefix);
    let mut values: Vec<(String, String)> = env
        .iter()
        .filter_map(|(name, value)| {
            let key = name.strip_prefix(&prefix)?;
            if key.is_empty() {
                return None;
            }
            Some((key.replace(ENV_KEY_SEPARATOR, "."), value.clone()))
        })
        .collect();
    values.sort();
    values
}
