//! YAML values overlay
//!
//! This module layers data values documents onto each other. The first
//! layer applied onto an empty tree becomes the base; every later layer is
//! merged onto the accumulated result.
//!
//! ## Rules
//!
//! - Mappings: recursively merged key by key. A key absent from the earlier
//!   layers is a merge conflict unless the layer may add new keys.
//! - Sequences: replaced wholesale.
//! - Scalars: replaced.
//! - Type mismatches: replaced with a warning, or rejected in strict mode.
//!   Strict mode also rejects changing the kind of a scalar.
//! - Null: a null layer leaves the tree untouched; a null value inside a
//!   layer replaces the existing value.

use log::warn;
use serde_yaml::{Mapping, Value as YamlValue};

use super::PathSegment;
use crate::error::{Error, Result};

/// Permissions for applying one overlay layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// The layer may introduce keys absent from earlier layers
    pub allow_new_keys: bool,
    /// Type mismatches are errors instead of warnings
    pub strict: bool,
}

/// Where an overlay comes from, for error messages and warnings.
#[derive(Debug, Clone, Copy)]
pub struct MergeSource<'a> {
    pub library: &'a str,
    pub source_name: &'a str,
}

/// Navigate to a specific path within a YAML value, creating intermediate
/// structures as needed.
///
/// # Errors
///
/// Returns `Error::Path` if the path crosses a scalar value.
pub fn navigate_yaml_value<'a>(
    value: &'a mut YamlValue,
    path: &[PathSegment],
) -> Result<&'a mut YamlValue> {
    let mut current = value;
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                if current.is_null() {
                    *current = YamlValue::Mapping(Mapping::new());
                }
                let map = match current {
                    YamlValue::Mapping(map) => map,
                    _ => {
                        return Err(Error::Path {
                            message: format!("Expected mapping while navigating to '{}'", key),
                        })
                    }
                };
                current = map
                    .entry(YamlValue::String(key.clone()))
                    .or_insert(YamlValue::Null);
            }
            PathSegment::Index(idx) => {
                if current.is_null() {
                    *current = YamlValue::Sequence(Vec::new());
                }
                let seq = match current {
                    YamlValue::Sequence(seq) => seq,
                    _ => {
                        return Err(Error::Path {
                            message: format!("Expected sequence while navigating to index {}", idx),
                        })
                    }
                };
                while seq.len() <= *idx {
                    seq.push(YamlValue::Null);
                }
                current = &mut seq[*idx];
            }
        }
    }

    Ok(current)
}

/// Look up a value by path without modifying it.
pub fn lookup_yaml_value<'a>(value: &'a YamlValue, path: &[PathSegment]) -> Option<&'a YamlValue> {
    let mut current = value;
    for segment in path {
        current = match segment {
            PathSegment::Key(key) => current.as_mapping()?.get(key.as_str())?,
            PathSegment::Index(idx) => current.as_sequence()?.get(*idx)?,
        };
    }
    Some(current)
}

/// Build a document holding `value` at `path`, e.g. `a.b` → `{a: {b: value}}`.
pub fn value_at_path(path: &[PathSegment], value: YamlValue) -> Result<YamlValue> {
    let mut root = YamlValue::Null;
    *navigate_yaml_value(&mut root, path)? = value;
    Ok(root)
}

/// Apply one overlay layer onto the accumulated values.
pub fn overlay_values(
    target: &mut YamlValue,
    source: &YamlValue,
    options: MergeOptions,
    origin: MergeSource<'_>,
) -> Result<()> {
    if source.is_null() {
        return Ok(());
    }
    if target.is_null() {
        *target = source.clone();
        return Ok(());
    }
    merge_yaml_values(target, source, options, "", origin)
}

fn merge_yaml_values(
    target: &mut YamlValue,
    source: &YamlValue,
    options: MergeOptions,
    path: &str,
    origin: MergeSource<'_>,
) -> Result<()> {
    match (target, source) {
        (YamlValue::Mapping(target_map), YamlValue::Mapping(source_map)) => {
            for (key, value) in source_map {
                let new_path = join_key_path(path, key);
                match target_map.get_mut(key) {
                    Some(existing) if existing.is_null() => *existing = value.clone(),
                    Some(existing) => merge_yaml_values(existing, value, options, &new_path, origin)?,
                    None if options.allow_new_keys => {
                        target_map.insert(key.clone(), value.clone());
                    }
                    None => {
                        return Err(Error::MergeConflict {
                            library: origin.library.to_string(),
                            key_path: new_path,
                            source_name: origin.source_name.to_string(),
                            message: "key does not exist in earlier layers".to_string(),
                            hint: Some(
                                "annotate the document with '#@overlay/match missing_ok=True', use 'key+=value' on the command line, or pass --implicit-map-key-overrides".to_string(),
                            ),
                        });
                    }
                }
            }
            Ok(())
        }
        (target, source) if source.is_null() => {
            *target = YamlValue::Null;
            Ok(())
        }
        (target, source) => {
            let from = get_yaml_type_name(target);
            let to = get_yaml_type_name(source);
            let structural = shape(target) != shape(source);
            if structural || (options.strict && from != to) {
                if options.strict {
                    return Err(Error::MergeConflict {
                        library: origin.library.to_string(),
                        key_path: display_path(path),
                        source_name: origin.source_name.to_string(),
                        message: format!("cannot replace {} with {} in strict mode", from, to),
                        hint: None,
                    });
                }
                warn!(
                    "{}: Type mismatch at path '{}' in library {}: replacing {} with {}",
                    origin.source_name,
                    display_path(path),
                    origin.library,
                    from,
                    to
                );
            }
            *target = source.clone();
            Ok(())
        }
    }
}

#[derive(PartialEq, Eq)]
enum Shape {
    Mapping,
    Sequence,
    Scalar,
}

fn shape(value: &YamlValue) -> Shape {
    match value {
        YamlValue::Mapping(_) => Shape::Mapping,
        YamlValue::Sequence(_) => Shape::Sequence,
        _ => Shape::Scalar,
    }
}

fn join_key_path(path: &str, key: &YamlValue) -> String {
    let key_str = match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        _ => format!("{:?}", key),
    };
    if path.is_empty() {
        key_str
    } else {
        format!("{}.{}", path, key_str)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(document)".to_string()
    } else {
        path.to_string()
    }
}

/// Get a human-readable type name for a YAML value
///
/// Used for logging and error messages to describe the type of a value.
pub fn get_yaml_type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "Null",
        YamlValue::Bool(_) => "Bool",
        YamlValue::Number(_) => "Number",
        YamlValue::String(_) => "String",
        YamlValue::Sequence(_) => "Sequence",
        YamlValue::Mapping(_) => "Mapping",
        YamlValue::Tagged(_) => "Tagged",
    }
}
