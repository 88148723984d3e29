//! Data values schemas.
//!
//! A schema supplies the starting values of the cascade and checks the
//! resolved values once every layer has been applied. [`AnySchema`] does
//! neither; [`DocumentSchema`] infers a type for every value of a schema
//! document and uses the document's values as defaults.
//!
//! ## Type inference
//!
//! - null: any value, default null
//! - bool, int, float, string: that scalar type, default the value itself
//! - map: a map type with one type per key (keys must be strings)
//! - array: exactly one item describing every element, default `[]`

use std::fmt;

use serde_yaml::{Mapping, Number, Value as YamlValue};

use crate::error::{Error, Result};

/// Source of default values and validator of resolved values.
pub trait Schema: fmt::Debug {
    /// Values every cascade starts from.
    fn defaults(&self) -> YamlValue;

    /// Check resolved values, filling missing keys from defaults.
    fn validate(&self, values: YamlValue) -> Result<YamlValue>;
}

/// Schema used when schemas are disabled or absent: no defaults, no checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnySchema;

impl Schema for AnySchema {
    fn defaults(&self) -> YamlValue {
        YamlValue::Null
    }

    fn validate(&self, values: YamlValue) -> Result<YamlValue> {
        Ok(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    String,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::String => "string",
        };
        write!(f, "{}", name)
    }
}

/// Inferred type of one node of a schema document.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaType {
    Any { default: YamlValue },
    Scalar { kind: ScalarKind, default: YamlValue },
    Map { fields: Vec<(String, SchemaType)> },
    Array { item: Box<SchemaType> },
}

impl SchemaType {
    fn infer(value: &YamlValue, path: &str, source: &str) -> Result<Self> {
        let schema_error = |message: String| Error::Schema {
            source_name: source.to_string(),
            message,
        };
        match value {
            YamlValue::Null => Ok(SchemaType::Any {
                default: YamlValue::Null,
            }),
            YamlValue::Bool(_) => Ok(Self::scalar(ScalarKind::Bool, value)),
            YamlValue::Number(n) if n.is_f64() => Ok(Self::scalar(ScalarKind::Float, value)),
            YamlValue::Number(_) => Ok(Self::scalar(ScalarKind::Int, value)),
            YamlValue::String(_) => Ok(Self::scalar(ScalarKind::String, value)),
            YamlValue::Mapping(map) => {
                let mut fields = Vec::with_capacity(map.len());
                for (key, child) in map {
                    let key = key.as_str().ok_or_else(|| {
                        schema_error(format!(
                            "map keys must be strings, found {} at '{}'",
                            type_name(key),
                            display_path(path)
                        ))
                    })?;
                    let child_path = join_key(path, key);
                    fields.push((key.to_string(), Self::infer(child, &child_path, source)?));
                }
                Ok(SchemaType::Map { fields })
            }
            YamlValue::Sequence(items) => {
                if items.len() != 1 {
                    return Err(schema_error(format!(
                        "array at '{}' must contain exactly one item describing its elements, found {}",
                        display_path(path),
                        items.len()
                    )));
                }
                let item = Self::infer(&items[0], &format!("{}[0]", path), source)?;
                Ok(SchemaType::Array {
                    item: Box::new(item),
                })
            }
            YamlValue::Tagged(tagged) => Err(schema_error(format!(
                "tagged value '{}' at '{}' cannot be used in a schema",
                tagged.tag,
                display_path(path)
            ))),
        }
    }

    fn scalar(kind: ScalarKind, value: &YamlValue) -> Self {
        SchemaType::Scalar {
            kind,
            default: value.clone(),
        }
    }

    pub fn defaults(&self) -> YamlValue {
        match self {
            SchemaType::Any { default } | SchemaType::Scalar { default, .. } => default.clone(),
            SchemaType::Map { fields } => {
                let mut map = Mapping::new();
                for (key, ty) in fields {
                    map.insert(YamlValue::String(key.clone()), ty.defaults());
                }
                YamlValue::Mapping(map)
            }
            SchemaType::Array { .. } => YamlValue::Sequence(Vec::new()),
        }
    }

    fn expected(&self) -> String {
        match self {
            SchemaType::Any { .. } => "any".to_string(),
            SchemaType::Scalar { kind, .. } => kind.to_string(),
            SchemaType::Map { .. } => "map".to_string(),
            SchemaType::Array { .. } => "array".to_string(),
        }
    }

    fn check(&self, value: YamlValue, path: &str) -> Result<YamlValue> {
        let mismatch = |value: &YamlValue| Error::Validation {
            path: display_path(path),
            expected: self.expected(),
            actual: type_name(value).to_string(),
        };
        match self {
            SchemaType::Any { .. } => Ok(value),
            SchemaType::Scalar { kind, .. } => {
                let accepted = match (kind, &value) {
                    (ScalarKind::Bool, YamlValue::Bool(_)) => true,
                    (ScalarKind::String, YamlValue::String(_)) => true,
                    (ScalarKind::Int, YamlValue::Number(n)) => !n.is_f64(),
                    (ScalarKind::Float, YamlValue::Number(_)) => true,
                    _ => false,
                };
                if !accepted {
                    return Err(mismatch(&value));
                }
                if *kind == ScalarKind::Float {
                    return Ok(as_float(value));
                }
                Ok(value)
            }
            SchemaType::Map { fields } => {
                let mut given = match value {
                    YamlValue::Mapping(map) => map,
                    other => return Err(mismatch(&other)),
                };
                for (key, _) in given.iter() {
                    let declared = key
                        .as_str()
                        .map(|k| fields.iter().any(|(name, _)| name == k))
                        .unwrap_or(false);
                    if !declared {
                        let known: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
                        return Err(Error::Validation {
                            path: join_key(path, &key_text(key)),
                            expected: format!("one of the declared keys ({})", known.join(", ")),
                            actual: "an undeclared key".to_string(),
                        });
                    }
                }
                let mut result = Mapping::new();
                for (name, ty) in fields {
                    let child_path = join_key(path, name);
                    let child = match given.get_mut(name.as_str()) {
                        Some(v) => ty.check(std::mem::take(v), &child_path)?,
                        None => ty.defaults(),
                    };
                    result.insert(YamlValue::String(name.clone()), child);
                }
                Ok(YamlValue::Mapping(result))
            }
            SchemaType::Array { item } => {
                let items = match value {
                    YamlValue::Sequence(items) => items,
                    other => return Err(mismatch(&other)),
                };
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| item.check(v, &format!("{}[{}]", path, i)))
                    .collect::<Result<Vec<_>>>()
                    .map(YamlValue::Sequence)
            }
        }
    }
}

/// Schema inferred from a schema document.
#[derive(Debug, Clone)]
pub struct DocumentSchema {
    root: SchemaType,
    source: String,
}

impl DocumentSchema {
    /// Infer a schema from a parsed schema document.
    pub fn from_document(value: &YamlValue, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let root = SchemaType::infer(value, "", &source)?;
        Ok(Self { root, source })
    }

    pub fn root_type(&self) -> &SchemaType {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Schema for DocumentSchema {
    fn defaults(&self) -> YamlValue {
        self.root.defaults()
    }

    fn validate(&self, values: YamlValue) -> Result<YamlValue> {
        self.root.check(values, "")
    }
}

fn as_float(value: YamlValue) -> YamlValue {
    let widened = match &value {
        YamlValue::Number(n) if !n.is_f64() => n.as_f64(),
        _ => None,
    };
    match widened {
        Some(f) => YamlValue::Number(Number::from(f)),
        None => value,
    }
}

fn type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "bool",
        YamlValue::Number(n) if n.is_f64() => "float",
        YamlValue::Number(_) => "int",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "array",
        YamlValue::Mapping(_) => "map",
        YamlValue::Tagged(_) => "tagged value",
    }
}

fn key_text(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| type_name(other).to_string()),
    }
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(document)".to_string()
    } else {
        path.to_string()
    }
}
