//! Raw model declaration types: field types, annotation tags, and the JSON model config.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semantic type of a model field. Drives zero values, random auto-fill width and
/// coercion of raw database cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Bool,
    Int,
    Uint,
    Uint32,
    Uint64,
    Float,
    String,
    /// Unix seconds.
    Timestamp,
    Json,
}

impl FieldType {
    pub fn zero(&self) -> Value {
        match self {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int | FieldType::Uint | FieldType::Uint32 | FieldType::Uint64 | FieldType::Timestamp => {
                Value::Number(0.into())
            }
            FieldType::Float => serde_json::json!(0.0),
            FieldType::String => Value::String(String::new()),
            FieldType::Json => Value::Null,
        }
    }

    /// Normalize a cell read back from the database into this field's JSON shape.
    /// SQLite and MySQL hand back booleans as integers, and JSON columns as text.
    pub fn coerce(&self, v: Value) -> Value {
        match (self, v) {
            (FieldType::Bool, Value::Number(n)) => Value::Bool(n.as_i64().map(|i| i != 0).unwrap_or(false)),
            (FieldType::Bool, Value::String(s)) => Value::Bool(matches!(s.as_str(), "1" | "true" | "t")),
            (
                FieldType::Int | FieldType::Uint | FieldType::Uint32 | FieldType::Uint64 | FieldType::Timestamp,
                Value::String(s),
            ) => s
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .or_else(|_| s.parse::<u64>().map(|n| Value::Number(n.into())))
                .unwrap_or(Value::String(s)),
            (FieldType::Float, Value::String(s)) => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::String(s)),
            (FieldType::Json, Value::String(s)) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
            (_, v) => v,
        }
    }
}

/// One annotation on a field, e.g. `hidden:list` or `rand:uint32:100-200`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelTag {
    pub name: String,
    pub params: Vec<String>,
}

impl ModelTag {
    pub fn new(name: &str, params: &[&str]) -> Self {
        ModelTag {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// First parameter, if any.
    pub fn param(&self) -> Option<&str> {
        self.params.first().map(String::as_str)
    }
}

/// Parse a space-separated tag string: `name` or `name:p1,p2`.
pub fn parse_tags(tags: &str) -> Vec<ModelTag> {
    tags.split_whitespace()
        .map(|tag| match tag.split_once(':') {
            Some((name, params)) => ModelTag {
                name: name.to_string(),
                params: params.split(',').map(str::to_string).collect(),
            },
            None => ModelTag {
                name: tag.to_string(),
                params: Vec::new(),
            },
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RandKind {
    Uint,
    Uint32,
    Uint64,
    /// `YYYYMMDD` followed by ten random digits.
    DatePrefix,
}

/// Parsed `rand[:kind[:start-end]]` annotation. The range is half-open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandSpec {
    pub kind: RandKind,
    pub range: Option<(u64, u64)>,
}

impl RandSpec {
    pub fn parse(tag: &ModelTag) -> Result<Self, String> {
        let raw = tag.param().unwrap_or("");
        let (kind, range) = match raw.split_once(':') {
            Some((k, r)) => (k, Some(r)),
            None => (raw, None),
        };
        let kind = match kind {
            "" | "uint32" => RandKind::Uint32,
            "uint" => RandKind::Uint,
            "uint64" => RandKind::Uint64,
            "dateprefix" => RandKind::DatePrefix,
            other => return Err(format!("unknown rand type '{}'", other)),
        };
        let range = match range.and_then(|r| r.split_once('-')) {
            Some((start, end)) => {
                let start: u64 = start.parse().map_err(|_| format!("invalid rand range start '{}'", start))?;
                let end: u64 = end.parse().map_err(|_| format!("invalid rand range end '{}'", end))?;
                // An empty range falls back to the full width of the type.
                if end <= start {
                    None
                } else {
                    Some((start, end))
                }
            }
            None => None,
        };
        Ok(RandSpec { kind, range })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LetterCase {
    Upper,
    Lower,
}

/// Parsed `randstr[:len[,upper|lower]]` annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandStrSpec {
    pub len: usize,
    pub case: Option<LetterCase>,
}

impl RandStrSpec {
    pub const DEFAULT_LEN: usize = 16;

    pub fn parse(tag: &ModelTag) -> Result<Self, String> {
        let len = match tag.param() {
            None | Some("") => Self::DEFAULT_LEN,
            Some(n) => n.parse().map_err(|_| format!("invalid randstr length '{}'", n))?,
        };
        let case = match tag.params.get(1).map(String::as_str) {
            Some("upper") => Some(LetterCase::Upper),
            Some("lower") => Some(LetterCase::Lower),
            _ => None,
        };
        Ok(RandStrSpec { len, case })
    }
}

/// How a `showindex` column is maintained on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShowIndexMode {
    /// Every existing row shifts down by one; the new row takes the front.
    Insert,
    /// The new row's index is set to its own primary key value.
    Append,
}

impl ShowIndexMode {
    pub fn parse(tag: &ModelTag) -> Result<Self, String> {
        match tag.param() {
            None | Some("") | Some("append") => Ok(ShowIndexMode::Append),
            Some("insert") => Ok(ShowIndexMode::Insert),
            Some(other) => Err(format!("unknown showindex mode '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default)]
    pub tags: String,
}

/// A field entry in a model declaration: a plain field, or an embedded structure whose
/// fields are expanded in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Embedded { embed: String, fields: Vec<FieldConfig> },
    Field(FieldConfig),
}

/// Declarative description of one record type, as built by [`crate::config::ModelSchema`]
/// or read from JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    pub fields: Vec<FieldEntry>,
}
