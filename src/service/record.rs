//! In-memory record instances and their conversions.
//!
//! A [`Record`] holds field values keyed by field name. A missing key means the caller
//! provided no value, which is what auto-fill checks before generating one.

use crate::case::ColumnMapper;
use crate::config::ModelDefine;
use crate::error::DbopError;
use crate::session::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    model: String,
    values: Map<String, Value>,
}

impl Record {
    pub fn new(model: &str) -> Self {
        Record {
            model: model.to_string(),
            values: Map::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.values.insert(field.to_string(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.values.remove(field)
    }

    /// Field values, flat, in insertion order.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    /// Build a record from a result row, mapping columns back to fields and normalizing
    /// cells to each field's type. Columns that match no field are dropped.
    pub fn from_row(define: &ModelDefine, row: Row, mapper: ColumnMapper) -> Self {
        let mut record = Record::new(&define.name);
        for (column, value) in row {
            if let Some(f) = define.field_by_column(&column, mapper) {
                record.values.insert(f.name.clone(), f.type_.coerce(value));
            }
        }
        record
    }

    /// Build a record from a serializable model. Embedded groups are flattened; null
    /// values count as not provided.
    pub fn from_model<T: Serialize>(define: &ModelDefine, model: &T) -> Result<Self, DbopError> {
        let value = serde_json::to_value(model).map_err(|e| DbopError::WrongParamType(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(DbopError::WrongParamType(format!("{}: expected a struct", define.name)));
        };
        let mut record = Record::new(&define.name);
        for (k, v) in flatten_embedded(define, map) {
            if define.has_field(&k) && !v.is_null() {
                record.values.insert(k, v);
            }
        }
        Ok(record)
    }

    /// Deserialize into a model, nesting embedded groups back under their names.
    pub fn into_model<T: DeserializeOwned>(&self, define: &ModelDefine) -> Result<T, DbopError> {
        serde_json::from_value(Value::Object(self.to_nested(define)))
            .map_err(|e| DbopError::WrongParamType(format!("{}: {}", define.name, e)))
    }

    /// The record's own shape: main fields under their embedded group, other fields at the top level.
    pub fn to_nested(&self, define: &ModelDefine) -> Map<String, Value> {
        let mut out = Map::new();
        for field in define.fields() {
            let Some(v) = self.values.get(field) else {
                continue;
            };
            match define.embedded().iter().find(|g| g.fields.contains(field)) {
                Some(group) => {
                    let entry = out
                        .entry(group.name.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(inner) = entry {
                        inner.insert(field.clone(), v.clone());
                    }
                }
                None => {
                    out.insert(field.clone(), v.clone());
                }
            }
        }
        out
    }

    /// Flat map with the given fields removed.
    pub fn redacted(&self, define: &ModelDefine, hidden: &[&str]) -> Map<String, Value> {
        let mut flat = flatten_embedded(define, self.to_nested(define));
        for field in hidden {
            flat.remove(*field);
        }
        flat
    }
}

/// Hoist the entries of embedded-group objects to the top level.
pub fn flatten_embedded(define: &ModelDefine, map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (k, v) in map {
        match v {
            Value::Object(inner) if define.embedded().iter().any(|g| g.name == k) => {
                out.extend(inner);
            }
            other => {
                out.insert(k, other);
            }
        }
    }
    out
}

/// The model an operation works on: a registered name, or a record the operation reads
/// from and writes back into.
#[derive(Debug)]
pub enum ModelRef<'a> {
    Name(&'a str),
    Record(&'a mut Record),
}

impl<'a> ModelRef<'a> {
    pub fn name(&self) -> &str {
        match self {
            ModelRef::Name(n) => n,
            ModelRef::Record(r) => r.model(),
        }
    }

    /// The caller's record, or `scratch` when the model was given by name.
    pub(crate) fn record<'b>(&'b mut self, scratch: &'b mut Record) -> &'b mut Record {
        match self {
            ModelRef::Record(r) => &mut **r,
            ModelRef::Name(_) => scratch,
        }
    }
}

impl<'a> From<&'a str> for ModelRef<'a> {
    fn from(name: &'a str) -> Self {
        ModelRef::Name(name)
    }
}

impl<'a> From<&'a mut Record> for ModelRef<'a> {
    fn from(record: &'a mut Record) -> Self {
        ModelRef::Record(record)
    }
}
