//! Resolved model metadata: declarations validated and flattened for runtime use.

use crate::case::ColumnMapper;
use crate::config::types::{FieldType, ModelTag};
use crate::error::{ConfigError, DbopError};
use std::collections::HashMap;
use std::sync::Arc;

/// Which view a `hidden` annotation is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HiddenScope {
    List,
    Detail,
}

impl HiddenScope {
    fn as_str(&self) -> &'static str {
        match self {
            HiddenScope::List => "list",
            HiddenScope::Detail => "detail",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub type_: FieldType,
    pub tags: Vec<ModelTag>,
}

/// Embedded structure: its name and the fields expanded from it, in order.
#[derive(Clone, Debug)]
pub struct EmbeddedGroup {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ModelDefine {
    /// Registry key.
    pub name: String,
    /// Name of the first embedded structure, or the model name. Used for output envelope keys.
    pub main_model_name: String,
    pub(crate) table_name: Option<String>,
    pub(crate) defs: Vec<FieldDef>,
    pub(crate) fields: Vec<String>,
    pub(crate) main_fields: Vec<String>,
    pub(crate) ref_fields: Vec<String>,
    pub(crate) embedded: Vec<EmbeddedGroup>,
    pub(crate) field_index: HashMap<String, usize>,
    pub(crate) tag_fields: HashMap<String, Vec<String>>,
}

impl ModelDefine {
    /// Explicit table name, else the mapper applied to the main model name.
    pub fn table_name(&self, mapper: ColumnMapper) -> String {
        match &self.table_name {
            Some(t) => t.clone(),
            None => mapper.map(&self.main_model_name),
        }
    }

    /// All field names in declaration order, embedded fields expanded in place.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn main_fields(&self) -> &[String] {
        &self.main_fields
    }

    pub fn ref_fields(&self) -> &[String] {
        &self.ref_fields
    }

    pub fn embedded(&self) -> &[EmbeddedGroup] {
        &self.embedded
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.field_index.get(name).map(|&i| &self.defs[i])
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_index.contains_key(name)
    }

    pub fn is_ref_field(&self, name: &str) -> bool {
        self.ref_fields.iter().any(|f| f == name)
    }

    /// Fields carrying the given tag, in declaration order.
    pub fn tag_fields(&self, tag: &str) -> &[String] {
        self.tag_fields.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_tags(&self, field: &str) -> &[ModelTag] {
        self.field(field).map(|f| f.tags.as_slice()).unwrap_or(&[])
    }

    pub fn field_has_tag(&self, field: &str, tag: &str) -> bool {
        self.field_get_tag(field, tag).is_some()
    }

    pub fn field_get_tag(&self, field: &str, tag: &str) -> Option<&ModelTag> {
        self.field_tags(field).iter().find(|t| t.name == tag)
    }

    pub fn pk_fields(&self) -> &[String] {
        self.tag_fields("pk")
    }

    /// First `showindex` field, if any.
    pub fn show_index_field(&self) -> Option<&str> {
        self.tag_fields("showindex").first().map(String::as_str)
    }

    /// Physical column: `column:` tag, else the mapper applied to the field name.
    pub fn column_name(&self, field: &str, mapper: ColumnMapper) -> String {
        match self.field_get_tag(field, "column").and_then(ModelTag::param) {
            Some(c) => c.to_string(),
            None => mapper.map(field),
        }
    }

    /// Reverse lookup used to turn result columns back into field names.
    pub fn field_by_column(&self, column: &str, mapper: ColumnMapper) -> Option<&FieldDef> {
        self.defs
            .iter()
            .find(|f| self.column_name(&f.name, mapper) == column)
            .or_else(|| self.field(column))
    }

    /// Fields whose `hidden` tag covers the scope: no parameter, `*`, or the scope name.
    pub fn hidden_fields(&self, scope: HiddenScope) -> Vec<&str> {
        self.tag_fields("hidden")
            .iter()
            .filter(|f| {
                self.field_tags(f).iter().any(|t| {
                    t.name == "hidden"
                        && match t.param() {
                            None | Some("") | Some("*") => true,
                            Some(s) => s == scope.as_str(),
                        }
                })
            })
            .map(String::as_str)
            .collect()
    }
}

/// Registered models, keyed by model name. Built at startup, then shared read-only.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<ModelDefine>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        ModelRegistry {
            models: HashMap::new(),
        }
    }

    /// Validate and resolve a declaration, then register it under its model name.
    pub fn register(&mut self, config: impl Into<crate::config::ModelConfig>) -> Result<(), ConfigError> {
        let define = crate::config::resolve(&config.into())?;
        if self.models.contains_key(&define.name) {
            return Err(ConfigError::AlreadyRegistered(define.name));
        }
        tracing::debug!(model = %define.name, fields = define.fields.len(), "model registered");
        self.models.insert(define.name.clone(), Arc::new(define));
        Ok(())
    }

    /// Register a typed model through its schema.
    pub fn register_model<T: crate::service::Model>(&mut self) -> Result<(), ConfigError> {
        self.register(T::schema())
    }

    pub fn get(&self, name: &str) -> Result<Arc<ModelDefine>, DbopError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| DbopError::ModelNotRegistered(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn unregister(&mut self, name: &str) -> Option<Arc<ModelDefine>> {
        self.models.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}
