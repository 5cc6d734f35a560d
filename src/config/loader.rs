//! Build resolved models from declarations: the `ModelSchema` builder, JSON loading and `resolve`.

use crate::config::resolved::{EmbeddedGroup, FieldDef, ModelDefine, ModelRegistry};
use crate::config::types::{parse_tags, FieldConfig, FieldEntry, FieldType, ModelConfig};
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Build a resolved model from a declaration (validates first).
pub fn resolve(config: &ModelConfig) -> Result<ModelDefine, ConfigError> {
    validate(config)?;

    let mut m = ModelDefine {
        name: config.name.clone(),
        main_model_name: String::new(),
        table_name: config.table.clone().filter(|t| !t.is_empty()),
        defs: Vec::new(),
        fields: Vec::new(),
        main_fields: Vec::new(),
        ref_fields: Vec::new(),
        embedded: Vec::new(),
        field_index: HashMap::new(),
        tag_fields: HashMap::new(),
    };

    let mut has_embedded = false;
    for entry in &config.fields {
        match entry {
            FieldEntry::Embedded { embed, fields } => {
                has_embedded = true;
                if m.main_model_name.is_empty() {
                    m.main_model_name = embed.clone();
                }
                for f in fields {
                    push_field(&mut m, f);
                    m.main_fields.push(f.name.clone());
                }
                m.embedded.push(EmbeddedGroup {
                    name: embed.clone(),
                    fields: fields.iter().map(|f| f.name.clone()).collect(),
                });
            }
            FieldEntry::Field(f) => {
                push_field(&mut m, f);
                // Plain fields after an embedded structure come from joined tables.
                if has_embedded {
                    m.ref_fields.push(f.name.clone());
                } else {
                    m.main_fields.push(f.name.clone());
                }
            }
        }
    }
    if m.main_model_name.is_empty() {
        m.main_model_name = config.name.clone();
    }
    Ok(m)
}

fn push_field(m: &mut ModelDefine, f: &FieldConfig) {
    let tags = parse_tags(&f.tags);
    for tag in &tags {
        let entry = m.tag_fields.entry(tag.name.clone()).or_default();
        if !entry.contains(&f.name) {
            entry.push(f.name.clone());
        }
    }
    m.field_index.insert(f.name.clone(), m.defs.len());
    m.fields.push(f.name.clone());
    m.defs.push(FieldDef {
        name: f.name.clone(),
        type_: f.type_,
        tags,
    });
}

/// Fluent builder for a model declaration.
///
/// ```ignore
/// let schema = ModelSchema::new("User")
///     .table("users")
///     .field("Id", FieldType::Uint32, "pk rand:uint32:100-200")
///     .field("Password", FieldType::String, "hidden:*");
/// registry.register(schema)?;
/// ```
#[derive(Clone, Debug)]
pub struct ModelSchema {
    config: ModelConfig,
}

impl ModelSchema {
    pub fn new(name: &str) -> Self {
        ModelSchema {
            config: ModelConfig {
                name: name.to_string(),
                table: None,
                fields: Vec::new(),
            },
        }
    }

    pub fn table(mut self, table: &str) -> Self {
        self.config.table = Some(table.to_string());
        self
    }

    /// Add a field with its space-separated annotation tags.
    pub fn field(mut self, name: &str, type_: FieldType, tags: &str) -> Self {
        self.config.fields.push(FieldEntry::Field(FieldConfig {
            name: name.to_string(),
            type_,
            tags: tags.to_string(),
        }));
        self
    }

    /// Add an embedded structure; its fields are expanded into the model.
    pub fn embed(mut self, name: &str, build: impl FnOnce(ModelSchema) -> ModelSchema) -> Self {
        let inner = build(ModelSchema::new(name));
        let fields = inner
            .config
            .fields
            .into_iter()
            .flat_map(|e| match e {
                FieldEntry::Field(f) => vec![f],
                FieldEntry::Embedded { fields, .. } => fields,
            })
            .collect();
        self.config.fields.push(FieldEntry::Embedded {
            embed: name.to_string(),
            fields,
        });
        self
    }
}

impl From<ModelSchema> for ModelConfig {
    fn from(schema: ModelSchema) -> Self {
        schema.config
    }
}

/// Parse model declarations from JSON: either a single model object or an array of them.
pub fn load_from_str(raw: &str) -> Result<Vec<ModelConfig>, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))?;
    let configs = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|c| vec![c])
    };
    configs.map_err(|e| ConfigError::Load(e.to_string()))
}

/// Load a registry from a JSON file, or from every `*.json` file in a directory (sorted by name).
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<ModelRegistry, ConfigError> {
    let path = path.as_ref();
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;

    let mut files = Vec::new();
    if meta.is_dir() {
        let mut dir = tokio::fs::read_dir(path)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        while let Some(entry) = dir.next_entry().await.map_err(|e| ConfigError::Load(e.to_string()))? {
            let p = entry.path();
            if p.extension().map(|x| x == "json").unwrap_or(false) {
                files.push(p);
            }
        }
        files.sort();
    } else {
        files.push(path.to_path_buf());
    }

    let mut registry = ModelRegistry::new();
    for file in files {
        let raw = tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", file.display(), e)))?;
        for config in load_from_str(&raw)? {
            registry.register(config)?;
        }
    }
    Ok(registry)
}
