//! Model declaration validation: unique field names and well-formed annotations.

use crate::config::types::{parse_tags, FieldConfig, FieldEntry, ModelConfig, RandSpec, RandStrSpec, ShowIndexMode};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(config: &ModelConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::EmptyModelName);
    }

    let mut seen = HashSet::new();
    for field in all_fields(config) {
        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::DuplicateField {
                model: config.name.clone(),
                field: field.name.clone(),
            });
        }
        validate_tags(&config.name, field)?;
    }
    Ok(())
}

fn all_fields(config: &ModelConfig) -> impl Iterator<Item = &FieldConfig> {
    config.fields.iter().flat_map(|entry| match entry {
        FieldEntry::Embedded { fields, .. } => fields.iter().collect::<Vec<_>>(),
        FieldEntry::Field(f) => vec![f],
    })
}

fn validate_tags(model: &str, field: &FieldConfig) -> Result<(), ConfigError> {
    for tag in parse_tags(&field.tags) {
        let invalid = |reason: String| ConfigError::InvalidTag {
            model: model.to_string(),
            field: field.name.clone(),
            tag: tag.name.clone(),
            reason,
        };
        match tag.name.as_str() {
            "column" => {
                if tag.param().map(str::is_empty).unwrap_or(true) {
                    return Err(invalid("column name is required".into()));
                }
            }
            "hidden" => match tag.param() {
                None | Some("") | Some("*") | Some("list") | Some("detail") => {}
                Some(other) => return Err(invalid(format!("unknown hidden scope '{}'", other))),
            },
            "rand" => {
                RandSpec::parse(&tag).map_err(invalid)?;
            }
            "randstr" => {
                RandStrSpec::parse(&tag).map_err(invalid)?;
            }
            "showindex" => {
                ShowIndexMode::parse(&tag).map_err(invalid)?;
            }
            _ => {}
        }
    }
    Ok(())
}
