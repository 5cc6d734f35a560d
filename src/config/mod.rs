//! Model metadata: declarations, annotation tags, validation and the resolved registry.

pub mod loader;
pub mod resolved;
pub mod types;
pub mod validator;

pub use loader::{load_from_path, load_from_str, resolve, ModelSchema};
pub use resolved::{EmbeddedGroup, FieldDef, HiddenScope, ModelDefine, ModelRegistry};
pub use types::{
    parse_tags, FieldConfig, FieldEntry, FieldType, LetterCase, ModelConfig, ModelTag, RandKind, RandSpec, RandStrSpec,
    ShowIndexMode,
};
pub use validator::validate;
