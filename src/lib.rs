//! dbop: declarative CRUD query engine.
//!
//! Models are registered once from a schema description (builder or JSON). Operations then
//! build parameterized statements from model metadata and caller parameters: create with
//! auto-fill and collision retry, filtered and paginated list, detail, update, soft or hard
//! delete, and display-order moves.

pub mod case;
pub mod config;
pub mod error;
pub mod params;
pub mod response;
pub mod service;
pub mod session;
pub mod sql;
pub mod store;

pub use case::ColumnMapper;
pub use config::{load_from_path, load_from_str, resolve, FieldType, ModelConfig, ModelDefine, ModelRegistry, ModelSchema};
pub use error::{ConfigError, DbopError, Stage};
pub use params::{Bound, Cidr, ParamValue, Params, RangeValue};
pub use response::{Affected, CreatedKeys, DetailPayload, ListPage, ShowIndexInfo};
pub use service::{Dbop, Model, ModelRef, Record};
pub use session::{Row, Session};
pub use sql::{Dialect, QuerySettings};
pub use store::{connect, Database, DbOptions, SqlxSession};
