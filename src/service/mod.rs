//! Dbop: declarative CRUD operations over registered models.
//!
//! Every operation resolves the model from the registry, builds its statements from the
//! model metadata and the caller's parameters, runs them on the given [`Session`] and
//! returns a payload or a [`DbopError`].

mod autofill;
mod create;
mod delete;
mod detail;
mod list;
mod record;
mod reorder;
mod update;

pub use autofill::{now, rand_string, rand_uint};
pub use record::{flatten_embedded, ModelRef, Record};

use crate::config::{ModelConfig, ModelDefine, ModelRegistry, ModelSchema};
use crate::error::{DbopError, Stage};
use crate::params::ParamValue;
use crate::session::{Row, Session};
use crate::sql::{QueryBuf, QueryDefines, QuerySettings};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A typed record. Field values travel through serde; embedded groups are nested objects
/// named after the group.
pub trait Model: Serialize + DeserializeOwned {
    fn schema() -> ModelSchema;

    /// Registry key, taken from the schema.
    fn model_name() -> String {
        ModelConfig::from(Self::schema()).name
    }
}

/// Operation entry point. Cheap to clone; the registry is shared read-only.
#[derive(Clone, Debug)]
pub struct Dbop {
    registry: Arc<ModelRegistry>,
}

impl Dbop {
    pub fn new(registry: ModelRegistry) -> Self {
        Dbop {
            registry: Arc::new(registry),
        }
    }

    pub fn with_registry(registry: Arc<ModelRegistry>) -> Self {
        Dbop { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    fn define(&self, name: &str) -> Result<Arc<ModelDefine>, DbopError> {
        self.registry.get(name)
    }
}

fn query_defines(settings: Option<&QuerySettings>) -> QueryDefines {
    settings.map(crate::sql::parse_query_settings).unwrap_or_default()
}

/// Column reference for a field, qualified when a `table:` directive applies.
fn column_ref(session: &dyn Session, define: &ModelDefine, field: &str, table: Option<&str>) -> String {
    let dialect = session.dialect();
    let column = define.column_name(field, session.column_mapper());
    match table {
        Some(t) => dialect.qualify(t, &column),
        None => dialect.quote(&column),
    }
}

/// Select list: main fields qualified with the main table, joined fields bare.
fn select_columns(session: &dyn Session, define: &ModelDefine, table: &str, hidden: &[&str]) -> Vec<String> {
    let dialect = session.dialect();
    let mapper = session.column_mapper();
    define
        .fields()
        .iter()
        .filter(|f| !hidden.contains(&f.as_str()))
        .map(|f| {
            let column = define.column_name(f, mapper);
            if define.is_ref_field(f) {
                dialect.quote(&column)
            } else {
                dialect.qualify(table, &column)
            }
        })
        .collect()
}

/// Value written into a field for a parameter. Ranges have no column form.
fn field_value(field: &str, v: &ParamValue) -> Result<Value, DbopError> {
    v.to_field_value()
        .ok_or_else(|| DbopError::WrongParamType(format!("{}: a range cannot be assigned to a field", field)))
}

fn log_query(session: &dyn Session, q: &QueryBuf) {
    if session.show_sql() {
        tracing::info!(sql = %q.sql, params = ?q.params, "query");
    } else {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    }
}

fn failed(stage: Stage, model: &str, err: sqlx::Error) -> DbopError {
    tracing::error!(reason = stage.reason(), model = %model, error = %err, "dbop error");
    DbopError::execution(stage, Some(model), err)
}

async fn execute(session: &mut dyn Session, q: &QueryBuf, stage: Stage, model: &str) -> Result<u64, DbopError> {
    log_query(session, q);
    session.execute(q).await.map_err(|e| failed(stage, model, e))
}

async fn fetch_all(session: &mut dyn Session, q: &QueryBuf, stage: Stage, model: &str) -> Result<Vec<Row>, DbopError> {
    log_query(session, q);
    session.fetch_all(q).await.map_err(|e| failed(stage, model, e))
}

async fn fetch_count(session: &mut dyn Session, q: &QueryBuf, stage: Stage, model: &str) -> Result<i64, DbopError> {
    log_query(session, q);
    session.fetch_count(q).await.map_err(|e| failed(stage, model, e))
}

/// Roll back a transaction this operation opened. The original failure is what gets
/// returned, so a rollback error is only logged.
async fn rollback(session: &mut dyn Session, opened: bool) {
    if !opened {
        return;
    }
    if let Err(e) = session.rollback().await {
        tracing::warn!(error = %e, "rollback failed");
    }
}
