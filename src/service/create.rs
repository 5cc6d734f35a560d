use super::autofill::{self, now};
use super::{field_value, query_defines, rollback, Dbop, Model, ModelRef, Record};
use crate::config::{FieldType, ShowIndexMode};
use crate::error::{DbopError, Stage};
use crate::params::Params;
use crate::response::CreatedKeys;
use crate::session::Session;
use crate::sql::{self, BindValue, QuerySettings, SetValue};
use serde_json::Value;
use std::collections::HashMap;

/// Insert attempts made when a random key collides with an existing row.
const MAX_INSERT_ATTEMPTS: usize = 3;

const INSERT_SAVEPOINT: &str = "dbop_insert";

/// A display-index column that needs maintenance after the insert.
struct IndexColumn {
    field: String,
    column: String,
    mode: ShowIndexMode,
}

/// Duplicate-key violation, by driver error kind or by message.
fn is_duplicate_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if db.is_unique_violation() {
            return true;
        }
    }
    let msg = err.to_string().to_lowercase();
    msg.contains("duplicate") && msg.contains("primary")
}

impl Dbop {
    /// Insert a record built from `params`, auto-filling fields the caller left empty.
    ///
    /// Returns the primary-key values, or `None` for a model without a primary key.
    /// When `model` is a record, the values written are left in it.
    pub async fn create(
        &self,
        session: &mut dyn Session,
        mut model: ModelRef<'_>,
        params: &Params,
        settings: Option<&QuerySettings>,
    ) -> Result<Option<CreatedKeys>, DbopError> {
        let define = self.define(model.name())?;
        let mut scratch = Record::new(&define.name);
        let record = model.record(&mut scratch);
        let defines = query_defines(settings);
        let mapper = session.column_mapper();
        let dialect = session.dialect();
        let table = define.table_name(mapper);

        let mut inserted: Vec<String> = Vec::new();
        let mut exprs: HashMap<String, String> = HashMap::new();
        let mut random_fields: Vec<String> = Vec::new();
        let mut index_columns: Vec<IndexColumn> = Vec::new();

        for field in define.fields() {
            if let Some(v) = params.get(field) {
                match defines.expr(field) {
                    Some(expr) => {
                        exprs.insert(field.clone(), expr.replace('$', &v.to_string()));
                    }
                    None => record.set(field, field_value(field, v)?),
                }
                inserted.push(field.clone());
                continue;
            }
            if record.has(field) {
                inserted.push(field.clone());
                continue;
            }

            let mut filled = false;
            for tag in define.field_tags(field) {
                match tag.name.as_str() {
                    "rand" | "randstr" => {
                        if let Some(v) = autofill::random_for_tag(tag) {
                            record.set(field, v);
                            random_fields.push(field.clone());
                            filled = true;
                        }
                    }
                    "createtime" | "updatetime" => {
                        record.set(field, now());
                        filled = true;
                    }
                    "showindex" => {
                        // NOT NULL display columns need a value before maintenance runs.
                        record.set(field, 0);
                        filled = true;
                        index_columns.push(IndexColumn {
                            field: field.clone(),
                            column: define.column_name(field, mapper),
                            mode: ShowIndexMode::parse(tag).unwrap_or(ShowIndexMode::Append),
                        });
                    }
                    _ => {}
                }
            }
            if filled {
                inserted.push(field.clone());
            }
        }

        let opened = !index_columns.is_empty() && !session.in_transaction();
        if opened {
            session
                .begin()
                .await
                .map_err(|e| super::failed(Stage::Begin, &define.name, e))?;
        }

        // A failed statement aborts a Postgres transaction; retryable attempts run under a savepoint.
        let guarded = !random_fields.is_empty() && session.in_transaction();

        let mut attempt = 1;
        loop {
            let columns: Vec<(String, SetValue)> = inserted
                .iter()
                .map(|f| {
                    let value = match exprs.get(f) {
                        Some(expr) => SetValue::Expr(expr.clone()),
                        None => {
                            let type_ = define.field(f).map(|d| d.type_).unwrap_or(FieldType::String);
                            let v = record.get(f).unwrap_or(&Value::Null);
                            SetValue::Bind(BindValue::from_json(v, type_))
                        }
                    };
                    (define.column_name(f, mapper), value)
                })
                .collect();
            let q = sql::insert(dialect, &table, &columns);

            if guarded {
                let mark = sql::savepoint(dialect, INSERT_SAVEPOINT);
                if let Err(e) = super::execute(session, &mark, Stage::Insert, &define.name).await {
                    rollback(session, opened).await;
                    return Err(e);
                }
            }
            super::log_query(session, &q);
            let result = session.execute(&q).await;
            if guarded {
                let step = match &result {
                    Ok(_) => sql::release_savepoint(dialect, INSERT_SAVEPOINT),
                    Err(_) => sql::rollback_to_savepoint(dialect, INSERT_SAVEPOINT),
                };
                if let Err(e) = super::execute(session, &step, Stage::Insert, &define.name).await {
                    rollback(session, opened).await;
                    return Err(e);
                }
            }

            match result {
                Ok(_) => break,
                Err(e) if attempt < MAX_INSERT_ATTEMPTS && !random_fields.is_empty() && is_duplicate_key(&e) => {
                    tracing::warn!(model = %define.name, attempt, error = %e, "duplicate key on insert, regenerating random fields");
                    for f in &random_fields {
                        if let Some(v) = define.field(f).and_then(autofill::regenerate) {
                            record.set(f, v);
                        }
                    }
                    attempt += 1;
                }
                Err(e) => {
                    rollback(session, opened).await;
                    return Err(super::failed(Stage::Insert, &define.name, e));
                }
            }
        }

        let pk_fields = define.pk_fields();
        let pk_values: Vec<(String, Value)> = pk_fields
            .iter()
            .map(|f| (f.clone(), record.get(f).cloned().unwrap_or(Value::Null)))
            .collect();

        for ic in &index_columns {
            let q = match ic.mode {
                ShowIndexMode::Insert => sql::shift_show_index(dialect, &table, &ic.column),
                ShowIndexMode::Append => {
                    let Some((first_field, first)) = pk_values.first() else {
                        continue;
                    };
                    let first_type = define.field(first_field).map(|d| d.type_).unwrap_or(FieldType::Uint64);
                    let key: Vec<(String, BindValue)> = pk_values
                        .iter()
                        .map(|(f, v)| {
                            let type_ = define.field(f).map(|d| d.type_).unwrap_or(FieldType::String);
                            (define.column_name(f, mapper), BindValue::from_json(v, type_))
                        })
                        .collect();
                    sql::set_show_index(dialect, &table, &ic.column, BindValue::from_json(first, first_type), &key)
                }
            };
            super::log_query(session, &q);
            if let Err(e) = session.execute(&q).await {
                rollback(session, opened).await;
                return Err(super::failed(Stage::UpdateShowIndex, &define.name, e));
            }
            match ic.mode {
                ShowIndexMode::Insert => record.set(&ic.field, 1),
                ShowIndexMode::Append => {
                    if let Some((_, first)) = pk_values.first() {
                        record.set(&ic.field, first.clone());
                    }
                }
            }
        }

        if opened {
            session
                .commit()
                .await
                .map_err(|e| super::failed(Stage::Commit, &define.name, e))?;
        }

        if pk_fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(pk_values.into_iter().collect()))
    }

    /// [`Dbop::create`] for a typed model; generated values are written back into `model`.
    pub async fn create_model<T: Model + Send + Sync>(
        &self,
        session: &mut dyn Session,
        model: &mut T,
        params: &Params,
        settings: Option<&QuerySettings>,
    ) -> Result<Option<CreatedKeys>, DbopError> {
        let define = self.define(&T::model_name())?;
        let mut record = Record::from_model(&define, model)?;
        let keys = self.create(session, ModelRef::Record(&mut record), params, settings).await?;
        *model = record.into_model(&define)?;
        Ok(keys)
    }
}
