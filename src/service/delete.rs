use super::{execute, now, Dbop};
use crate::error::{DbopError, Stage};
use crate::params::Params;
use crate::response::Affected;
use crate::session::Session;
use crate::sql::{self, BindValue, SetValue};

impl Dbop {
    /// Delete by full primary key. Models with `deletetime` fields are soft-deleted: every
    /// such field is set to the current time instead of removing the row.
    pub async fn delete(&self, session: &mut dyn Session, model: &str, params: &Params) -> Result<Affected, DbopError> {
        let define = self.define(model)?;
        let pk_fields = define.pk_fields();
        if pk_fields.is_empty() {
            return Err(DbopError::UndefinedPk(define.name.clone()));
        }
        let mapper = session.column_mapper();
        let dialect = session.dialect();
        let table = define.table_name(mapper);

        let key = pk_fields
            .iter()
            .map(|f| {
                params
                    .get(f)
                    .map(|v| (define.column_name(f, mapper), BindValue::from_param(v)))
                    .ok_or(DbopError::IncompletePkValue)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let soft = define.tag_fields("deletetime");
        let q = if soft.is_empty() {
            sql::delete(dialect, &table, &key)
        } else {
            let ts = now();
            let sets: Vec<(String, SetValue)> = soft
                .iter()
                .map(|f| (define.column_name(f, mapper), SetValue::Bind(BindValue::I64(ts))))
                .collect();
            sql::update(dialect, &table, &sets, &key)
        };
        let affected = execute(session, &q, Stage::Delete, &define.name).await?;
        Ok(Affected::new(affected))
    }
}
