use super::{fetch_all, select_columns, Dbop, Model, ModelRef, Record};
use crate::config::HiddenScope;
use crate::error::{DbopError, Stage};
use crate::params::Params;
use crate::response::DetailPayload;
use crate::session::Session;
use crate::sql::{self, parse_joins, BindValue, Condition, SelectSpec};

impl Dbop {
    /// Fetch one record by its full primary key.
    ///
    /// The payload is keyed by the main model name. Fields hidden from details are
    /// removed from the payload; when `model` is a record it receives the row as read.
    pub async fn detail(
        &self,
        session: &mut dyn Session,
        mut model: ModelRef<'_>,
        params: &Params,
        joins: Option<&[Vec<String>]>,
    ) -> Result<DetailPayload, DbopError> {
        let define = self.define(model.name())?;
        let joins = parse_joins(joins.unwrap_or(&[]))?;
        let dialect = session.dialect();
        let mapper = session.column_mapper();
        let table = define.table_name(mapper);

        let pk_fields = define.pk_fields();
        if pk_fields.is_empty() {
            return Err(DbopError::UndefinedPk(define.name.clone()));
        }
        let mut clauses = Vec::with_capacity(pk_fields.len());
        let mut args = Vec::with_capacity(pk_fields.len());
        for f in pk_fields {
            let v = params.get(f).ok_or(DbopError::IncompletePkValue)?;
            clauses.push(format!("{} = ?", dialect.qualify(&table, &define.column_name(f, mapper))));
            args.push(BindValue::from_param(v));
        }
        let filter = Condition::new(clauses.join(" AND "), args);

        let hidden = define.hidden_fields(HiddenScope::Detail);
        let columns = select_columns(session, &define, &table, &hidden);
        let q = sql::select(
            dialect,
            &SelectSpec {
                table: &table,
                columns: &columns,
                joins: &joins,
                filter: Some(&filter),
                order: &[],
                limit: Some((1, 0)),
            },
        );
        let row = fetch_all(session, &q, Stage::Get, &define.main_model_name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbopError::ObjectNotExist(define.main_model_name.clone()))?;
        let found = Record::from_row(&define, row, mapper);

        let item = if hidden.is_empty() {
            found.to_nested(&define)
        } else {
            found.redacted(&define, &hidden)
        };
        if let ModelRef::Record(r) = &mut model {
            for (k, v) in found.into_values() {
                r.set(&k, v);
            }
        }
        Ok(DetailPayload {
            key: define.main_model_name.clone(),
            item,
        })
    }

    /// [`Dbop::detail`] returning the typed model. Hidden fields take their serde defaults.
    pub async fn detail_model<T: Model>(
        &self,
        session: &mut dyn Session,
        params: &Params,
        joins: Option<&[Vec<String>]>,
    ) -> Result<T, DbopError> {
        let name = T::model_name();
        let define = self.define(&name)?;
        let mut record = Record::new(&name);
        self.detail(session, ModelRef::Record(&mut record), params, joins).await?;
        record.into_model(&define)
    }
}
