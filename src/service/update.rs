use super::{execute, field_value, now, query_defines, Dbop, Model, ModelRef, Record};
use crate::error::{DbopError, Stage};
use crate::params::Params;
use crate::response::Affected;
use crate::session::Session;
use crate::sql::{self, BindValue, QuerySettings, SetValue};

impl Dbop {
    /// Partial update by primary key.
    ///
    /// Primary-key parameters identify the row and are never written. Every other field
    /// present in `params` is written; absent `updatetime` fields are refreshed. With
    /// nothing to write, no statement is issued and `Affected` is 0.
    pub async fn update(
        &self,
        session: &mut dyn Session,
        mut model: ModelRef<'_>,
        params: &Params,
        settings: Option<&QuerySettings>,
    ) -> Result<Affected, DbopError> {
        let define = self.define(model.name())?;
        let pk_fields = define.pk_fields();
        if pk_fields.is_empty() {
            tracing::error!(reason = "NoPrimaryKey", model = %define.name, "dbop error");
            return Err(DbopError::NoPrimaryKey(define.name.clone()));
        }
        let mut scratch = Record::new(&define.name);
        let record = model.record(&mut scratch);
        let defines = query_defines(settings);
        let mapper = session.column_mapper();

        let mut key: Vec<(String, BindValue)> = Vec::new();
        let mut sets: Vec<(String, SetValue)> = Vec::new();
        for field in define.fields() {
            let column = define.column_name(field, mapper);
            let type_ = define.field(field).map(|d| d.type_);
            match params.get(field) {
                Some(v) if define.field_has_tag(field, "pk") => {
                    key.push((column, BindValue::from_param(v)));
                }
                Some(v) => match defines.expr(field) {
                    Some(expr) => sets.push((column, SetValue::Expr(expr.replace('$', &v.to_string())))),
                    None => {
                        let value = field_value(field, v)?;
                        let bind = match type_ {
                            Some(t) => BindValue::from_json(&value, t),
                            None => BindValue::from_param(v),
                        };
                        record.set(field, value);
                        sets.push((column, SetValue::Bind(bind)));
                    }
                },
                None if define.field_has_tag(field, "updatetime") => {
                    let ts = now();
                    record.set(field, ts);
                    sets.push((column, SetValue::Bind(BindValue::I64(ts))));
                }
                None => {}
            }
        }

        if sets.is_empty() {
            return Ok(Affected::new(0));
        }
        if key.len() != pk_fields.len() {
            return Err(DbopError::IncompletePkValue);
        }

        let q = sql::update(session.dialect(), &define.table_name(mapper), &sets, &key);
        let affected = execute(session, &q, Stage::Update, &define.name).await?;
        Ok(Affected::new(affected))
    }

    /// [`Dbop::update`] for a typed model; written values are reflected back into `model`.
    pub async fn update_model<T: Model>(
        &self,
        session: &mut dyn Session,
        model: &mut T,
        params: &Params,
        settings: Option<&QuerySettings>,
    ) -> Result<Affected, DbopError> {
        let define = self.define(&T::model_name())?;
        let mut record = Record::from_model(&define, model)?;
        let affected = self.update(session, ModelRef::Record(&mut record), params, settings).await?;
        *model = record.into_model(&define)?;
        Ok(affected)
    }
}
