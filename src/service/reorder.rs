use super::{execute, fetch_count, Dbop};
use crate::error::{DbopError, Stage};
use crate::response::Affected;
use crate::session::Session;
use crate::sql;

impl Dbop {
    /// Move the row at display position `src` to `dst`. Rows in between shift one step
    /// toward `src`, all in a single statement.
    pub async fn move_index(&self, session: &mut dyn Session, model: &str, src: u32, dst: u32) -> Result<Affected, DbopError> {
        if src == dst {
            return Err(DbopError::NoObjectMoved);
        }
        let define = self.define(model)?;
        let field = define
            .show_index_field()
            .ok_or_else(|| DbopError::NoShowIndexField(define.name.clone()))?;
        let mapper = session.column_mapper();
        let dialect = session.dialect();
        let table = define.table_name(mapper);
        let column = define.column_name(field, mapper);

        let q = sql::count_positions(dialect, &table, &column, src, dst);
        let found = fetch_count(session, &q, Stage::Count, &define.name).await?;
        if found != 2 {
            return Err(DbopError::ObjectNotExists);
        }

        let q = sql::move_show_index(dialect, &table, &column, src, dst);
        let affected = execute(session, &q, Stage::UpdateShowIndex, &define.name).await?;
        Ok(Affected::new(affected))
    }
}
