//! The database handle every operation runs against.

use crate::case::ColumnMapper;
use crate::sql::{Dialect, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One result row: column name to cell value, in select order.
pub type Row = Map<String, Value>;

/// A scoped database session bound to one connection for the life of a request.
///
/// Operations open a transaction only when `in_transaction()` is false, so a caller
/// can group several operations under one transaction of its own.
#[async_trait]
pub trait Session: Send {
    fn dialect(&self) -> Dialect;

    fn column_mapper(&self) -> ColumnMapper {
        ColumnMapper::Snake
    }

    /// Log statements at info instead of debug.
    fn show_sql(&self) -> bool {
        false
    }

    fn in_transaction(&self) -> bool;

    async fn begin(&mut self) -> Result<(), sqlx::Error>;

    async fn commit(&mut self) -> Result<(), sqlx::Error>;

    async fn rollback(&mut self) -> Result<(), sqlx::Error>;

    /// Run a statement, returning the affected row count.
    async fn execute(&mut self, q: &QueryBuf) -> Result<u64, sqlx::Error>;

    async fn fetch_all(&mut self, q: &QueryBuf) -> Result<Vec<Row>, sqlx::Error>;

    /// Run a `SELECT COUNT(*)` statement.
    async fn fetch_count(&mut self, q: &QueryBuf) -> Result<i64, sqlx::Error>;
}
