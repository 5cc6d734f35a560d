//! Database configuration, pool setup and the sqlx-backed [`Session`].

use crate::case::ColumnMapper;
use crate::session::{Row, Session};
use crate::sql::{BindValue, Dialect, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::AnyConnection;
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Transaction};

/// Connection settings. From env: `DBOP_DATABASE_URL`, `DBOP_MAX_CONNECTIONS`,
/// `DBOP_SHOW_SQL`, `DBOP_COLUMN_MAPPER`.
#[derive(Clone, Debug)]
pub struct DbOptions {
    pub database_url: String,
    pub max_connections: u32,
    pub show_sql: bool,
    pub column_mapper: ColumnMapper,
}

impl Default for DbOptions {
    fn default() -> Self {
        DbOptions {
            database_url: "sqlite::memory:".into(),
            max_connections: 5,
            show_sql: false,
            column_mapper: ColumnMapper::Snake,
        }
    }
}

impl DbOptions {
    /// Read options from the environment, loading `.env` first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = DbOptions::default();
        DbOptions {
            database_url: std::env::var("DBOP_DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: std::env::var("DBOP_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_connections),
            show_sql: std::env::var("DBOP_SHOW_SQL")
                .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.show_sql),
            column_mapper: std::env::var("DBOP_COLUMN_MAPPER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.column_mapper),
        }
    }
}

/// A connected pool plus the options sessions are created with.
#[derive(Clone, Debug)]
pub struct Database {
    pool: AnyPool,
    dialect: Dialect,
    options: DbOptions,
}

/// Install the sqlx `Any` drivers and open a pool.
pub async fn connect(options: &DbOptions) -> Result<Database, sqlx::Error> {
    let dialect = Dialect::from_url(&options.database_url).ok_or_else(|| {
        sqlx::Error::Configuration(format!("unsupported database url: {}", options.database_url).into())
    })?;
    sqlx::any::install_default_drivers();

    let mut pool = AnyPoolOptions::new().max_connections(options.max_connections.max(1));
    // An in-memory SQLite database lives only as long as its connection.
    if options.database_url.contains(":memory:") {
        pool = pool.idle_timeout(None).max_lifetime(None);
    }
    let pool = pool.connect(&options.database_url).await?;
    tracing::info!(dialect = ?dialect, max_connections = options.max_connections, "database pool ready");
    Ok(Database {
        pool,
        dialect,
        options: options.clone(),
    })
}

impl Database {
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// A new session; its connection is acquired on first use.
    pub fn session(&self) -> SqlxSession {
        SqlxSession {
            pool: self.pool.clone(),
            conn: None,
            tx: None,
            dialect: self.dialect,
            column_mapper: self.options.column_mapper,
            show_sql: self.options.show_sql,
        }
    }
}

/// [`Session`] over an sqlx `Any` pool.
pub struct SqlxSession {
    pool: AnyPool,
    conn: Option<PoolConnection<Any>>,
    tx: Option<Transaction<'static, Any>>,
    dialect: Dialect,
    column_mapper: ColumnMapper,
    show_sql: bool,
}

impl SqlxSession {
    async fn connection(&mut self) -> Result<&mut AnyConnection, sqlx::Error> {
        if let Some(tx) = self.tx.as_mut() {
            return Ok(&mut **tx);
        }
        if self.conn.is_none() {
            self.conn = Some(self.pool.acquire().await?);
        }
        match self.conn.as_mut() {
            Some(conn) => Ok(&mut **conn),
            None => Err(sqlx::Error::PoolClosed),
        }
    }
}

fn bind_all<'q>(sql: &'q str, params: &[BindValue]) -> Query<'q, Any, AnyArguments<'q>> {
    let mut query = sqlx::query::<Any>(sql);
    for p in params {
        query = match p {
            BindValue::Null => query.bind(None::<String>),
            BindValue::Bool(b) => query.bind(*b),
            BindValue::I64(n) => query.bind(*n),
            // No unsigned 64-bit type in the Any driver.
            BindValue::U64(n) => match i64::try_from(*n) {
                Ok(n) => query.bind(n),
                Err(_) => query.bind(n.to_string()),
            },
            BindValue::F64(n) => query.bind(*n),
            BindValue::String(s) => query.bind(s.clone()),
        };
    }
    query
}

#[async_trait]
impl Session for SqlxSession {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn column_mapper(&self) -> ColumnMapper {
        self.column_mapper
    }

    fn show_sql(&self) -> bool {
        self.show_sql
    }

    fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    async fn begin(&mut self) -> Result<(), sqlx::Error> {
        // Give the plain connection back so a single-connection pool can start the transaction.
        self.conn = None;
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), sqlx::Error> {
        match self.tx.take() {
            Some(tx) => tx.commit().await,
            None => Ok(()),
        }
    }

    async fn rollback(&mut self) -> Result<(), sqlx::Error> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await,
            None => Ok(()),
        }
    }

    async fn execute(&mut self, q: &QueryBuf) -> Result<u64, sqlx::Error> {
        let conn = self.connection().await?;
        // Unbound statements take the simple-query path, which savepoint control requires on MySQL.
        let result = if q.params.is_empty() {
            sqlx::Executor::execute(conn, q.sql.as_str()).await?
        } else {
            bind_all(&q.sql, &q.params).execute(conn).await?
        };
        Ok(result.rows_affected())
    }

    async fn fetch_all(&mut self, q: &QueryBuf) -> Result<Vec<Row>, sqlx::Error> {
        let conn = self.connection().await?;
        let rows = bind_all(&q.sql, &q.params).fetch_all(conn).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_count(&mut self, q: &QueryBuf) -> Result<i64, sqlx::Error> {
        use sqlx::Row as _;
        let conn = self.connection().await?;
        let row = bind_all(&q.sql, &q.params).fetch_one(conn).await?;
        row.try_get::<i64, _>(0)
    }
}

fn row_to_json(row: &AnyRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    let mut map = Row::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &AnyRow, name: &str) -> Value {
    use sqlx::Row as _;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(bytes)) = row.try_get::<Option<Vec<u8>>, _>(name) {
        return Value::String(String::from_utf8_lossy(&bytes).into_owned());
    }
    Value::Null
}
