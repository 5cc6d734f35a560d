#![allow(dead_code)]

use async_trait::async_trait;
use dbop::sql::{BindValue, QueryBuf};
use dbop::{Dbop, Dialect, FieldType, ModelRegistry, ModelSchema, Row, Session};
use serde_json::{json, Value};
use std::collections::VecDeque;

/// A statement the mock was asked to run.
#[derive(Clone, Debug)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<BindValue>,
}

/// Scripted session: records every statement and answers from queues.
///
/// Empty queues answer `1` affected row, no rows, and a count of `0`. Savepoint
/// statements are recorded but never take an answer from the queue.
pub struct MockSession {
    pub dialect: Dialect,
    pub statements: Vec<Executed>,
    pub executes: VecDeque<Result<u64, sqlx::Error>>,
    pub rows: VecDeque<Vec<Row>>,
    pub counts: VecDeque<i64>,
    pub in_tx: bool,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

impl MockSession {
    pub fn new() -> Self {
        Self::with_dialect(Dialect::Sqlite)
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        MockSession {
            dialect,
            statements: Vec::new(),
            executes: VecDeque::new(),
            rows: VecDeque::new(),
            counts: VecDeque::new(),
            in_tx: false,
            begins: 0,
            commits: 0,
            rollbacks: 0,
        }
    }

    pub fn count(mut self, n: i64) -> Self {
        self.counts.push_back(n);
        self
    }

    pub fn rows(mut self, rows: Vec<Row>) -> Self {
        self.rows.push_back(rows);
        self
    }

    pub fn exec(mut self, result: Result<u64, sqlx::Error>) -> Self {
        self.executes.push_back(result);
        self
    }

    pub fn sql(&self) -> Vec<&str> {
        self.statements.iter().map(|s| s.sql.as_str()).collect()
    }

    pub fn inserts(&self) -> Vec<&Executed> {
        self.statements.iter().filter(|s| s.sql.starts_with("INSERT")).collect()
    }

    fn record(&mut self, q: &QueryBuf) {
        self.statements.push(Executed {
            sql: q.sql.clone(),
            params: q.params.clone(),
        });
    }
}

#[async_trait]
impl Session for MockSession {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn in_transaction(&self) -> bool {
        self.in_tx
    }

    async fn begin(&mut self) -> Result<(), sqlx::Error> {
        self.in_tx = true;
        self.begins += 1;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), sqlx::Error> {
        self.in_tx = false;
        self.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), sqlx::Error> {
        self.in_tx = false;
        self.rollbacks += 1;
        Ok(())
    }

    async fn execute(&mut self, q: &QueryBuf) -> Result<u64, sqlx::Error> {
        self.record(q);
        if is_savepoint(&q.sql) {
            return Ok(0);
        }
        self.executes.pop_front().unwrap_or(Ok(1))
    }

    async fn fetch_all(&mut self, q: &QueryBuf) -> Result<Vec<Row>, sqlx::Error> {
        self.record(q);
        Ok(self.rows.pop_front().unwrap_or_default())
    }

    async fn fetch_count(&mut self, q: &QueryBuf) -> Result<i64, sqlx::Error> {
        self.record(q);
        Ok(self.counts.pop_front().unwrap_or(0))
    }
}

fn is_savepoint(sql: &str) -> bool {
    ["SAVEPOINT", "ROLLBACK TO SAVEPOINT", "RELEASE SAVEPOINT"]
        .iter()
        .any(|verb| sql.starts_with(verb))
}

pub fn duplicate_key() -> sqlx::Error {
    sqlx::Error::Protocol("Duplicate entry '5' for key 'PRIMARY'".into())
}

/// Build a row from a JSON object literal.
pub fn row(v: Value) -> Row {
    match v {
        Value::Object(m) => m,
        _ => Row::new(),
    }
}

/// `n` rows of `{id, title, position}` with positions starting at `first`.
pub fn article_rows(first: i64, n: i64) -> Vec<Row> {
    (first..first + n)
        .map(|i| row(json!({"id": i, "title": format!("t{}", i), "position": i})))
        .collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("dbop=debug"))
        .with_test_writer()
        .try_init();
}

/// Models shared by the operation tests.
///
/// `Article` has a random key, an insert-mode display index and a list-hidden note.
/// `Note` is soft-deleted. `Tag` has a composite key. `Log` has no key at all.
/// `Token` has a full-width random key and no display index.
pub fn engine() -> Dbop {
    let mut registry = ModelRegistry::new();
    registry
        .register(
            ModelSchema::new("Article")
                .table("article")
                .field("Id", FieldType::Uint32, "pk rand:uint32:100-200")
                .field("Title", FieldType::String, "")
                .field("EditorNote", FieldType::String, "hidden:list")
                .field("Position", FieldType::Int, "showindex:insert")
                .field("CreatedAt", FieldType::Timestamp, "createtime")
                .field("UpdatedAt", FieldType::Timestamp, "updatetime"),
        )
        .expect("Article");
    registry
        .register(
            ModelSchema::new("Note")
                .field("Id", FieldType::Uint64, "pk")
                .field("Body", FieldType::String, "")
                .field("Secret", FieldType::String, "hidden:detail")
                .field("DeletedAt", FieldType::Timestamp, "deletetime"),
        )
        .expect("Note");
    registry
        .register(
            ModelSchema::new("Tag")
                .field("OwnerId", FieldType::Uint64, "pk")
                .field("Name", FieldType::String, "pk")
                .field("Color", FieldType::String, ""),
        )
        .expect("Tag");
    registry
        .register(
            ModelSchema::new("Log")
                .field("Message", FieldType::String, "")
                .field("Level", FieldType::String, ""),
        )
        .expect("Log");
    registry
        .register(
            ModelSchema::new("Token")
                .field("Id", FieldType::Uint64, "pk rand:uint64")
                .field("Owner", FieldType::String, ""),
        )
        .expect("Token");
    Dbop::new(registry)
}
