//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE, show-index and savepoint statements.
//!
//! Statements are assembled with `?` marks and rendered for the target dialect once complete.

use crate::error::DbopError;
use crate::sql::condition::Condition;
use crate::sql::dialect::Dialect;
use crate::sql::params::BindValue;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: BindValue) {
        self.params.push(v);
    }

    fn push_where(&mut self, filter: Option<&Condition>) {
        if let Some(c) = filter {
            self.sql.push_str(" WHERE ");
            self.sql.push_str(&c.clause);
            self.params.extend(c.args.iter().cloned());
        }
    }

    fn finish(mut self, dialect: Dialect) -> Self {
        self.sql = dialect.render(&self.sql);
        self
    }
}

/// Value assigned to a column by INSERT or UPDATE.
#[derive(Clone, Debug, PartialEq)]
pub enum SetValue {
    Bind(BindValue),
    /// Raw SQL expression, evaluated by the database.
    Expr(String),
}

fn join_as_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\S+)\s+(?i:as)\s+(\S+)\s*$").expect("valid regex"))
}

fn join_operator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]+(\s+[A-Za-z]+)*$").expect("valid regex"))
}

/// One explicit join: `(operator, table or "table AS alias", condition)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinCond {
    pub operator: String,
    pub table: String,
    pub alias: Option<String>,
    pub condition: String,
}

impl JoinCond {
    pub fn parse(raw: &[String]) -> Result<Self, DbopError> {
        let [operator, table, condition] = raw else {
            return Err(DbopError::WrongJoinCond);
        };
        if !join_operator_re().is_match(operator.trim()) {
            return Err(DbopError::WrongJoinCond);
        }
        let (table, alias) = match join_as_re().captures(table) {
            Some(caps) => (caps[1].to_string(), Some(caps[2].to_string())),
            None => (table.trim().to_string(), None),
        };
        if table.is_empty() {
            return Err(DbopError::WrongJoinCond);
        }
        Ok(JoinCond {
            operator: operator.trim().to_uppercase(),
            table,
            alias,
            condition: condition.clone(),
        })
    }

    fn render(&self, dialect: Dialect) -> String {
        let target = match &self.alias {
            Some(alias) => format!("{} AS {}", dialect.quote(&self.table), dialect.quote(alias)),
            None => dialect.quote(&self.table),
        };
        format!("{} JOIN {} ON {}", self.operator, target, self.condition)
    }
}

/// Parse caller-supplied join triples; any malformed entry fails the whole list.
pub fn parse_joins(raw: &[Vec<String>]) -> Result<Vec<JoinCond>, DbopError> {
    raw.iter().map(|j| JoinCond::parse(j)).collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    /// Rendered column reference.
    pub column: String,
    pub desc: bool,
}

/// Inputs of a SELECT. `columns` are rendered select expressions.
pub struct SelectSpec<'a> {
    pub table: &'a str,
    pub columns: &'a [String],
    pub joins: &'a [JoinCond],
    pub filter: Option<&'a Condition>,
    pub order: &'a [OrderBy],
    /// `(limit, offset)`
    pub limit: Option<(u64, u64)>,
}

fn push_from(q: &mut QueryBuf, dialect: Dialect, table: &str, joins: &[JoinCond]) {
    q.sql.push_str(" FROM ");
    q.sql.push_str(&dialect.quote(table));
    for j in joins {
        q.sql.push(' ');
        q.sql.push_str(&j.render(dialect));
    }
}

pub fn select(dialect: Dialect, spec: &SelectSpec<'_>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = if spec.columns.is_empty() {
        "*".to_string()
    } else {
        spec.columns.join(", ")
    };
    q.sql = format!("SELECT {}", cols);
    push_from(&mut q, dialect, spec.table, spec.joins);
    q.push_where(spec.filter);
    if !spec.order.is_empty() {
        let order: Vec<String> = spec
            .order
            .iter()
            .map(|o| format!("{} {}", o.column, if o.desc { "DESC" } else { "ASC" }))
            .collect();
        q.sql.push_str(" ORDER BY ");
        q.sql.push_str(&order.join(", "));
    }
    if let Some((limit, offset)) = spec.limit {
        q.sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
    }
    q.finish(dialect)
}

pub fn count(dialect: Dialect, table: &str, joins: &[JoinCond], filter: Option<&Condition>) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = "SELECT COUNT(*)".to_string();
    push_from(&mut q, dialect, table, joins);
    q.push_where(filter);
    q.finish(dialect)
}

/// INSERT with columns in the given order. Expression columns take their raw SQL in the
/// VALUES position.
pub fn insert(dialect: Dialect, table: &str, columns: &[(String, SetValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = dialect.quote(table);
    if columns.is_empty() {
        q.sql = match dialect {
            Dialect::MySql => format!("INSERT INTO {} () VALUES ()", table),
            Dialect::Postgres | Dialect::Sqlite => format!("INSERT INTO {} DEFAULT VALUES", table),
        };
        return q;
    }
    let mut names = Vec::with_capacity(columns.len());
    let mut values = Vec::with_capacity(columns.len());
    for (col, v) in columns {
        names.push(dialect.quote(col));
        match v {
            SetValue::Bind(b) => {
                q.push_param(b.clone());
                values.push("?".to_string());
            }
            SetValue::Expr(e) => values.push(e.clone()),
        }
    }
    q.sql = format!("INSERT INTO {} ({}) VALUES ({})", table, names.join(", "), values.join(", "));
    q.finish(dialect)
}

fn key_condition(dialect: Dialect, key: &[(String, BindValue)]) -> Condition {
    let clause = key
        .iter()
        .map(|(col, _)| format!("{} = ?", dialect.quote(col)))
        .collect::<Vec<_>>()
        .join(" AND ");
    Condition::new(clause, key.iter().map(|(_, v)| v.clone()).collect())
}

fn push_sets(q: &mut QueryBuf, dialect: Dialect, sets: &[(String, SetValue)]) {
    let parts: Vec<String> = sets
        .iter()
        .map(|(col, v)| match v {
            SetValue::Bind(b) => {
                q.push_param(b.clone());
                format!("{} = ?", dialect.quote(col))
            }
            SetValue::Expr(e) => format!("{} = {}", dialect.quote(col), e),
        })
        .collect();
    q.sql.push_str(&parts.join(", "));
}

/// UPDATE by primary key.
pub fn update(dialect: Dialect, table: &str, sets: &[(String, SetValue)], key: &[(String, BindValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("UPDATE {} SET ", dialect.quote(table));
    push_sets(&mut q, dialect, sets);
    q.push_where(Some(&key_condition(dialect, key)));
    q.finish(dialect)
}

/// DELETE by primary key.
pub fn delete(dialect: Dialect, table: &str, key: &[(String, BindValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("DELETE FROM {}", dialect.quote(table));
    q.push_where(Some(&key_condition(dialect, key)));
    q.finish(dialect)
}

/// Shift every row's display index down by one, making room at the front.
pub fn shift_show_index(dialect: Dialect, table: &str, column: &str) -> QueryBuf {
    let col = dialect.quote(column);
    QueryBuf {
        sql: format!("UPDATE {} SET {} = {} + 1", dialect.quote(table), col, col),
        params: Vec::new(),
    }
}

/// Set one row's display index.
pub fn set_show_index(dialect: Dialect, table: &str, column: &str, value: BindValue, key: &[(String, BindValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("UPDATE {} SET {} = ?", dialect.quote(table), dialect.quote(column));
    q.push_param(value);
    q.push_where(Some(&key_condition(dialect, key)));
    q.finish(dialect)
}

/// Count rows sitting at either of two display positions.
pub fn count_positions(dialect: Dialect, table: &str, column: &str, a: u32, b: u32) -> QueryBuf {
    let filter = Condition::new(
        format!("{} IN (?, ?)", dialect.quote(column)),
        vec![BindValue::from(a), BindValue::from(b)],
    );
    count(dialect, table, &[], Some(&filter))
}

/// Move the row at `src` to `dst`, shifting every row in between by one toward `src`.
pub fn move_show_index(dialect: Dialect, table: &str, column: &str, src: u32, dst: u32) -> QueryBuf {
    let col = dialect.quote(column);
    let (shift, from, to) = if dst < src { ("+ 1", dst, src) } else { ("- 1", src, dst) };
    let value = dialect.if_expr(&format!("{} = ?", col), "?", &format!("{} {}", col, shift));

    let mut q = QueryBuf::new();
    q.sql = format!(
        "UPDATE {} SET {col} = {} WHERE {col} >= ? AND {col} <= ?",
        dialect.quote(table),
        value,
        col = col
    );
    for v in [src, dst, from, to] {
        q.push_param(BindValue::from(v));
    }
    q.finish(dialect)
}

fn savepoint_statement(dialect: Dialect, verb: &str, name: &str) -> QueryBuf {
    QueryBuf {
        sql: format!("{} {}", verb, dialect.quote(name)),
        params: Vec::new(),
    }
}

/// Mark a point inside the open transaction that a failed statement can fall back to.
pub fn savepoint(dialect: Dialect, name: &str) -> QueryBuf {
    savepoint_statement(dialect, "SAVEPOINT", name)
}

/// Undo everything since the savepoint, keeping the transaction usable.
pub fn rollback_to_savepoint(dialect: Dialect, name: &str) -> QueryBuf {
    savepoint_statement(dialect, "ROLLBACK TO SAVEPOINT", name)
}

pub fn release_savepoint(dialect: Dialect, name: &str) -> QueryBuf {
    savepoint_statement(dialect, "RELEASE SAVEPOINT", name)
}
