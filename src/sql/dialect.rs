//! SQL dialects: identifier quoting, placeholder style and conditional expressions.

/// Database engine a session talks to. Statements are built with `?` marks and rendered
/// per dialect at the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    /// `$1, $2, ...` placeholders, double-quote identifiers.
    Postgres,
    /// `?` placeholders, backtick identifiers, `IF()` conditionals.
    MySql,
    /// `?` placeholders, double-quote identifiers.
    Sqlite,
}

impl Dialect {
    /// Pick the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "sqlite" => Some(Dialect::Sqlite),
            _ => None,
        }
    }

    /// Pick the dialect from a driver backend name (`AnyConnection::backend_name`).
    pub fn from_backend_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "postgresql" | "postgres" => Some(Dialect::Postgres),
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "sqlite" => Some(Dialect::Sqlite),
            _ => None,
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Postgres | Dialect::Sqlite => '"',
        }
    }

    /// Quote an identifier; dotted paths (`schema.table`) are quoted per segment.
    pub fn quote(self, ident: &str) -> String {
        let q = self.quote_char();
        ident
            .split('.')
            .map(|part| {
                let escaped = part.replace(q, &format!("{q}{q}"));
                format!("{q}{escaped}{q}")
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// `"table"."column"`
    pub fn qualify(self, table: &str, column: &str) -> String {
        format!("{}.{}", self.quote(table), self.quote(column))
    }

    /// Conditional expression: `IF(cond, a, b)` on MySQL, `CASE WHEN` elsewhere.
    pub fn if_expr(self, cond: &str, then: &str, otherwise: &str) -> String {
        match self {
            Dialect::MySql => format!("IF({}, {}, {})", cond, then, otherwise),
            Dialect::Postgres | Dialect::Sqlite => {
                format!("(CASE WHEN {} THEN {} ELSE {} END)", cond, then, otherwise)
            }
        }
    }

    /// Replace `?` marks outside quoted literals with this dialect's placeholders.
    pub fn render(self, sql: &str) -> String {
        if self != Dialect::Postgres {
            return sql.to_string();
        }
        let mut out = String::with_capacity(sql.len() + 8);
        let mut n = 0;
        let mut quote: Option<char> = None;
        for c in sql.chars() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                    out.push(c);
                }
                None => match c {
                    '\'' | '"' | '`' => {
                        quote = Some(c);
                        out.push(c);
                    }
                    '?' => {
                        n += 1;
                        out.push('$');
                        out.push_str(&n.to_string());
                    }
                    _ => out.push(c),
                },
            }
        }
        out
    }
}
