//! Filter-setting directives.
//!
//! Each field may carry a setting string of `|`-separated directives, each `kind:arg1,arg2`:
//! `like:%,%`, `table:u`, `expr:$+1`, `or:Name,Email`. The pseudo-field `:table:` overrides
//! the main table of a list query.

use std::collections::HashMap;

/// Per-field filter settings as supplied by the caller.
pub type QuerySettings = HashMap<String, String>;

/// Pseudo-field whose `table:` directive replaces the main table.
pub const TABLE_OVERRIDE_KEY: &str = ":table:";

/// Wildcard accepted as a `like` prefix or suffix.
const WILDCARD: &str = "%";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryKind {
    Like,
    Table,
    Expr,
    Or,
    /// Unknown directives are kept but have no effect.
    Other(String),
}

impl QueryKind {
    fn parse(s: &str) -> Self {
        match s {
            "like" => QueryKind::Like,
            "table" => QueryKind::Table,
            "expr" => QueryKind::Expr,
            "or" => QueryKind::Or,
            other => QueryKind::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryDefine {
    pub kind: QueryKind,
    pub args: Vec<String>,
}

impl QueryDefine {
    fn arg(&self, i: usize) -> &str {
        self.args.get(i).map(String::as_str).unwrap_or("")
    }
}

/// Parse one setting string into its directives, normalizing arguments per kind.
fn parse_setting(setting: &str) -> Vec<QueryDefine> {
    let mut defines = Vec::new();
    for item in setting.split('|') {
        let (kind, raw_args) = match item.split_once(':') {
            Some((k, a)) => (k, Some(a)),
            None => (item, None),
        };
        let kind = QueryKind::parse(kind);
        let mut args: Vec<String> = raw_args
            .map(|a| a.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        match kind {
            QueryKind::Like => {
                let valid = args.len() == 2 && args.iter().all(|a| a.is_empty() || a == WILDCARD);
                if !valid {
                    args = vec![String::new(), WILDCARD.to_string()];
                }
            }
            QueryKind::Table => {
                if args.len() != 1 || args[0].is_empty() {
                    continue;
                }
            }
            QueryKind::Expr => match raw_args {
                Some(raw) if !raw.is_empty() => args = vec![raw.to_string()],
                _ => continue,
            },
            QueryKind::Or | QueryKind::Other(_) => {}
        }
        defines.push(QueryDefine { kind, args });
    }
    defines
}

/// Parsed settings for every field of one operation call.
#[derive(Clone, Debug, Default)]
pub struct QueryDefines {
    by_field: HashMap<String, Vec<QueryDefine>>,
}

impl QueryDefines {
    pub fn for_field(&self, field: &str) -> &[QueryDefine] {
        self.by_field.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn find(&self, field: &str, kind: &QueryKind) -> Option<&QueryDefine> {
        self.for_field(field).iter().find(|d| d.kind == *kind)
    }

    /// `(prefix, suffix)` of the last `like` directive on the field.
    pub fn like(&self, field: &str) -> Option<(&str, &str)> {
        self.for_field(field)
            .iter()
            .rev()
            .find(|d| d.kind == QueryKind::Like)
            .map(|d| (d.arg(0), d.arg(1)))
    }

    /// Table or alias the field's column is qualified with.
    pub fn table(&self, field: &str) -> Option<&str> {
        self.find(field, &QueryKind::Table).map(|d| d.arg(0))
    }

    /// Raw expression, with `$` marking where the parameter value goes.
    pub fn expr(&self, field: &str) -> Option<&str> {
        self.find(field, &QueryKind::Expr).map(|d| d.arg(0))
    }

    /// Main-table override from the `:table:` pseudo-field.
    pub fn table_override(&self) -> Option<&str> {
        self.table(TABLE_OVERRIDE_KEY)
    }

    /// `or` groups declared on fields, as `(source field, group members)`, sorted by source
    /// field so that clause order is stable across calls.
    pub fn or_groups(&self) -> Vec<(&str, &[String])> {
        let mut groups: Vec<(&str, &[String])> = self
            .by_field
            .iter()
            .flat_map(|(field, defs)| {
                defs.iter()
                    .filter(|d| d.kind == QueryKind::Or)
                    .map(move |d| (field.as_str(), d.args.as_slice()))
            })
            .collect();
        groups.sort_by(|a, b| a.0.cmp(b.0));
        groups
    }
}

/// Parse a settings map. Fields without any surviving directive map to an empty list.
pub fn parse_query_settings(settings: &QuerySettings) -> QueryDefines {
    QueryDefines {
        by_field: settings
            .iter()
            .map(|(field, setting)| (field.clone(), parse_setting(setting)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> QuerySettings {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn like_falls_back_to_suffix_wildcard() {
        let d = parse_query_settings(&settings(&[("A", "like:%,%"), ("B", "like:x,%"), ("C", "like"), ("D", "like:%")]));
        assert_eq!(d.like("A"), Some(("%", "%")));
        assert_eq!(d.like("B"), Some(("", "%")));
        assert_eq!(d.like("C"), Some(("", "%")));
        assert_eq!(d.like("D"), Some(("", "%")));
        assert_eq!(d.like("E"), None);
    }

    #[test]
    fn table_without_name_is_dropped() {
        let d = parse_query_settings(&settings(&[("A", "table:u"), ("B", "table"), ("C", "table:a,b"), (":table:", "table:users_v2")]));
        assert_eq!(d.table("A"), Some("u"));
        assert!(d.for_field("B").is_empty());
        assert!(d.for_field("C").is_empty());
        assert_eq!(d.table_override(), Some("users_v2"));
    }

    #[test]
    fn expr_keeps_commas() {
        let d = parse_query_settings(&settings(&[("A", "expr:CONCAT(name, '$')"), ("B", "expr"), ("C", "expr:$+1|table:t")]));
        assert_eq!(d.expr("A"), Some("CONCAT(name, '$')"));
        assert_eq!(d.expr("B"), None);
        assert_eq!(d.expr("C"), Some("$+1"));
        assert_eq!(d.table("C"), Some("t"));
    }

    #[test]
    fn or_groups_and_unknown_kinds() {
        let d = parse_query_settings(&settings(&[("Keyword", "or:Name,Email|like:%,%"), ("X", "sort:desc")]));
        let groups = d.or_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "Keyword");
        assert_eq!(groups[0].1, &["Name".to_string(), "Email".to_string()]);
        assert_eq!(d.for_field("X")[0].kind, QueryKind::Other("sort".into()));
    }
}
