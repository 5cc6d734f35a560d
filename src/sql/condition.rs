//! Turns typed parameter values into WHERE predicates with bound arguments.

use crate::params::{ParamValue, RangeValue};
use crate::sql::params::BindValue;

/// One SQL predicate with `?` marks and the arguments bound to them, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub clause: String,
    pub args: Vec<BindValue>,
}

impl Condition {
    pub fn new(clause: impl Into<String>, args: Vec<BindValue>) -> Self {
        Condition {
            clause: clause.into(),
            args,
        }
    }

    /// Predicate matching no rows. Used for empty `IN` sets.
    pub fn never() -> Self {
        Condition::new("1=0", Vec::new())
    }
}

fn in_list<T>(column: &str, items: &[T], to_bind: impl Fn(&T) -> BindValue) -> Condition {
    if items.is_empty() {
        return Condition::never();
    }
    let marks = vec!["?"; items.len()].join(", ");
    Condition::new(format!("{} IN ({})", column, marks), items.iter().map(to_bind).collect())
}

fn range(column: &str, r: &RangeValue) -> Condition {
    let left = if r.left_closed { ">=" } else { ">" };
    let right = if r.right_closed { "<=" } else { "<" };
    Condition::new(
        format!("{col} {} ? AND {col} {} ?", left, right, col = column),
        vec![BindValue::from_bound(&r.left), BindValue::from_bound(&r.right)],
    )
}

/// Build the predicate for one field. `column` is the already quoted (and possibly
/// table-qualified) column reference; `like` is the field's `(prefix, suffix)` directive.
///
/// A null value yields `IS NULL`. `Params` lookups skip nulls, so list filtering never
/// produces one; the arm is for callers composing their own conditions.
pub fn build_condition(column: &str, value: &ParamValue, like: Option<(&str, &str)>) -> Condition {
    match value {
        ParamValue::StringSet(v) => in_list(column, v, |s| BindValue::String(s.clone())),
        ParamValue::IntSet(v) => in_list(column, v, |n| BindValue::I64(*n)),
        ParamValue::UintSet(v) => in_list(column, v, |n| BindValue::U64(*n)),
        ParamValue::Range(r) => range(column, r),
        ParamValue::Null => Condition::new(format!("{} IS NULL", column), Vec::new()),
        ParamValue::Bool(_)
        | ParamValue::Int(_)
        | ParamValue::Uint(_)
        | ParamValue::Float(_)
        | ParamValue::String(_)
        | ParamValue::Time(_)
        | ParamValue::Ip(_)
        | ParamValue::Cidr(_)
        | ParamValue::Json(_) => match like {
            Some((prefix, suffix)) => Condition::new(
                format!("{} LIKE ?", column),
                vec![BindValue::String(format!("{}{}{}", prefix, value, suffix))],
            ),
            None => Condition::new(format!("{} = ?", column), vec![BindValue::from_param(value)]),
        },
    }
}

/// Join field conditions into one WHERE predicate.
///
/// Each OR group pulls its members' conditions out of `conds` (in group order) and
/// contributes `(a OR b ...)`; a condition is consumed by the first group naming it.
/// Remaining conditions follow in their original order, all joined with `AND`.
pub fn assemble_where(mut conds: Vec<(String, Condition)>, or_groups: &[&[String]]) -> Option<Condition> {
    let mut clauses = Vec::new();
    let mut args = Vec::new();

    for group in or_groups {
        let mut sub = Vec::new();
        for member in group.iter() {
            if let Some(pos) = conds.iter().position(|(f, _)| f == member) {
                let (_, c) = conds.remove(pos);
                sub.push(c.clause);
                args.extend(c.args);
            }
        }
        if !sub.is_empty() {
            clauses.push(format!("({})", sub.join(" OR ")));
        }
    }
    for (_, c) in conds {
        clauses.push(c.clause);
        args.extend(c.args);
    }

    if clauses.is_empty() {
        None
    } else {
        Some(Condition::new(clauses.join(" AND "), args))
    }
}
