//! Values that can be bound to a statement, converted from record fields and parameters.

use crate::config::FieldType;
use crate::params::{Bound, ParamValue};
use serde_json::Value;

/// A bound statement argument. The driver layer maps each variant onto a concrete bind.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
}

impl BindValue {
    /// Convert a record field value for binding. JSON objects and arrays are bound as text.
    pub fn from_json(v: &Value, type_: FieldType) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else if let Some(u) = n.as_u64() {
                    BindValue::U64(u)
                } else {
                    BindValue::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => match type_ {
                FieldType::Bool => BindValue::Bool(matches!(s.as_str(), "1" | "true")),
                _ => BindValue::String(s.clone()),
            },
            Value::Array(_) | Value::Object(_) => BindValue::String(v.to_string()),
        }
    }

    /// Convert a scalar parameter for binding. Sets and ranges are expanded by the
    /// condition builder and never reach this point as a whole.
    pub fn from_param(v: &ParamValue) -> Self {
        match v {
            ParamValue::Null => BindValue::Null,
            ParamValue::Bool(b) => BindValue::Bool(*b),
            ParamValue::Int(n) => BindValue::I64(*n),
            ParamValue::Uint(n) => BindValue::U64(*n),
            ParamValue::Float(n) => BindValue::F64(*n),
            ParamValue::String(s) => BindValue::String(s.clone()),
            ParamValue::Time(t) => BindValue::I64(t.timestamp()),
            ParamValue::Json(Value::String(s)) => BindValue::String(s.clone()),
            other => BindValue::String(other.to_string()),
        }
    }

    pub fn from_bound(b: &Bound) -> Self {
        match b {
            Bound::Int(n) => BindValue::I64(*n),
            Bound::Uint(n) => BindValue::U64(*n),
            Bound::Float(n) => BindValue::F64(*n),
            Bound::Time(t) => BindValue::I64(t.timestamp()),
        }
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        BindValue::String(s.to_string())
    }
}

impl From<i64> for BindValue {
    fn from(n: i64) -> Self {
        BindValue::I64(n)
    }
}

impl From<u32> for BindValue {
    fn from(n: u32) -> Self {
        BindValue::I64(n as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_to_bind() {
        assert_eq!(BindValue::from_json(&json!(5), FieldType::Int), BindValue::I64(5));
        assert_eq!(BindValue::from_json(&json!(u64::MAX), FieldType::Uint64), BindValue::U64(u64::MAX));
        assert_eq!(BindValue::from_json(&json!(1.5), FieldType::Float), BindValue::F64(1.5));
        assert_eq!(BindValue::from_json(&json!({"a": 1}), FieldType::Json), BindValue::String("{\"a\":1}".into()));
        assert_eq!(BindValue::from_json(&json!("true"), FieldType::Bool), BindValue::Bool(true));
    }

    #[test]
    fn param_to_bind() {
        let ip: std::net::IpAddr = "::1".parse().unwrap();
        assert_eq!(BindValue::from_param(&ParamValue::Ip(ip)), BindValue::String("::1".into()));
        assert_eq!(BindValue::from_param(&ParamValue::Uint(7)), BindValue::U64(7));
    }
}
