//! Already-validated request parameters, as consumed by the query engine.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

/// A network in CIDR notation, e.g. `10.0.0.0/8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cidr {
    pub addr: IpAddr,
    pub prefix: u8,
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl std::str::FromStr for Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s.split_once('/').ok_or_else(|| format!("invalid cidr: {}", s))?;
        let addr: IpAddr = addr.parse().map_err(|_| format!("invalid cidr address: {}", s))?;
        let prefix: u8 = prefix.parse().map_err(|_| format!("invalid cidr prefix: {}", s))?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(format!("cidr prefix out of range: {}", s));
        }
        Ok(Cidr { addr, prefix })
    }
}

/// Scalar bound of a range.
#[derive(Clone, Debug, PartialEq)]
pub enum Bound {
    Int(i64),
    Uint(u64),
    Float(f64),
    Time(DateTime<Utc>),
}

/// Two-sided range with explicit inclusivity on each side.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeValue {
    pub left: Bound,
    pub right: Bound,
    pub left_closed: bool,
    pub right_closed: bool,
}

impl RangeValue {
    pub fn new(left: Bound, right: Bound, left_closed: bool, right_closed: bool) -> Self {
        RangeValue {
            left,
            right,
            left_closed,
            right_closed,
        }
    }

    /// `[left, right]`
    pub fn closed(left: Bound, right: Bound) -> Self {
        Self::new(left, right, true, true)
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Int(n) => write!(f, "{}", n),
            Bound::Uint(n) => write!(f, "{}", n),
            Bound::Float(n) => write!(f, "{}", n),
            Bound::Time(t) => write!(f, "{}", t.timestamp()),
        }
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let l = if self.left_closed { '[' } else { '(' };
        let r = if self.right_closed { ']' } else { ')' };
        write!(f, "{}{},{}{}", l, self.left, self.right, r)
    }
}

/// One parsed parameter value. The condition builder matches on this exhaustively.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Time(DateTime<Utc>),
    Ip(IpAddr),
    Cidr(Cidr),
    StringSet(Vec<String>),
    IntSet(Vec<i64>),
    UintSet(Vec<u64>),
    Range(RangeValue),
    Json(Value),
}

impl ParamValue {
    /// Value as stored into a record field. Addresses become strings, sets are joined with `,`.
    /// Ranges have no column representation.
    pub fn to_field_value(&self) -> Option<Value> {
        Some(match self {
            ParamValue::Null => Value::Null,
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(n) => Value::Number((*n).into()),
            ParamValue::Uint(n) => Value::Number((*n).into()),
            ParamValue::Float(n) => serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Time(t) => Value::Number(t.timestamp().into()),
            ParamValue::Ip(ip) => Value::String(ip.to_string()),
            ParamValue::Cidr(c) => Value::String(c.to_string()),
            ParamValue::StringSet(_) | ParamValue::IntSet(_) | ParamValue::UintSet(_) => Value::String(self.to_string()),
            ParamValue::Range(_) => return None,
            ParamValue::Json(v) => v.clone(),
        })
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

/// Stringification used for `expr:` substitution.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => Ok(()),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Uint(n) => write!(f, "{}", n),
            ParamValue::Float(n) => write!(f, "{}", n),
            ParamValue::String(s) => f.write_str(s),
            ParamValue::Time(t) => write!(f, "{}", t.timestamp()),
            ParamValue::Ip(ip) => write!(f, "{}", ip),
            ParamValue::Cidr(c) => write!(f, "{}", c),
            ParamValue::StringSet(v) => f.write_str(&join(v)),
            ParamValue::IntSet(v) => f.write_str(&join(v)),
            ParamValue::UintSet(v) => f.write_str(&join(v)),
            ParamValue::Range(r) => write!(f, "{}", r),
            ParamValue::Json(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl From<$t> for ParamValue {
            fn from(v: $t) -> Self {
                ParamValue::$variant(v.into())
            }
        })*
    };
}

impl_from!(
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => Uint,
    u64 => Uint,
    f64 => Float,
    String => String,
    &str => String,
    DateTime<Utc> => Time,
    IpAddr => Ip,
    Cidr => Cidr,
    Vec<String> => StringSet,
    Vec<i64> => IntSet,
    Vec<u64> => UintSet,
    RangeValue => Range,
);

/// Parameter source: parsed values keyed by parameter name.
#[derive(Clone, Debug, Default)]
pub struct Params {
    values: HashMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Params { values: HashMap::new() }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) -> &mut Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }

    /// True when the parameter is present and not null.
    pub fn has(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(v) if *v != ParamValue::Null)
    }

    /// Present, non-null value.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name).filter(|v| **v != ParamValue::Null)
    }

    /// Integer value, or 0 when absent or not an integer.
    pub fn get_int(&self, name: &str) -> i64 {
        match self.get(name) {
            Some(ParamValue::Int(n)) => *n,
            Some(ParamValue::Uint(n)) => i64::try_from(*n).unwrap_or(i64::MAX),
            Some(ParamValue::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// String array value; a single string becomes a one-element array.
    pub fn get_string_array(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(ParamValue::StringSet(v)) => v.clone(),
            Some(ParamValue::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}
