//! Case conversion for identifiers: model field names -> physical column and table names.

use serde::{Deserialize, Serialize};

/// Convert a single identifier from CamelCase or camelCase to snake_case.
/// Runs of capitals stay together: "UserID" -> "user_id", "HTTPCode" -> "http_code".
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if i > 0 && !out.ends_with('_') && (prev_lower || (prev_upper && next_lower)) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Maps model identifiers (field names, main model name) to physical names when no
/// explicit `column:` tag or table name is declared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnMapper {
    /// "UserId" -> "user_id"
    #[default]
    Snake,
    /// Identity mapping.
    Same,
}

impl ColumnMapper {
    pub fn map(&self, name: &str) -> String {
        match self {
            ColumnMapper::Snake => to_snake_case(name),
            ColumnMapper::Same => name.to_string(),
        }
    }
}

impl std::str::FromStr for ColumnMapper {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snake" => Ok(ColumnMapper::Snake),
            "same" => Ok(ColumnMapper::Same),
            _ => Err(format!("invalid column mapper: {} (expected snake or same)", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_handles_acronyms() {
        assert_eq!(to_snake_case("UserId"), "user_id");
        assert_eq!(to_snake_case("UserID"), "user_id");
        assert_eq!(to_snake_case("HTTPCode"), "http_code");
        assert_eq!(to_snake_case("ShowIndex"), "show_index");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("Ip4Addr"), "ip4_addr");
    }

    #[test]
    fn mapper_from_str() {
        assert_eq!("SNAKE".parse::<ColumnMapper>().unwrap(), ColumnMapper::Snake);
        assert_eq!(ColumnMapper::Same.map("UserId"), "UserId");
        assert!("kebab".parse::<ColumnMapper>().is_err());
    }
}
