// harmonia-core/src/domain/dataset/value.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell. Validated upstream, so only four shapes can reach the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
        }
    }

    /// Canonical textual form used for join keys, value rules and group matching.
    ///
    /// Integral numbers drop their fractional part so that `1.0` read from a
    /// float column matches the key `1` read from an integer column.
    /// Returns `None` for null.
    pub fn key_repr(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Text(s) => Some(s.clone()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key_repr() {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "null"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_repr_normalizes_integral_numbers() {
        assert_eq!(Value::Number(1.0).key_repr().as_deref(), Some("1"));
        assert_eq!(Value::Number(-3.0).key_repr().as_deref(), Some("-3"));
        assert_eq!(Value::Number(0.25).key_repr().as_deref(), Some("0.25"));
        assert_eq!(Value::Bool(true).key_repr().as_deref(), Some("true"));
        assert_eq!(Value::Null.key_repr(), None);
    }

    #[test]
    fn test_untagged_round_trip_from_json() -> anyhow::Result<()> {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 2.5, "female"]"#)?;
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Number(2.5),
                Value::Text("female".into())
            ]
        );
        Ok(())
    }
}
