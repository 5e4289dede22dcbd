//! Attribute values.
//!
//! The attribute universe is backend-defined, so records are maps from
//! attribute-id to a small variant type rather than fixed structs. Questionnaire
//! answers are text or numbers; the other variants exist because the
//! status/urawi merge copies whatever JSON sits at a dotted path.

use crate::error::{QsError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Structured(Value),
}

impl AttrValue {
    pub fn empty() -> Self {
        AttrValue::Text(String::new())
    }

    /// Text rendering used for token concatenation and text cells.
    pub fn as_text(&self) -> String {
        match self {
            AttrValue::Null => String::new(),
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Number(n) => n.to_string(),
            AttrValue::Text(s) => s.clone(),
            AttrValue::Structured(v) => v.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer interpretation of the value.
    ///
    /// Accepts decimal integer text (surrounding whitespace allowed), integral
    /// numbers, fractional numbers (truncated toward zero) and booleans.
    /// Everything else is an error naming `attribute`.
    pub fn as_int(&self, attribute: &str) -> Result<i64> {
        let invalid = || QsError::InvalidValue {
            attribute: attribute.to_string(),
            value: self.to_json().to_string(),
        };
        match self {
            AttrValue::Text(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
            AttrValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(i)
                } else if let Some(f) = n.as_f64() {
                    if f.is_finite() && f.abs() < i64::MAX as f64 {
                        Ok(f.trunc() as i64)
                    } else {
                        Err(invalid())
                    }
                } else {
                    Err(invalid())
                }
            }
            AttrValue::Bool(b) => Ok(i64::from(*b)),
            AttrValue::Null | AttrValue::Structured(_) => Err(invalid()),
        }
    }

    /// Truthiness: empty text, zero, `false`, `null` and empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Null => false,
            AttrValue::Bool(b) => *b,
            AttrValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
            AttrValue::Text(s) => !s.is_empty(),
            AttrValue::Structured(Value::Array(a)) => !a.is_empty(),
            AttrValue::Structured(Value::Object(o)) => !o.is_empty(),
            AttrValue::Structured(v) => AttrValue::from(v.clone()).is_truthy(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Null => Value::Null,
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Number(n) => Value::Number(n.clone()),
            AttrValue::Text(s) => Value::String(s.clone()),
            AttrValue::Structured(v) => v.clone(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(b),
            Value::Number(n) => AttrValue::Number(n),
            Value::String(s) => AttrValue::Text(s),
            other => AttrValue::Structured(other),
        }
    }
}

impl From<&Value> for AttrValue {
    fn from(value: &Value) -> Self {
        AttrValue::from(value.clone())
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Number(Number::from(value))
    }
}
