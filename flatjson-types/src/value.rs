//! Typed property values.
//!
//! A Property is persisted as a type tag plus a text column. Inside the
//! process it is a [`PropertyValue`]; text only appears at the storage
//! boundary via [`PropertyValue::to_stored_text`] and the two read paths:
//! strict [`PropertyValue::parse`] for writes and lenient
//! [`PropertyValue::coerce`] for reconstructing documents.

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

/// The fixed set of type tags a Property can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
    Custom,
}

impl PropertyType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            "null" => Ok(Self::Null),
            "custom" => Ok(Self::Custom),
            other => Err(Error::UnknownPropertyType(other.to_string())),
        }
    }
}

/// A property value with its type made explicit.
///
/// `Json` holds an object or an array; which one decides the reported
/// [`PropertyType`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Number(Number),
    Bool(bool),
    Json(Value),
    Null,
    Custom(String),
}

impl PropertyValue {
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Builds a number value. Returns `None` for NaN and infinities.
    pub fn number(n: f64) -> Option<Self> {
        Number::from_f64(n).map(Self::Number)
    }

    pub fn integer(n: i64) -> Self {
        Self::Number(n.into())
    }

    pub fn bool(b: bool) -> Self {
        Self::Bool(b)
    }

    pub fn custom(s: impl Into<String>) -> Self {
        Self::Custom(s.into())
    }

    /// Wraps a JSON object or array. Scalars are mapped to their own variant.
    pub fn json(value: Value) -> Self {
        Self::from_json(&value)
    }

    /// Maps a JSON leaf (or container) onto the matching variant.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Json(value.clone()),
        }
    }

    /// The type tag this value is stored under.
    #[must_use]
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::String(_) => PropertyType::String,
            Self::Number(_) => PropertyType::Number,
            Self::Bool(_) => PropertyType::Boolean,
            Self::Json(v) if v.is_array() => PropertyType::Array,
            Self::Json(_) => PropertyType::Object,
            Self::Null => PropertyType::Null,
            Self::Custom(_) => PropertyType::Custom,
        }
    }

    /// Text form written to the `key_value` column.
    #[must_use]
    pub fn to_stored_text(&self) -> String {
        match self {
            Self::String(s) | Self::Custom(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Json(v) => v.to_string(),
            Self::Null => "null".to_string(),
        }
    }

    /// The value as it appears in a reconstructed document.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) | Self::Custom(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Bool(b) => Value::Bool(*b),
            Self::Json(v) => v.clone(),
            Self::Null => Value::Null,
        }
    }

    /// Strictly parses stored text under a type tag.
    ///
    /// Used on write paths: booleans must be `true`/`false`, numbers must be
    /// finite, and `object`/`array` text must be JSON of that kind.
    pub fn parse(property_type: PropertyType, text: &str) -> Result<Self, Error> {
        let invalid = |reason: String| Error::InvalidPropertyValue {
            property_type,
            reason,
        };
        match property_type {
            PropertyType::String => Ok(Self::String(text.to_string())),
            PropertyType::Custom => Ok(Self::Custom(text.to_string())),
            PropertyType::Null => Ok(Self::Null),
            PropertyType::Number => parse_number(text)
                .map(Self::Number)
                .ok_or_else(|| invalid(format!("{text:?} is not a finite number"))),
            PropertyType::Boolean => match text {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                other => Err(invalid(format!("{other:?} is neither true nor false"))),
            },
            PropertyType::Object => match serde_json::from_str::<Value>(text) {
                Ok(v @ Value::Object(_)) => Ok(Self::Json(v)),
                Ok(_) => Err(invalid("expected a JSON object".to_string())),
                Err(e) => Err(invalid(e.to_string())),
            },
            PropertyType::Array => match serde_json::from_str::<Value>(text) {
                Ok(v @ Value::Array(_)) => Ok(Self::Json(v)),
                Ok(_) => Err(invalid("expected a JSON array".to_string())),
                Err(e) => Err(invalid(e.to_string())),
            },
        }
    }

    /// Leniently reinterprets stored text as a document value.
    ///
    /// Booleans compare against `"true"`, and `object`/`array` accept any
    /// JSON. Returns the error when the text cannot be read as its tag so
    /// the caller can fall back to the raw string.
    pub fn coerce(property_type: PropertyType, text: &str) -> Result<Value, Error> {
        match property_type {
            PropertyType::Boolean => Ok(Value::Bool(text == "true")),
            PropertyType::Object | PropertyType::Array => {
                serde_json::from_str(text).map_err(|e| Error::InvalidPropertyValue {
                    property_type,
                    reason: e.to_string(),
                })
            }
            other => Self::parse(other, text).map(|v| v.to_json()),
        }
    }
}

/// Keeps integer text as an integer so documents survive a round trip.
fn parse_number(text: &str) -> Option<Number> {
    if let Ok(n) = serde_json::from_str::<Number>(text) {
        return Some(n);
    }
    text.trim().parse::<f64>().ok().and_then(Number::from_f64)
}
