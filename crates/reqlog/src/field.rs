//! Typed key/value fields attached to a request record

use bytes::Bytes;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

/// Value carried by a [`Field`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// UTF-8 text
    Str(String),
    /// Signed integer
    Int(i64),
    /// Elapsed time
    Duration(Duration),
    /// Raw bytes, rendered as (lossy) UTF-8 by the sinks
    Bytes(Bytes),
}

impl FieldValue {
    /// Get the value as a string slice, if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is one
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the value as a duration, if it is one
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{}", n),
            Self::Duration(d) => write!(f, "{:?}", d),
            Self::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Int(n) => serializer.serialize_i64(*n),
            // Seconds as a float, the usual encoding for JSON log lines
            Self::Duration(d) => serializer.serialize_f64(d.as_secs_f64()),
            Self::Bytes(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
        }
    }
}

/// One structured key/value unit of a request record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    key: Cow<'static, str>,
    value: FieldValue,
}

impl Field {
    /// Create a field from a key and an already-typed value
    pub fn new(key: impl Into<Cow<'static, str>>, value: FieldValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Create a text field
    pub fn string(key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self::new(key, FieldValue::Str(value.into()))
    }

    /// Create an integer field
    pub fn int(key: impl Into<Cow<'static, str>>, value: i64) -> Self {
        Self::new(key, FieldValue::Int(value))
    }

    /// Create a duration field
    pub fn duration(key: impl Into<Cow<'static, str>>, value: Duration) -> Self {
        Self::new(key, FieldValue::Duration(value))
    }

    /// Create a raw byte field
    pub fn bytes(key: impl Into<Cow<'static, str>>, value: impl Into<Bytes>) -> Self {
        Self::new(key, FieldValue::Bytes(value.into()))
    }

    /// Field key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Field value
    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

/// Renders a field slice as logfmt (`key=value key2="value with spaces"`)
pub(crate) struct Logfmt<'a>(pub(crate) &'a [Field]);

impl fmt::Display for Logfmt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let value = field.value.to_string();
            if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '"' || c == '=')
            {
                write!(f, "{}={:?}", field.key, value)?;
            } else {
                write!(f, "{}={}", field.key, value)?;
            }
        }
        Ok(())
    }
}
