//! # Patient Record Intake
//!
//! The caller hands us exactly one JSON object per invocation. Its keys follow
//! whichever questionnaire convention the caller happens to use, and its values
//! are loosely typed: numbers, booleans, and numbers-as-strings all show up in
//! practice. This module turns that payload into a `RawRecord`, a small ordered
//! map from key to `Scalar`, and owns the coercion rules every later stage uses.
//!
//! - Nulls are treated as absent keys.
//! - Nested arrays and objects carry no numeric meaning and are dropped with a
//!   warning rather than rejected.
//! - Coercion never fails loudly: `Scalar::as_f64` returns `None` and callers
//!   substitute their own default.

use serde_json::Value;
use std::io::Read;
use thiserror::Error;

/// A single loosely typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    /// Numeric view of the value. Booleans map to 1/0, strings are parsed after
    /// trimming whitespace. Non-finite results are rejected.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Scalar::Number(n) => *n,
            Scalar::Bool(b) => f64::from(u8::from(*b)),
            Scalar::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    /// Integer category code, truncating toward zero the way a questionnaire
    /// code like `5.0` or `"5"` is meant.
    pub fn as_code(&self) -> Option<i64> {
        self.as_f64().map(|v| v.trunc() as i64)
    }

    fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            Value::Bool(b) => Some(Scalar::Bool(b)),
            Value::String(s) => Some(Scalar::Text(s)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// Everything that can go wrong before a record exists.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("No input data received")]
    Empty,
    #[error("Failed to read input payload: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Input payload must be a JSON object, but found {0}")]
    NotAnObject(&'static str),
}

/// One patient record as received from the caller.
///
/// Keys keep their original spelling and insertion order. Duplicate keys are
/// impossible because the JSON object has already collapsed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Vec<(String, Scalar)>,
}

impl RawRecord {
    /// Reads the whole payload from `reader` and parses it.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, InputError> {
        let mut payload = String::new();
        reader.read_to_string(&mut payload)?;
        Self::from_json_str(&payload)
    }

    pub fn from_json_str(payload: &str) -> Result<Self, InputError> {
        if payload.trim().is_empty() {
            return Err(InputError::Empty);
        }
        let value: Value = serde_json::from_str(payload)?;
        Self::from_json_value(value)
    }

    pub fn from_json_value(value: Value) -> Result<Self, InputError> {
        let object = match value {
            Value::Object(object) => object,
            Value::Array(_) => return Err(InputError::NotAnObject("an array")),
            Value::String(_) => return Err(InputError::NotAnObject("a string")),
            Value::Number(_) => return Err(InputError::NotAnObject("a number")),
            Value::Bool(_) => return Err(InputError::NotAnObject("a boolean")),
            Value::Null => return Err(InputError::NotAnObject("null")),
        };

        let mut fields = Vec::with_capacity(object.len());
        for (key, value) in object {
            let nested = matches!(value, Value::Array(_) | Value::Object(_));
            match Scalar::from_json(value) {
                Some(scalar) => fields.push((key, scalar)),
                None if nested => {
                    log::warn!("Ignoring input field '{key}': nested values are not supported");
                }
                None => {}
            }
        }
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Numeric value of `key`, or `None` when absent or not coercible.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Scalar::as_f64)
    }

    /// Integer code of `key`, or `None` when absent or not coercible.
    pub fn code(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Scalar::as_code)
    }

    /// True when some key equals `lowercase_key` after lowercasing.
    pub fn has_key_ignoring_case(&self, lowercase_key: &str) -> bool {
        self.fields
            .iter()
            .any(|(name, _)| name.to_lowercase() == lowercase_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Scalar)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, Scalar)>>(iter: I) -> Self {
        let mut record = RawRecord::default();
        for (key, value) in iter {
            let key = key.into();
            match record.fields.iter_mut().find(|(name, _)| *name == key) {
                Some(slot) => slot.1 = value,
                None => record.fields.push((key, value)),
            }
        }
        record
    }
}
