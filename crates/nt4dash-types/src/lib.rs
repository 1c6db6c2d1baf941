//! `nt4dash-types` – shared vocabulary for the dashboard workspace.
//!
//! Holds the error taxonomy every crate reports through and the
//! [`BridgeValue`] produced when the DOM bridge decodes an attribute the
//! telemetry module wrote.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Global error type spanning asset lookup, module start-up, and bridge
/// decoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DashError {
    /// Any filesystem read failure while resolving an asset.  The detail is
    /// for server-side logs only and never reaches the HTTP client.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Bind error on {addr}: {details}")]
    Bind { addr: String, details: String },

    #[error("I/O error: {0}")]
    Io(String),

    /// The compiled module could not be fetched, validated, or instantiated,
    /// or its start entry point rejected.
    #[error("Module initialization failed: {0}")]
    ModuleInit(String),

    #[error("Module fetch failed: {0}")]
    Fetch(String),

    /// An attribute value written by the module was not valid JSON.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for DashError {
    fn from(e: std::io::Error) -> Self {
        DashError::Io(e.to_string())
    }
}

/// A JSON value decoded from a DOM attribute, split into the shapes page
/// logic actually branches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum BridgeValue {
    /// JSON `null`, also produced when the attribute was removed.
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Arrays and objects are kept as parsed JSON.
    Structured(Value),
}

impl BridgeValue {
    /// Decode attribute text as JSON.
    ///
    /// `None` models an absent attribute and decodes to [`BridgeValue::Null`].
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Decode`] when `text` is not valid JSON.
    pub fn decode(text: Option<&str>) -> Result<Self, DashError> {
        let Some(text) = text else {
            return Ok(BridgeValue::Null);
        };
        let value: Value =
            serde_json::from_str(text).map_err(|e| DashError::Decode(format!("{text:?}: {e}")))?;
        Ok(Self::from(value))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BridgeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BridgeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BridgeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BridgeValue::Null)
    }
}

impl From<Value> for BridgeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => BridgeValue::Null,
            Value::Bool(b) => BridgeValue::Bool(b),
            // Every JSON number fits an f64, possibly with precision loss
            // for very large integers.
            Value::Number(n) => BridgeValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => BridgeValue::Text(s),
            structured @ (Value::Array(_) | Value::Object(_)) => BridgeValue::Structured(structured),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_number() {
        let v = BridgeValue::decode(Some("42")).unwrap();
        assert_eq!(v, BridgeValue::Number(42.0));
        assert_eq!(v.as_f64(), Some(42.0));
    }

    #[test]
    fn decode_string_and_bool() {
        assert_eq!(
            BridgeValue::decode(Some("\"auto\"")).unwrap().as_str(),
            Some("auto")
        );
        assert_eq!(BridgeValue::decode(Some("true")).unwrap().as_bool(), Some(true));
    }

    #[test]
    fn decode_structured_keeps_json() {
        let v = BridgeValue::decode(Some("[1.5, 2.5]")).unwrap();
        match v {
            BridgeValue::Structured(Value::Array(items)) => assert_eq!(items.len(), 2),
            other => panic!("expected structured array, got {other:?}"),
        }
    }

    #[test]
    fn absent_attribute_decodes_to_null() {
        assert!(BridgeValue::decode(None).unwrap().is_null());
        assert!(BridgeValue::decode(Some("null")).unwrap().is_null());
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = BridgeValue::decode(Some("{not json")).unwrap_err();
        assert!(matches!(err, DashError::Decode(_)));
        assert!(err.to_string().contains("Decode error"));
    }

    #[test]
    fn dash_error_display() {
        let err = DashError::Bind {
            addr: "0.0.0.0:7070".to_string(),
            details: "address in use".to_string(),
        };
        assert!(err.to_string().contains("0.0.0.0:7070"));

        let io: DashError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(io, DashError::Io(_)));
    }
}
