//! Decoded field values

use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded per-field value, as supplied to and returned from a collection
///
/// `Same` is only meaningful as input to `set`: it leaves the stored value of
/// that field untouched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Raw bytes (the `Data` field, and custom fields)
    Bytes(Vec<u8>),
    /// An unsigned 64-bit integer (the `Stake64` field)
    U64(u64),
    /// Keep the current value
    Same,
}

impl Value {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_same(&self) -> bool {
        matches!(self, Value::Same)
    }

    /// Short type name for error messages
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "bytes",
            Value::U64(_) => "u64",
            Value::Same => "same",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) if !text.is_empty() => write!(f, "Bytes({:?})", text),
                _ => write!(f, "Bytes(0x{})", hex::encode(bytes)),
            },
            Value::U64(value) => write!(f, "U64({})", value),
            Value::Same => write!(f, "Same"),
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::U64(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(bytes: &[u8; N]) -> Self {
        Value::Bytes(bytes.to_vec())
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Bytes(text.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Bytes(text.into_bytes())
    }
}
