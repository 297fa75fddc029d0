//! Opaque byte values

use super::{FieldKind, Navigation};
use crate::model::Value;
use crate::{Error, Result};

/// Identity-encoded bytes with no aggregation and no navigation
#[derive(Clone, Copy, Debug, Default)]
pub struct Data;

impl FieldKind for Data {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        match value {
            Value::Bytes(bytes) => Ok(bytes.clone()),
            other => Err(Error::InvalidEncoding(format!(
                "data field expects bytes, got {}",
                other.kind()
            ))),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        Ok(Value::Bytes(bytes.to_vec()))
    }

    fn placeholder(&self) -> Vec<u8> {
        Vec::new()
    }

    fn parent(&self, _left: &[u8], _right: &[u8]) -> Vec<u8> {
        Vec::new()
    }

    fn navigate(
        &self,
        _query: &[u8],
        _parent: &[u8],
        _left: &[u8],
        _right: &[u8],
    ) -> Result<Navigation> {
        Err(Error::NotNavigable)
    }
}
