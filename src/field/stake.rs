//! Stake-weighted values
//!
//! Internal nodes hold the total stake of their subtree, so a query drawn
//! uniformly from `[0, total)` descends to a leaf with probability
//! proportional to its stake.

use super::{FieldKind, Navigation};
use crate::model::Value;
use crate::{Error, Result};

/// An unsigned 64-bit stake, big-endian encoded
#[derive(Clone, Copy, Debug, Default)]
pub struct Stake64;

impl Stake64 {
    fn decode_u64(bytes: &[u8]) -> Result<u64> {
        let array: [u8; 8] = bytes.try_into().map_err(|_| {
            Error::InvalidEncoding(format!("stake must be 8 bytes, got {}", bytes.len()))
        })?;
        Ok(u64::from_be_bytes(array))
    }
}

impl FieldKind for Stake64 {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        match value {
            Value::U64(stake) => Ok(stake.to_be_bytes().to_vec()),
            other => Err(Error::InvalidEncoding(format!(
                "stake field expects u64, got {}",
                other.kind()
            ))),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        Self::decode_u64(bytes).map(Value::U64)
    }

    fn placeholder(&self) -> Vec<u8> {
        0u64.to_be_bytes().to_vec()
    }

    fn parent(&self, left: &[u8], right: &[u8]) -> Vec<u8> {
        let left = Self::decode_u64(left).unwrap_or_default();
        let right = Self::decode_u64(right).unwrap_or_default();
        left.wrapping_add(right).to_be_bytes().to_vec()
    }

    fn navigate(
        &self,
        query: &[u8],
        parent: &[u8],
        left: &[u8],
        _right: &[u8],
    ) -> Result<Navigation> {
        let query = Self::decode_u64(query)?;
        let parent = Self::decode_u64(parent)?;
        let left = Self::decode_u64(left)?;

        if query >= parent {
            return Err(Error::QueryOutOfRange);
        }

        if query >= left {
            Ok(Navigation::right((query - left).to_be_bytes().to_vec()))
        } else {
            Ok(Navigation::left(query.to_be_bytes().to_vec()))
        }
    }
}
