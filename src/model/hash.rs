//! Content-addressed hash type using BLAKE3
//!
//! The same digest serves two roles: node labels (the Merkle commitment) and
//! trie paths (the hash of a caller key, read bit by bit, MSB first).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte BLAKE3 hash
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Digest width in bytes
    pub const SIZE: usize = 32;

    /// Digest width in bits, which is also the maximum trie depth
    pub const BITS: usize = Self::SIZE * 8;

    /// The zero hash (child labels of a leaf)
    pub const ZERO: Hash = Hash([0u8; 32]);

    /// Create a hash from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    /// Hash arbitrary data
    pub fn digest(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Hash(*hash.as_bytes())
    }

    /// The trie path of a caller key
    pub fn path(key: &[u8]) -> Self {
        Self::digest(key)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Mutable access to the raw bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8; 32] {
        &mut self.0
    }

    /// Read the bit at `index`, counting from the most significant bit of
    /// the first byte. `true` means "go right".
    pub fn bit(&self, index: usize) -> bool {
        bit(&self.0, index)
    }

    /// Set the bit at `index` (MSB first)
    pub fn set_bit(&mut self, index: usize, value: bool) {
        let mask = 0x80u8 >> (index % 8);
        if value {
            self.0[index / 8] |= mask;
        } else {
            self.0[index / 8] &= !mask;
        }
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Hash(arr))
    }

    /// Get a short prefix for display (first 7 chars, like git)
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    /// Check if this is the zero hash
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

/// Read bit `index` (MSB first) of a byte string. Bits past the end read as 0.
pub(crate) fn bit(bytes: &[u8], index: usize) -> bool {
    match bytes.get(index / 8) {
        Some(byte) => (byte >> (7 - index % 8)) & 1 == 1,
        None => false,
    }
}

/// Whether the first `bits` bits of `a` and `b` agree
pub(crate) fn prefix_match(a: &[u8], b: &[u8], bits: usize) -> bool {
    (0..bits).all(|index| bit(a, index) == bit(b, index))
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Hash::ZERO
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
