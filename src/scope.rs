//! Which parts of the trie stay materialized
//!
//! A scope is a predicate over path prefixes. After a collect, only nodes
//! whose path prefix agrees with the scope remain known; everything else is
//! reduced to its label.

use crate::model::{prefix_match, Hash};

/// A bit-prefix mask: the first `bits` bits of `value`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub value: Vec<u8>,
    pub bits: usize,
}

/// A union of masks, or everything, or nothing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    masks: Vec<Mask>,
    all: bool,
}

impl Scope {
    /// Keep every node
    pub fn all() -> Self {
        Scope {
            masks: Vec::new(),
            all: true,
        }
    }

    /// Keep nothing: collecting reduces the whole trie to its root label
    pub fn none() -> Self {
        Scope {
            masks: Vec::new(),
            all: false,
        }
    }

    /// Keep the subtree under the first `bits` bits of `value`.
    ///
    /// Once a mask is added, only masked prefixes are kept.
    pub fn add(&mut self, value: &[u8], bits: usize) {
        self.masks.push(Mask {
            value: value.to_vec(),
            bits: bits.min(Hash::BITS),
        });
    }

    pub fn with(mut self, value: &[u8], bits: usize) -> Self {
        self.add(value, bits);
        self
    }

    pub fn set_all(&mut self) {
        *self = Self::all();
    }

    pub fn set_none(&mut self) {
        *self = Self::none();
    }

    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    /// Whether a node at `depth` whose path starts with the first `depth`
    /// bits of `path` is kept
    pub fn matches(&self, path: &Hash, depth: usize) -> bool {
        if self.masks.is_empty() {
            return self.all;
        }
        self.masks
            .iter()
            .any(|mask| prefix_match(path.as_bytes(), &mask.value, depth.min(mask.bits)))
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::all()
    }
}
