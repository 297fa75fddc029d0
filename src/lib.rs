//! # merkle_collection
//!
//! An authenticated key/value collection backed by a binary Merkle trie.
//!
//! Keys are placed by the bits of their BLAKE3 hash, so a single root label
//! commits to the whole key/value set regardless of insertion order. The
//! collection produces inclusion and exclusion proofs, keeps only a scoped
//! part of the trie when asked to, and groups mutations into transactions
//! that can be rolled back.
//!
//! ## Core Concepts
//!
//! - **Fields**: per-key value kinds; parents aggregate their children's
//!   values (e.g. stake sums) and queries can navigate by them
//! - **Proofs**: the dumps along a key's path, checkable against a root
//! - **Scope**: which path prefixes stay materialized after a collect
//! - **Updates**: state transitions over keys declared through proofs
//!
//! ## Example
//!
//! ```
//! use merkle_collection::{Collection, Field, Value};
//!
//! let mut collection = Collection::new(vec![Field::Stake64, Field::Data]);
//! collection.add(b"a", vec![Value::U64(1), Value::from("x")])?;
//! collection.add(b"b", vec![Value::U64(2), Value::from("y")])?;
//!
//! let proof = collection.get(b"a").proof()?;
//! assert!(proof.matches());
//!
//! let mut verifier = Collection::verifier(vec![Field::Stake64, Field::Data]);
//! assert!(!verifier.verify(&proof));
//! # Ok::<(), merkle_collection::Error>(())
//! ```

pub mod collection;
pub mod config;
pub mod field;
pub mod model;
pub mod scope;
pub mod shared;
pub mod snapshot;
pub mod trie;

mod error;

pub use collection::{
    Collection, Dump, DumpBody, Getter, Prepared, Proof, Proxy, ReadOnly, ReadWrite, Record, Step,
    Update,
};
pub use config::{CollectionConfig, PrefixConfig, ScopeConfig};
pub use error::{Error, Result};
pub use field::{Direction, Field, FieldKind, Navigation};
pub use model::{Hash, Value};
pub use scope::{Mask, Scope};
pub use shared::SharedCollection;
pub use snapshot::{Snapshot, StoredRecord};
