//! Binary Merkle trie storage
//!
//! This implements the physical layer of a collection:
//! - Each node's label is derived from its content and its children's labels
//! - Nodes live in an arena and are addressed by index
//! - Unknown nodes keep only their label, so a partial trie still commits to
//!   the full key/value set

mod arena;
mod node;

pub use arena::Arena;
pub use node::{label, Backup, Children, Node};

/// Index of a node in its arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);
