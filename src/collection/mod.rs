//! The authenticated collection
//!
//! A `Collection` combines a root node, an ordered list of fields, a scope
//! and transaction state. Keys are placed by the bits of their hash, so the
//! root label depends only on the key/value set, never on the order in
//! which it was built.

mod getters;
mod manipulators;
mod proof;
mod transaction;
mod update;

pub use getters::{Getter, Record};
pub use proof::{Dump, DumpBody, Proof, Step};
pub use update::{Prepared, Proxy, ReadOnly, ReadWrite, Update};

use crate::config::CollectionConfig;
use crate::field::{Field, Fields};
use crate::model::Hash;
use crate::scope::Scope;
use crate::trie::{Arena, Node, NodeId};
use crate::{Error, Result};

/// Transaction identity and the bookkeeping needed to undo one
#[derive(Clone, Debug, Default)]
struct Transaction {
    ongoing: bool,
    /// Epoch: incremented by every end and rollback
    id: u64,
    /// Nodes holding a backup
    touched: Vec<NodeId>,
    /// Nodes allocated during the transaction
    created: Vec<NodeId>,
    /// Nodes unlinked during the transaction, released on confirm
    detached: Vec<NodeId>,
}

/// A key/value collection committed to by a single root label
#[derive(Clone, Debug)]
pub struct Collection {
    arena: Arena,
    root: NodeId,
    pub(crate) fields: Fields,
    scope: Scope,
    auto_collect: bool,
    transaction: Transaction,
}

impl Collection {
    /// Create an empty, fully known collection
    pub fn new(fields: Vec<Field>) -> Self {
        let fields = Fields::new(fields);
        let mut arena = Arena::new();
        let root = arena.alloc(Node::placeholder(&fields));
        arena.branch(root, &fields);
        arena.refresh(root, &fields);

        Collection {
            arena,
            root,
            fields,
            scope: Scope::all(),
            auto_collect: true,
            transaction: Transaction::default(),
        }
    }

    /// Create a verifier: no content, only the label of an empty collection
    /// with the same fields. Proofs verified against it are absorbed.
    pub fn verifier(fields: Vec<Field>) -> Self {
        let empty = Self::new(fields);
        let label = empty.root_label();
        Self::verifier_for(empty.fields, label)
    }

    /// Create a verifier trusting `root`, e.g. a label taken from a signed
    /// block
    pub fn verifier_with_root(fields: Vec<Field>, root: Hash) -> Self {
        Self::verifier_for(Fields::new(fields), root)
    }

    fn verifier_for(fields: Fields, label: Hash) -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(Node::unknown(label));

        Collection {
            arena,
            root,
            fields,
            scope: Scope::none(),
            auto_collect: true,
            transaction: Transaction::default(),
        }
    }

    /// Create an empty collection with scope and auto-collect taken from
    /// `config`
    pub fn with_config(fields: Vec<Field>, config: &CollectionConfig) -> Result<Self> {
        let mut collection = Self::new(fields);
        collection.scope = config.scope()?;
        collection.auto_collect = config.auto_collect;
        Ok(collection)
    }

    /// The current commitment to the whole key/value set
    pub fn root_label(&self) -> Hash {
        self.arena[self.root].label
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Change the scope. Takes effect at the next collect.
    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn auto_collect(&self) -> bool {
        self.auto_collect
    }

    /// Whether mutations outside a transaction, and every end, collect
    pub fn set_auto_collect(&mut self, enabled: bool) {
        self.auto_collect = enabled;
    }

    /// The transaction epoch
    pub fn epoch(&self) -> u64 {
        self.transaction.id
    }

    pub fn is_transaction_ongoing(&self) -> bool {
        self.transaction.ongoing
    }

    /// Whether the root is materialized locally
    pub fn is_root_known(&self) -> bool {
        self.arena[self.root].known
    }

    /// Number of nodes held in memory
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    // === Internal helpers ===

    /// Descend from the root along `path` to the first leaf. Returns every
    /// visited node, root first.
    fn descend(&self, path: &Hash) -> Result<Vec<NodeId>> {
        let mut trail = Vec::new();
        let mut cursor = self.root;

        for depth in 0..=Hash::BITS {
            let node = &self.arena[cursor];
            if !node.known {
                return Err(Error::UnknownSubtree);
            }
            trail.push(cursor);

            match node.children {
                Some(children) => cursor = children.side(path.bit(depth)),
                None => return Ok(trail),
            }
        }

        unreachable!("trie deeper than the digest width")
    }

    /// Descend to the leaf holding `key`
    fn locate(&self, key: &[u8]) -> Result<Vec<NodeId>> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        let trail = self.descend(&Hash::path(key))?;
        match trail.last() {
            Some(&leaf) if self.arena[leaf].key == key => Ok(trail),
            _ => Err(Error::KeyNotFound),
        }
    }

    /// Mark a node as mutated: back it up once per transaction and defer
    /// its relabelling
    fn touch(&mut self, id: NodeId) {
        self.preserve(id);
        self.arena[id].inconsistent = true;
    }

    /// Back a node up once per transaction
    fn preserve(&mut self, id: NodeId) {
        if self.transaction.ongoing && self.arena[id].backup() {
            self.transaction.touched.push(id);
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = self.arena.alloc(node);
        if self.transaction.ongoing {
            self.transaction.created.push(id);
        }
        id
    }

    /// Give a leaf two placeholder children
    fn branch(&mut self, id: NodeId) -> crate::trie::Children {
        let children = self.arena.branch(id, &self.fields);
        if self.transaction.ongoing {
            self.transaction.created.push(children.left);
            self.transaction.created.push(children.right);
        }
        children
    }

    /// Release a node that is no longer linked. Within a transaction the
    /// release waits for confirmation, since backups may still link it.
    fn detach(&mut self, id: NodeId) {
        if self.transaction.ongoing {
            self.transaction.detached.push(id);
        } else {
            self.arena.release(id);
        }
    }

    /// Outside a transaction, bring labels up to date and apply the scope
    fn settle(&mut self) {
        if !self.transaction.ongoing {
            self.fix();
            if self.auto_collect {
                self.collect();
            }
        }
    }

    /// Pending label recomputations would make label-based reads lie
    fn assert_fixed(&self, operation: &str) {
        assert!(
            !self.arena[self.root].inconsistent,
            "{} called on a collection with unfixed changes",
            operation
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_collection_shape() {
        let collection = Collection::new(vec![Field::Stake64, Field::Data]);
        let root = &collection.arena[collection.root];
        let children = root.children.unwrap();

        assert!(root.known);
        assert!(collection.arena[children.left].is_placeholder());
        assert!(collection.arena[children.right].is_placeholder());
        assert_eq!(collection.node_count(), 3);
        assert_eq!(collection.epoch(), 0);
        assert!(!collection.is_transaction_ongoing());
    }

    #[test]
    fn test_verifier_matches_empty_root() {
        let collection = Collection::new(vec![Field::Stake64, Field::Data]);
        let verifier = Collection::verifier(vec![Field::Stake64, Field::Data]);

        assert_eq!(collection.root_label(), verifier.root_label());
        assert!(!verifier.is_root_known());
        assert_eq!(verifier.node_count(), 1);
    }

    #[test]
    fn test_fields_change_root() {
        let a = Collection::new(vec![Field::Data]);
        let b = Collection::new(vec![Field::Stake64]);
        assert_ne!(a.root_label(), b.root_label());
    }

    #[test]
    fn test_with_config() {
        let config = CollectionConfig::from_json(r#"{"auto_collect": false, "scope": "none"}"#)
            .unwrap();
        let collection = Collection::with_config(vec![Field::Data], &config).unwrap();

        assert!(!collection.auto_collect());
        assert_eq!(collection.scope(), &Scope::none());
    }
}
