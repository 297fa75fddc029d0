//! Trie node types

use super::NodeId;
use crate::field::Fields;
use crate::model::Hash;
use serde::Serialize;

/// The two children of an internal node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Children {
    pub left: NodeId,
    pub right: NodeId,
}

impl Children {
    /// The child on the given side (`true` is right)
    pub fn side(&self, right: bool) -> NodeId {
        if right {
            self.right
        } else {
            self.left
        }
    }

    /// The child opposite to the given side
    pub fn sibling(&self, right: bool) -> NodeId {
        self.side(!right)
    }
}

/// A vertex of the collection trie
///
/// A known node with children is internal. A known node without children is
/// a data leaf when its key is non-empty and a placeholder otherwise. An
/// unknown node carries its label and, once pruned, its own aggregated
/// values so that its parent can still be recomputed.
#[derive(Clone, Debug)]
pub struct Node {
    pub label: Hash,
    pub known: bool,
    pub key: Vec<u8>,
    pub values: Vec<Vec<u8>>,
    pub children: Option<Children>,
    /// Label (and aggregated values) await recomputation
    pub(crate) inconsistent: bool,
    /// Content before the first mutation of the ongoing transaction
    pub(crate) backup: Option<Box<Backup>>,
}

/// Restorable node content
#[derive(Clone, Debug)]
pub struct Backup {
    label: Hash,
    known: bool,
    key: Vec<u8>,
    values: Vec<Vec<u8>>,
    children: Option<Children>,
}

#[derive(Serialize)]
struct LabelInput<'a> {
    leaf: bool,
    key: &'a [u8],
    values: &'a [Vec<u8>],
    left: &'a Hash,
    right: &'a Hash,
}

/// Compute a node label from its content and its children's labels
pub fn label(leaf: bool, key: &[u8], values: &[Vec<u8>], left: &Hash, right: &Hash) -> Hash {
    let input = LabelInput {
        leaf,
        key,
        values,
        left,
        right,
    };
    let data = bincode::serialize(&input).expect("serialization should not fail");
    Hash::digest(&data)
}

impl Node {
    /// An empty position
    pub fn placeholder(fields: &Fields) -> Self {
        Self::leaf(Vec::new(), fields.placeholders())
    }

    /// A leaf holding `key`, with its label computed
    pub fn leaf(key: Vec<u8>, values: Vec<Vec<u8>>) -> Self {
        let label = label(true, &key, &values, &Hash::ZERO, &Hash::ZERO);
        Node {
            label,
            known: true,
            key,
            values,
            children: None,
            inconsistent: false,
            backup: None,
        }
    }

    /// An opaque commitment
    pub fn unknown(label: Hash) -> Self {
        Node {
            label,
            known: false,
            key: Vec::new(),
            values: Vec::new(),
            children: None,
            inconsistent: false,
            backup: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn is_internal(&self) -> bool {
        self.children.is_some()
    }

    /// A known leaf with no key
    pub fn is_placeholder(&self) -> bool {
        self.known && self.is_leaf() && self.key.is_empty()
    }

    /// Recompute the label of a leaf
    pub fn relabel_leaf(&mut self) {
        debug_assert!(self.is_leaf());
        self.label = label(true, &self.key, &self.values, &Hash::ZERO, &Hash::ZERO);
    }

    /// Take a backup unless one exists. Returns whether one was taken.
    pub fn backup(&mut self) -> bool {
        if self.backup.is_some() {
            return false;
        }
        self.backup = Some(Box::new(Backup {
            label: self.label,
            known: self.known,
            key: self.key.clone(),
            values: self.values.clone(),
            children: self.children,
        }));
        true
    }

    /// Undo every change since the backup, if any, and clear the markers
    pub fn restore(&mut self) {
        if let Some(backup) = self.backup.take() {
            let Backup {
                label,
                known,
                key,
                values,
                children,
            } = *backup;
            self.label = label;
            self.known = known;
            self.key = key;
            self.values = values;
            self.children = children;
        }
        self.inconsistent = false;
    }

    /// Drop the backup, keeping the current content
    pub fn confirm(&mut self) {
        self.backup = None;
    }

    /// Forget the content, keeping the label and the values
    pub fn forget(&mut self) {
        self.known = false;
        self.key.clear();
        self.children = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    #[test]
    fn test_node_label_deterministic() {
        let a = Node::leaf(b"key".to_vec(), vec![b"value".to_vec()]);
        let b = Node::leaf(b"key".to_vec(), vec![b"value".to_vec()]);
        assert_eq!(a.label, b.label);
    }

    #[test]
    fn test_different_nodes_different_labels() {
        let a = Node::leaf(b"key1".to_vec(), vec![b"value".to_vec()]);
        let b = Node::leaf(b"key2".to_vec(), vec![b"value".to_vec()]);
        let c = Node::leaf(b"key1".to_vec(), vec![b"other".to_vec()]);
        assert_ne!(a.label, b.label);
        assert_ne!(a.label, c.label);
    }

    #[test]
    fn test_leaf_flag_is_hashed() {
        let values = vec![vec![1u8]];
        assert_ne!(
            label(true, &[], &values, &Hash::ZERO, &Hash::ZERO),
            label(false, &[], &values, &Hash::ZERO, &Hash::ZERO)
        );
    }

    #[test]
    fn test_placeholder() {
        let fields = Fields::new(vec![Field::Stake64, Field::Data]);
        let node = Node::placeholder(&fields);
        assert!(node.is_placeholder());
        assert_eq!(node.values, fields.placeholders());
    }

    #[test]
    fn test_backup_restore() {
        let mut node = Node::leaf(b"key".to_vec(), vec![b"v1".to_vec()]);
        let original = node.label;

        assert!(node.backup());
        node.values = vec![b"v2".to_vec()];
        node.relabel_leaf();
        assert!(!node.backup());
        node.inconsistent = true;

        node.restore();
        assert_eq!(node.label, original);
        assert_eq!(node.values, vec![b"v1".to_vec()]);
        assert!(!node.inconsistent);
        assert!(node.backup.is_none());
    }

    #[test]
    fn test_forget_keeps_label() {
        let mut node = Node::leaf(b"key".to_vec(), vec![b"v".to_vec()]);
        let label = node.label;
        node.forget();
        assert!(!node.known);
        assert!(node.key.is_empty());
        assert_eq!(node.label, label);
        assert_eq!(node.values, vec![b"v".to_vec()]);
    }
}
