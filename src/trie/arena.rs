//! Index-addressed node storage

use super::node::{label, Children, Node};
use super::NodeId;
use crate::field::Fields;
use crate::model::Hash;
use std::ops::{Index, IndexMut};

/// Owns every node of one trie. Parents refer to children by index; nothing
/// points upwards.
#[derive(Clone, Debug, Default)]
pub struct Arena {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Return a slot to the free list
    pub fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            if slot.take().is_some() {
                self.free.push(id);
            }
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Give a leaf two placeholder children
    pub fn branch(&mut self, id: NodeId, fields: &Fields) -> Children {
        let left = self.alloc(Node::placeholder(fields));
        let right = self.alloc(Node::placeholder(fields));
        let children = Children { left, right };
        self[id].children = Some(children);
        children
    }

    /// Every node strictly below `id`, parents before children
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        if let Some(children) = self[id].children {
            stack.push(children.right);
            stack.push(children.left);
        }
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(children) = self[next].children {
                stack.push(children.right);
                stack.push(children.left);
            }
        }
        out
    }

    /// Recompute the aggregated values and label of `id` from its current
    /// content and its children's current labels
    pub fn refresh(&mut self, id: NodeId, fields: &Fields) {
        match self[id].children {
            Some(Children { left, right }) => {
                debug_assert_eq!(self[left].values.len(), fields.len());
                debug_assert_eq!(self[right].values.len(), fields.len());
                let values = fields.parents(&self[left].values, &self[right].values);
                let (left, right) = (self[left].label, self[right].label);
                let node = &mut self[id];
                node.label = label(false, &[], &values, &left, &right);
                node.values = values;
            }
            None => self[id].relabel_leaf(),
        }
    }

    /// Label of the left and right child of an internal node
    pub fn child_labels(&self, id: NodeId) -> Option<(Hash, Hash)> {
        self[id]
            .children
            .map(|children| (self[children.left].label, self[children.right].label))
    }
}

impl Index<NodeId> for Arena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.slots[id.0].as_ref().expect("dangling node id")
    }
}

impl IndexMut<NodeId> for Arena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.0].as_mut().expect("dangling node id")
    }
}
