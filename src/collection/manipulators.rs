//! Add, set and remove

use super::Collection;
use crate::model::{Hash, Value};
use crate::trie::{Node, NodeId};
use crate::{Error, Result};
use tracing::trace;

impl Collection {
    /// Insert a new key with one value per field
    ///
    /// # Panics
    ///
    /// Panics if `values` does not hold exactly one value per field.
    pub fn add(&mut self, key: &[u8], values: Vec<Value>) -> Result<()> {
        let encoded = self.fields.encode(&values)?;
        self.insert(key, encoded)
    }

    /// Replace the values of an existing key. `Value::Same` keeps a field's
    /// current value.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not hold exactly one value per field.
    pub fn set(&mut self, key: &[u8], values: Vec<Value>) -> Result<()> {
        self.fields.check_arity(values.len());
        let trail = self.locate(key)?;
        let leaf = trail[trail.len() - 1];

        let mut encoded = Vec::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            if value.is_same() {
                encoded.push(self.arena[leaf].values[index].clone());
            } else {
                encoded.push(self.fields[index].encode(value)?);
            }
        }

        trace!(target: "collection", key = %hex::encode(key), "set");
        for &id in &trail {
            self.touch(id);
        }
        self.arena[leaf].values = encoded;
        self.settle();
        Ok(())
    }

    /// Replace a single field of an existing key
    ///
    /// # Panics
    ///
    /// Panics if `field` is not a valid field index.
    pub fn set_field(&mut self, key: &[u8], field: usize, value: Value) -> Result<()> {
        assert!(
            field < self.fields.len(),
            "field index {} out of range: collection has {} fields",
            field,
            self.fields.len()
        );
        let mut values = vec![Value::Same; self.fields.len()];
        values[field] = value;
        self.set(key, values)
    }

    /// Remove a key. Ancestors left holding a single leaf collapse into it,
    /// so the shape of the trie depends only on its content.
    pub fn remove(&mut self, key: &[u8]) -> Result<()> {
        let trail = self.locate(key)?;
        let collapses = self.collapse_depth(&trail)?;

        trace!(target: "collection", key = %hex::encode(key), collapses, "remove");
        for &id in &trail {
            self.touch(id);
        }

        let leaf = trail[trail.len() - 1];
        let placeholders = self.fields.placeholders();
        let node = &mut self.arena[leaf];
        node.key.clear();
        node.values = placeholders;

        for &parent in trail.iter().rev().skip(1).take(collapses) {
            self.collapse(parent);
        }

        self.settle();
        Ok(())
    }

    /// Insert already-encoded values
    pub(crate) fn insert(&mut self, key: &[u8], values: Vec<Vec<u8>>) -> Result<()> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        let path = Hash::path(key);
        let trail = self.descend(&path)?;
        let depth = trail.len() - 1;
        let terminal = trail[depth];

        if self.arena[terminal].key == key {
            return Err(Error::KeyCollision);
        }

        trace!(target: "collection", key = %hex::encode(key), depth, "add");
        for &id in &trail {
            self.touch(id);
        }

        if self.arena[terminal].is_placeholder() {
            let node = &mut self.arena[terminal];
            node.key = key.to_vec();
            node.values = values;
        } else {
            self.split(terminal, depth, key.to_vec(), values, &path);
        }

        self.settle();
        Ok(())
    }

    /// Turn the leaf `id` at `depth` into an internal node holding both its
    /// former content and the new leaf, chaining internal nodes while the
    /// two paths agree
    fn split(&mut self, id: NodeId, mut depth: usize, key: Vec<u8>, values: Vec<Vec<u8>>, path: &Hash) {
        let existing_key = std::mem::take(&mut self.arena[id].key);
        let existing_values = std::mem::take(&mut self.arena[id].values);
        let existing_path = Hash::path(&existing_key);

        let mut cursor = id;
        loop {
            assert!(
                depth < Hash::BITS,
                "distinct keys share a full {}-bit path",
                Hash::BITS
            );

            let children = self.branch(cursor);
            let existing_bit = existing_path.bit(depth);
            let new_bit = path.bit(depth);

            if existing_bit != new_bit {
                self.arena[children.side(existing_bit)] = Node::leaf(existing_key, existing_values);
                self.arena[children.side(new_bit)] = Node::leaf(key, values);
                return;
            }

            cursor = children.side(new_bit);
            self.arena[cursor].inconsistent = true;
            depth += 1;
        }
    }

    /// How many ancestors of the removed leaf collapse. Fails if deciding
    /// requires a sibling that is not known.
    fn collapse_depth(&self, trail: &[NodeId]) -> Result<usize> {
        let mut current_empty = true;
        let mut collapses = 0;

        // the root never collapses
        for window in trail.windows(2).skip(1).rev() {
            let (parent, child) = (window[0], window[1]);
            let children = self.arena[parent].children.ok_or(Error::UnknownSubtree)?;
            let sibling = &self.arena[children.sibling(children.right == child)];

            if !sibling.known {
                return Err(Error::UnknownSubtree);
            }
            if sibling.is_internal() || (!current_empty && !sibling.is_placeholder()) {
                break;
            }

            collapses += 1;
            current_empty = current_empty && sibling.is_placeholder();
        }

        Ok(collapses)
    }

    /// Replace an internal node whose children are a placeholder and a leaf
    /// (or two placeholders) by that leaf
    fn collapse(&mut self, parent: NodeId) {
        let Some(children) = self.arena[parent].children else {
            return;
        };
        let survivor = if self.arena[children.left].is_placeholder() {
            children.right
        } else {
            children.left
        };

        let key = self.arena[survivor].key.clone();
        let values = self.arena[survivor].values.clone();
        let node = &mut self.arena[parent];
        node.children = None;
        node.key = key;
        node.values = values;

        self.detach(children.left);
        self.detach(children.right);
    }
}
