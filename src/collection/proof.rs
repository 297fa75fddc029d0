//! Inclusion and exclusion proofs
//!
//! A proof records, for every depth on the path of a key, the dumps of both
//! children. Anyone holding only a root label can re-derive every label in
//! the proof and check that the chain links back to that root.

use super::Collection;
use crate::field::Fields;
use crate::model::{Hash, Value};
use crate::trie::{label, Children, Node, NodeId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What distinguishes a leaf dump from an internal one
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpBody {
    Leaf { key: Vec<u8> },
    Internal { left: Hash, right: Hash },
}

/// Self-describing content of one node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dump {
    pub label: Hash,
    pub values: Vec<Vec<u8>>,
    pub body: DumpBody,
}

impl Dump {
    pub(crate) fn new(node: &Node, children: Option<(Hash, Hash)>) -> Self {
        let body = match children {
            Some((left, right)) => DumpBody::Internal { left, right },
            None => DumpBody::Leaf {
                key: node.key.clone(),
            },
        };
        Dump {
            label: node.label,
            values: node.values.clone(),
            body,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.body, DumpBody::Leaf { .. })
    }

    /// The key of a leaf dump; empty for a placeholder
    pub fn key(&self) -> Option<&[u8]> {
        match &self.body {
            DumpBody::Leaf { key } => Some(key),
            DumpBody::Internal { .. } => None,
        }
    }

    /// Child labels of an internal dump
    pub fn children(&self) -> Option<(Hash, Hash)> {
        match self.body {
            DumpBody::Internal { left, right } => Some((left, right)),
            DumpBody::Leaf { .. } => None,
        }
    }

    /// Whether the stored label is the label of the stored content
    pub fn consistent(&self) -> bool {
        let expected = match &self.body {
            DumpBody::Leaf { key } => label(true, key, &self.values, &Hash::ZERO, &Hash::ZERO),
            DumpBody::Internal { left, right } => label(false, &[], &self.values, left, right),
        };
        expected == self.label
    }
}

/// Both children of one node on the path
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub left: Dump,
    pub right: Dump,
}

impl Step {
    pub fn side(&self, right: bool) -> &Dump {
        if right {
            &self.right
        } else {
            &self.left
        }
    }
}

/// Evidence that a key is, or is not, part of the set committed to by a
/// root label
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proof {
    key: Vec<u8>,
    root: Dump,
    steps: Vec<Step>,
    #[serde(skip)]
    fields: Fields,
}

impl PartialEq for Proof {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.root == other.root && self.steps == other.steps
    }
}

impl Eq for Proof {}

impl Proof {
    pub(crate) fn new(key: Vec<u8>, root: Dump, steps: Vec<Step>, fields: Fields) -> Self {
        Proof {
            key,
            root,
            steps,
            fields,
        }
    }

    /// The queried key
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn root(&self) -> &Dump {
        &self.root
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The dump the path of the key ends at
    pub fn terminal(&self) -> Option<&Dump> {
        let last = self.steps.len().checked_sub(1)?;
        let path = Hash::path(&self.key);
        Some(self.steps[last].side(path.bit(last)))
    }

    /// Whether the proof shows the key present
    pub fn matches(&self) -> bool {
        self.terminal().and_then(Dump::key) == Some(self.key.as_slice())
    }

    /// The decoded values of the key
    pub fn values(&self) -> Result<Vec<Value>> {
        match self.terminal() {
            Some(dump) if self.matches() => self.fields.decode(&dump.values),
            _ => Err(Error::NoMatch),
        }
    }

    /// Check that every label matches its dump and that the dumps link up
    /// from the root to a leaf along the path of the key
    pub fn consistent(&self) -> bool {
        if self.steps.is_empty() || !self.root.consistent() {
            return false;
        }

        let path = Hash::path(&self.key);
        let mut parent = &self.root;

        for (depth, step) in self.steps.iter().enumerate() {
            let Some((left, right)) = parent.children() else {
                return false;
            };
            if step.left.label != left || step.right.label != right {
                return false;
            }
            if !step.left.consistent() || !step.right.consistent() {
                return false;
            }
            parent = step.side(path.bit(depth));
        }

        parent.is_leaf()
    }

    /// Every dump in the proof, parent before children
    fn dumps(&self) -> impl Iterator<Item = &Dump> {
        std::iter::once(&self.root).chain(self.steps.iter().flat_map(|step| [&step.left, &step.right]))
    }

    /// Values decode under `fields` and internal values aggregate their
    /// children's
    fn well_formed(&self, fields: &Fields) -> bool {
        if !self.dumps().all(|dump| fields.accepts(&dump.values)) {
            return false;
        }

        let path = Hash::path(&self.key);
        let mut parent = &self.root;
        for (depth, step) in self.steps.iter().enumerate() {
            if parent.values != fields.parents(&step.left.values, &step.right.values) {
                return false;
            }
            parent = step.side(path.bit(depth));
        }
        true
    }
}

impl Collection {
    /// Check a proof against the local root and absorb what it reveals
    /// about locally unknown nodes
    ///
    /// # Panics
    ///
    /// Panics if called mid-transaction with changes not yet relabelled.
    pub fn verify(&mut self, proof: &Proof) -> bool {
        self.assert_fixed("verify");

        if proof.root.label != self.root_label() {
            debug!(target: "collection::proof", root = %proof.root.label.short(), "proof for another root");
            return false;
        }
        if !proof.consistent() {
            debug!(target: "collection::proof", key = %hex::encode(&proof.key), "inconsistent proof");
            return false;
        }
        if !proof.well_formed(&self.fields) {
            debug!(target: "collection::proof", key = %hex::encode(&proof.key), "malformed values in proof");
            return false;
        }

        self.absorb(proof);
        true
    }

    /// Encode a proof for transfer
    pub fn serialize(&self, proof: &Proof) -> Result<Vec<u8>> {
        Ok(bincode::serialize(proof)?)
    }

    /// Decode a proof, attaching this collection's fields
    pub fn deserialize(&self, bytes: &[u8]) -> Result<Proof> {
        let mut proof: Proof = bincode::deserialize(bytes)?;
        proof.fields = self.fields.clone();
        Ok(proof)
    }

    fn absorb(&mut self, proof: &Proof) {
        let path = Hash::path(&proof.key);
        let mut cursor = self.root;
        self.materialize(cursor, &proof.root);

        for (depth, step) in proof.steps.iter().enumerate() {
            let Some(children) = self.arena[cursor].children else {
                break;
            };
            self.materialize(children.left, &step.left);
            self.materialize(children.right, &step.right);
            cursor = children.side(path.bit(depth));
        }
    }

    /// Fill an unknown node from a dump carrying the same label
    fn materialize(&mut self, id: NodeId, dump: &Dump) {
        let node = &self.arena[id];
        if node.known || node.label != dump.label {
            return;
        }

        self.preserve(id);
        let children = match dump.body {
            DumpBody::Internal { left, right } => Some(Children {
                left: self.alloc(Node::unknown(left)),
                right: self.alloc(Node::unknown(right)),
            }),
            DumpBody::Leaf { .. } => None,
        };

        let node = &mut self.arena[id];
        node.known = true;
        node.key = dump.key().map(<[u8]>::to_vec).unwrap_or_default();
        node.values = dump.values.clone();
        node.children = children;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    fn key(index: u64) -> Vec<u8> {
        index.to_be_bytes().to_vec()
    }

    fn populated() -> Collection {
        let mut collection = Collection::new(vec![Field::Stake64, Field::Data]);
        for index in 0..64 {
            collection
                .add(&key(index), vec![Value::U64(index), Value::from(format!("v{}", index))])
                .unwrap();
        }
        collection
    }

    /// Every single-byte change to a proof's dumps
    fn tampered(proof: &Proof) -> Vec<Proof> {
        fn flips(dump: &Dump) -> Vec<Dump> {
            let mut out = Vec::new();
            for i in 0..Hash::SIZE {
                let mut copy = dump.clone();
                copy.label.as_bytes_mut()[i] ^= 1;
                out.push(copy);
            }
            for (v, value) in dump.values.iter().enumerate() {
                for i in 0..value.len() {
                    let mut copy = dump.clone();
                    copy.values[v][i] ^= 1;
                    out.push(copy);
                }
            }
            match &dump.body {
                DumpBody::Leaf { key } => {
                    for i in 0..key.len() {
                        let mut copy = dump.clone();
                        if let DumpBody::Leaf { key } = &mut copy.body {
                            key[i] ^= 1;
                        }
                        out.push(copy);
                    }
                }
                DumpBody::Internal { .. } => {
                    for i in 0..Hash::SIZE {
                        for right in [false, true] {
                            let mut copy = dump.clone();
                            if let DumpBody::Internal { left: l, right: r } = &mut copy.body {
                                let target = if right { r } else { l };
                                target.as_bytes_mut()[i] ^= 1;
                            }
                            out.push(copy);
                        }
                    }
                }
            }
            out
        }

        let mut out = Vec::new();
        for root in flips(&proof.root) {
            let mut copy = proof.clone();
            copy.root = root;
            out.push(copy);
        }
        for (s, step) in proof.steps.iter().enumerate() {
            for left in flips(&step.left) {
                let mut copy = proof.clone();
                copy.steps[s].left = left;
                out.push(copy);
            }
            for right in flips(&step.right) {
                let mut copy = proof.clone();
                copy.steps[s].right = right;
                out.push(copy);
            }
        }
        out
    }

    #[test]
    fn test_proof_of_presence() {
        let collection = populated();
        for index in 0..64 {
            let proof = collection.get(&key(index)).proof().unwrap();
            assert!(proof.consistent());
            assert!(proof.matches());
            assert_eq!(proof.root().label, collection.root_label());
            assert_eq!(
                proof.values().unwrap(),
                vec![Value::U64(index), Value::from(format!("v{}", index))]
            );
        }
    }

    #[test]
    fn test_proof_of_absence() {
        let collection = populated();
        for index in 64..128 {
            let proof = collection.get(&key(index)).proof().unwrap();
            assert!(proof.consistent());
            assert!(!proof.matches());
            assert!(matches!(proof.values(), Err(Error::NoMatch)));
        }
    }

    #[test]
    fn test_tampering_breaks_consistency() {
        let collection = populated();
        let proof = collection.get(&key(3)).proof().unwrap();

        for bad in tampered(&proof) {
            assert!(!bad.consistent());
        }

        let mut truncated = proof.clone();
        truncated.steps.pop();
        assert!(!truncated.consistent());

        let mut empty = proof;
        empty.steps.clear();
        assert!(!empty.consistent());
    }

    #[test]
    fn test_serialization_round_trip() {
        let collection = populated();
        let proof = collection.get(&key(5)).proof().unwrap();

        let bytes = collection.serialize(&proof).unwrap();
        let decoded = collection.deserialize(&bytes).unwrap();
        assert_eq!(decoded, proof);
        assert_eq!(decoded.values().unwrap(), proof.values().unwrap());
        assert_eq!(collection.serialize(&decoded).unwrap(), bytes);

        assert!(matches!(
            collection.deserialize(&bytes[..bytes.len() / 2]),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_verify_rejects() {
        let mut collection = populated();
        let proof = collection.get(&key(1)).proof().unwrap();

        let mut other = Collection::new(vec![Field::Stake64, Field::Data]);
        assert!(!other.verify(&proof));

        let mut bad = proof.clone();
        bad.steps[0].left.label.as_bytes_mut()[0] ^= 1;
        assert!(!collection.verify(&bad));

        assert!(collection.verify(&proof));
    }

    #[test]
    fn test_verify_rejects_bad_aggregate() {
        let mut collection = Collection::new(vec![Field::Stake64]);
        collection.add(b"a", vec![Value::U64(1)]).unwrap();
        collection.add(b"b", vec![Value::U64(2)]).unwrap();

        // a root whose stake lies about its children, labelled consistently
        let mut proof = collection.get(b"a").proof().unwrap();
        proof.root.values = vec![100u64.to_be_bytes().to_vec()];
        let (left, right) = proof.root.children().unwrap();
        proof.root.label = label(false, &[], &proof.root.values, &left, &right);
        assert!(proof.consistent());

        let mut verifier = Collection::verifier(vec![Field::Stake64]);
        verifier.arena[verifier.root].label = proof.root.label;
        assert!(!verifier.verify(&proof));
    }

    #[test]
    fn test_verifier_absorbs_proofs() {
        let mut collection = Collection::new(vec![Field::Stake64, Field::Data]);
        let mut verifier = Collection::verifier(vec![Field::Stake64, Field::Data]);

        let proof = collection.get(b"a").proof().unwrap();
        assert!(verifier.verify(&proof));
        assert!(verifier.is_root_known());

        collection
            .add(b"a", vec![Value::U64(1), Value::from("x")])
            .unwrap();
        let proof = collection.get(b"a").proof().unwrap();
        assert!(!verifier.verify(&proof));

        let populated = populated();
        let mut verifier = Collection::verifier(vec![Field::Stake64, Field::Data]);
        verifier.arena[verifier.root] = Node::unknown(populated.root_label());

        for index in 0..8 {
            let proof = populated.get(&key(index)).proof().unwrap();
            assert!(verifier.verify(&proof));
            let record = verifier.get(&key(index)).record().unwrap();
            assert_eq!(record.values().unwrap(), proof.values().unwrap());
        }
        assert_eq!(verifier.root_label(), populated.root_label());
    }
}
