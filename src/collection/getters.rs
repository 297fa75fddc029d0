//! Lookups: records, navigation and listings

use super::proof::{Dump, Proof, Step};
use super::Collection;
use crate::field::{Direction, Fields};
use crate::model::{Hash, Value};
use crate::trie::NodeId;
use crate::{Error, Result};

/// The result of a lookup
#[derive(Clone, Debug)]
pub struct Record {
    query: Vec<u8>,
    matched: bool,
    key: Vec<u8>,
    values: Vec<Vec<u8>>,
    fields: Fields,
}

impl Record {
    /// The key that was looked up
    pub fn query(&self) -> &[u8] {
        &self.query
    }

    /// Whether the collection holds the queried key
    pub fn matches(&self) -> bool {
        self.matched
    }

    /// The key of the leaf the lookup resolved to
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The encoded values, one per field
    pub fn raw_values(&self) -> &[Vec<u8>] {
        &self.values
    }

    /// The decoded values, one per field
    pub fn values(&self) -> Result<Vec<Value>> {
        if !self.matched {
            return Err(Error::NoMatch);
        }
        self.fields.decode(&self.values)
    }
}

/// A pending lookup of one key
pub struct Getter<'a> {
    collection: &'a Collection,
    key: &'a [u8],
}

impl<'a> Getter<'a> {
    /// Look the key up without building a proof
    pub fn record(&self) -> Result<Record> {
        if self.key.is_empty() {
            return Err(Error::EmptyKey);
        }

        let trail = self.collection.descend(&Hash::path(self.key))?;
        let leaf = &self.collection.arena[trail[trail.len() - 1]];

        if leaf.key == self.key {
            Ok(Record {
                query: self.key.to_vec(),
                matched: true,
                key: leaf.key.clone(),
                values: leaf.values.clone(),
                fields: self.collection.fields.clone(),
            })
        } else {
            Ok(Record {
                query: self.key.to_vec(),
                matched: false,
                key: self.key.to_vec(),
                values: Vec::new(),
                fields: self.collection.fields.clone(),
            })
        }
    }

    /// Build a proof of presence or absence of the key
    ///
    /// # Panics
    ///
    /// Panics if called mid-transaction with changes not yet relabelled.
    pub fn proof(&self) -> Result<Proof> {
        if self.key.is_empty() {
            return Err(Error::EmptyKey);
        }
        let collection = self.collection;
        collection.assert_fixed("proof");

        let trail = collection.descend(&Hash::path(self.key))?;
        let mut steps = Vec::with_capacity(trail.len() - 1);

        for &id in &trail[..trail.len() - 1] {
            let children = collection.arena[id]
                .children
                .ok_or(Error::UnknownSubtree)?;
            let (left, right) = (&collection.arena[children.left], &collection.arena[children.right]);
            if !left.known || !right.known {
                return Err(Error::UnknownSubtree);
            }
            steps.push(Step {
                left: collection.dump(children.left),
                right: collection.dump(children.right),
            });
        }

        Ok(Proof::new(
            self.key.to_vec(),
            collection.dump(collection.root),
            steps,
            collection.fields.clone(),
        ))
    }
}

impl Collection {
    /// Start a lookup of `key`
    pub fn get<'a>(&'a self, key: &'a [u8]) -> Getter<'a> {
        Getter {
            collection: self,
            key,
        }
    }

    /// Descend by a field's own semantics instead of by key path, e.g. pick
    /// a leaf with probability proportional to its stake
    ///
    /// # Panics
    ///
    /// Panics if `field` is not a valid field index, or if called
    /// mid-transaction with changes not yet relabelled.
    pub fn navigate(&self, field: usize, query: Value) -> Result<Record> {
        assert!(
            field < self.fields.len(),
            "field index {} out of range: collection has {} fields",
            field,
            self.fields.len()
        );
        self.assert_fixed("navigate");

        let kind = &self.fields[field];
        let mut query = kind.encode(&query)?;
        let mut cursor = self.root;

        loop {
            let node = &self.arena[cursor];
            if !node.known {
                return Err(Error::UnknownSubtree);
            }

            let Some(children) = node.children else {
                return Ok(Record {
                    query: node.key.clone(),
                    matched: !node.key.is_empty(),
                    key: node.key.clone(),
                    values: node.values.clone(),
                    fields: self.fields.clone(),
                });
            };

            let (left, right) = (&self.arena[children.left], &self.arena[children.right]);
            if !left.known || !right.known {
                return Err(Error::UnknownSubtree);
            }

            let step = kind.navigate(
                &query,
                &node.values[field],
                &left.values[field],
                &right.values[field],
            )?;
            cursor = match step.direction {
                Direction::Left => children.left,
                Direction::Right => children.right,
            };
            query = step.query;
        }
    }

    /// Every data leaf held locally, in path order. Subtrees outside the
    /// local scope are skipped.
    pub fn records(&self) -> Vec<Record> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            let node = &self.arena[id];
            if !node.known {
                continue;
            }
            match node.children {
                Some(children) => {
                    stack.push(children.right);
                    stack.push(children.left);
                }
                None if !node.key.is_empty() => out.push(Record {
                    query: node.key.clone(),
                    matched: true,
                    key: node.key.clone(),
                    values: node.values.clone(),
                    fields: self.fields.clone(),
                }),
                None => {}
            }
        }

        out
    }

    /// Whether no part of the trie has been collected
    pub fn is_fully_known(&self) -> bool {
        self.arena[self.root].known
            && self
                .arena
                .descendants(self.root)
                .into_iter()
                .all(|id| self.arena[id].known)
    }

    /// Minimal self-describing snapshot of one node
    pub(crate) fn dump(&self, id: NodeId) -> Dump {
        let node = &self.arena[id];
        Dump::new(node, self.arena.child_labels(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    #[test]
    fn test_record_match_and_mismatch() {
        let mut collection = Collection::new(vec![Field::Stake64, Field::Data]);
        collection
            .add(b"a", vec![Value::U64(1), Value::from("x")])
            .unwrap();

        let record = collection.get(b"a").record().unwrap();
        assert!(record.matches());
        assert_eq!(record.key(), b"a");
        assert_eq!(record.query(), b"a");
        assert_eq!(
            record.values().unwrap(),
            vec![Value::U64(1), Value::from("x")]
        );

        let missing = collection.get(b"zzz").record().unwrap();
        assert!(!missing.matches());
        assert!(matches!(missing.values(), Err(Error::NoMatch)));

        assert!(matches!(
            collection.get(b"").record(),
            Err(Error::EmptyKey)
        ));
    }

    #[test]
    fn test_record_unknown_subtree() {
        let mut collection = Collection::new(vec![]);
        collection.add(b"a", vec![]).unwrap();
        collection.scope_mut().set_none();
        collection.collect();

        assert!(matches!(
            collection.get(b"a").record(),
            Err(Error::UnknownSubtree)
        ));
    }

    #[test]
    fn test_navigate_by_stake() {
        let mut collection = Collection::new(vec![Field::Stake64]);
        let stakes: Vec<(Vec<u8>, u64)> = (0u64..20)
            .map(|i| (format!("node-{}", i).into_bytes(), i % 5 + 1))
            .collect();
        for (key, stake) in &stakes {
            collection.add(key, vec![Value::U64(*stake)]).unwrap();
        }
        let total: u64 = stakes.iter().map(|(_, s)| s).sum();

        // leaves in path order form consecutive stake intervals
        let mut intervals = Vec::new();
        let mut start = 0u64;
        for record in collection.records() {
            let stake = record.values().unwrap()[0].as_u64().unwrap();
            intervals.push((record.key().to_vec(), start, start + stake));
            start += stake;
        }
        assert_eq!(start, total);

        for query in 0..total {
            let record = collection.navigate(0, Value::U64(query)).unwrap();
            let (key, _, _) = intervals
                .iter()
                .find(|(_, lo, hi)| *lo <= query && query < *hi)
                .unwrap();
            assert_eq!(record.key(), key.as_slice());
        }

        assert!(matches!(
            collection.navigate(0, Value::U64(total)),
            Err(Error::QueryOutOfRange)
        ));
    }

    #[test]
    fn test_navigate_errors() {
        let mut collection = Collection::new(vec![Field::Stake64, Field::Data]);
        collection
            .add(b"a", vec![Value::U64(1), Value::from("x")])
            .unwrap();

        assert!(matches!(
            collection.navigate(1, Value::from("q")),
            Err(Error::NotNavigable)
        ));
        assert!(matches!(
            collection.navigate(0, Value::from("q")),
            Err(Error::InvalidEncoding(_))
        ));

        collection.scope_mut().set_none();
        collection.collect();
        assert!(matches!(
            collection.navigate(0, Value::U64(0)),
            Err(Error::UnknownSubtree)
        ));
    }

    #[test]
    fn test_records_lists_leaves() {
        let mut collection = Collection::new(vec![Field::Data]);
        for key in ["t:one", "t:two", "e:one"] {
            collection.add(key.as_bytes(), vec![Value::from(key)]).unwrap();
        }

        let mut keys: Vec<Vec<u8>> = collection
            .records()
            .iter()
            .map(|r| r.key().to_vec())
            .collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![b"e:one".to_vec(), b"t:one".to_vec(), b"t:two".to_vec()]
        );
    }
}
