//! Declared-key updates
//!
//! An update names, through proofs, every key it reads or writes. Once
//! prepared against the current root it runs through a proxy that refuses
//! any other key.

use super::{Collection, Record};
use crate::model::{Hash, Value};
use crate::{Error, Result};
use std::collections::HashSet;
use tracing::debug;

/// Read access to a collection
pub trait ReadOnly {
    fn get(&self, key: &[u8]) -> Result<Record>;
}

/// Read and write access to a collection
pub trait ReadWrite: ReadOnly {
    fn add(&mut self, key: &[u8], values: Vec<Value>) -> Result<()>;
    fn set(&mut self, key: &[u8], values: Vec<Value>) -> Result<()>;
    fn set_field(&mut self, key: &[u8], field: usize, value: Value) -> Result<()>;
    fn remove(&mut self, key: &[u8]) -> Result<()>;
}

/// A state transition over a known set of keys
pub trait Update {
    /// Proofs for every key the update touches
    fn records(&self) -> Vec<super::Proof>;

    /// Whether the update may run against the current values
    fn check(&self, collection: &dyn ReadOnly) -> bool;

    /// Perform the update
    fn apply(&self, collection: &mut dyn ReadWrite) -> Result<()>;
}

/// Collection access restricted to the keys an update declared
///
/// # Panics
///
/// Every method panics when given an undeclared key.
pub struct Proxy<'a> {
    collection: &'a mut Collection,
    paths: &'a HashSet<Hash>,
}

impl<'a> Proxy<'a> {
    fn new(collection: &'a mut Collection, paths: &'a HashSet<Hash>) -> Self {
        Proxy { collection, paths }
    }

    fn guard(&self, key: &[u8]) {
        assert!(
            self.paths.contains(&Hash::path(key)),
            "key outside the declared update: {}",
            hex::encode(key)
        );
    }
}

impl ReadOnly for Proxy<'_> {
    fn get(&self, key: &[u8]) -> Result<Record> {
        self.guard(key);
        self.collection.get(key).record()
    }
}

impl ReadWrite for Proxy<'_> {
    fn add(&mut self, key: &[u8], values: Vec<Value>) -> Result<()> {
        self.guard(key);
        self.collection.add(key, values)
    }

    fn set(&mut self, key: &[u8], values: Vec<Value>) -> Result<()> {
        self.guard(key);
        self.collection.set(key, values)
    }

    fn set_field(&mut self, key: &[u8], field: usize, value: Value) -> Result<()> {
        self.guard(key);
        self.collection.set_field(key, field, value)
    }

    fn remove(&mut self, key: &[u8]) -> Result<()> {
        self.guard(key);
        self.collection.remove(key)
    }
}

/// An update whose proofs verified, bound to the epoch it was prepared at
#[derive(Debug)]
pub struct Prepared<U> {
    update: U,
    transaction: u64,
    paths: HashSet<Hash>,
}

impl<U> Prepared<U> {
    pub fn update(&self) -> &U {
        &self.update
    }

    /// The epoch the update was prepared at
    pub fn epoch(&self) -> u64 {
        self.transaction
    }
}

impl Collection {
    /// Verify every proof of `update` against the current root
    ///
    /// # Panics
    ///
    /// Panics if called mid-transaction with changes not yet relabelled.
    pub fn prepare<U: Update>(&mut self, update: U) -> Result<Prepared<U>> {
        let mut paths = HashSet::new();
        for proof in update.records() {
            if !self.verify(&proof) {
                return Err(Error::InvalidProof);
            }
            paths.insert(Hash::path(proof.key()));
        }

        Ok(Prepared {
            update,
            transaction: self.transaction.id,
            paths,
        })
    }

    /// Check and run a prepared update. Outside a transaction one is begun
    /// and ended (or rolled back on error) around it.
    pub fn apply<U: Update>(&mut self, prepared: &Prepared<U>) -> Result<()> {
        if prepared.transaction != self.transaction.id {
            return Err(Error::StaleTransaction {
                prepared: prepared.transaction,
                current: self.transaction.id,
            });
        }

        if !prepared.update.check(&Proxy::new(self, &prepared.paths)) {
            return Err(Error::PreconditionFailed);
        }

        let auto = !self.transaction.ongoing;
        if auto {
            self.begin()?;
        }

        let result = prepared.update.apply(&mut Proxy::new(self, &prepared.paths));
        debug!(
            target: "collection::update",
            keys = prepared.paths.len(),
            ok = result.is_ok(),
            "apply"
        );

        match result {
            Ok(()) if auto => self.end(),
            Ok(()) => Ok(()),
            Err(err) => {
                if auto {
                    self.rollback()?;
                }
                Err(err)
            }
        }
    }

    /// Prepare and apply in one step
    pub fn apply_update<U: Update>(&mut self, update: U) -> Result<()> {
        let prepared = self.prepare(update)?;
        self.apply(&prepared)
    }
}
