//! A collection shared between threads
//!
//! A `Collection` is not internally synchronized. This wrapper holds one
//! exclusive lock per collection, taken for the whole of a transaction.

use crate::collection::Collection;
use crate::model::Hash;
use crate::Result;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::warn;

/// A cloneable handle to one collection behind a mutex
#[derive(Clone, Debug)]
pub struct SharedCollection {
    inner: Arc<Mutex<Collection>>,
}

impl SharedCollection {
    pub fn new(collection: Collection) -> Self {
        SharedCollection {
            inner: Arc::new(Mutex::new(collection)),
        }
    }

    /// Exclusive access until the guard is dropped
    pub fn lock(&self) -> MutexGuard<'_, Collection> {
        self.inner.lock()
    }

    pub fn root_label(&self) -> Hash {
        self.inner.lock().root_label()
    }

    /// Run `f` inside a transaction, holding the lock throughout. The
    /// transaction ends if `f` succeeds and rolls back otherwise.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Collection) -> Result<T>,
    {
        let mut collection = self.inner.lock();
        collection.begin()?;

        match f(&mut collection) {
            Ok(value) => {
                collection.end()?;
                Ok(value)
            }
            Err(err) => {
                warn!(target: "collection::transaction", error = %err, "rolling back");
                collection.rollback()?;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::model::Value;
    use crate::Error;
    use std::thread;

    #[test]
    fn test_concurrent_transactions() {
        let shared = SharedCollection::new(Collection::new(vec![Field::Stake64]));

        let handles: Vec<_> = (0u64..4)
            .map(|worker| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..25u64 {
                        let key = (worker * 100 + i).to_be_bytes();
                        shared
                            .transaction(|c| c.add(&key, vec![Value::U64(1)]))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut reference = Collection::new(vec![Field::Stake64]);
        for worker in 0u64..4 {
            for i in 0..25u64 {
                reference
                    .add(&(worker * 100 + i).to_be_bytes(), vec![Value::U64(1)])
                    .unwrap();
            }
        }
        assert_eq!(shared.root_label(), reference.root_label());
        assert_eq!(shared.lock().epoch(), 100);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let shared = SharedCollection::new(Collection::new(vec![Field::Data]));
        shared
            .transaction(|c| c.add(b"a", vec![Value::from("x")]))
            .unwrap();
        let label = shared.root_label();

        let result = shared.transaction(|c| {
            c.add(b"b", vec![Value::from("y")])?;
            c.add(b"a", vec![Value::from("z")])
        });

        assert!(matches!(result, Err(Error::KeyCollision)));
        assert_eq!(shared.root_label(), label);
        assert!(!shared.lock().is_transaction_ongoing());
    }
}
