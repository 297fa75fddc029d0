//! Export and rebuild of a collection's content
//!
//! A snapshot is the flat list of data leaves plus the root label they must
//! reproduce. Storage is the caller's business; this module only frames the
//! bytes: one version byte followed by zstd-compressed bincode.

use crate::collection::Collection;
use crate::field::Field;
use crate::model::{Hash, Value};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const VERSION: u8 = 1;

/// One data leaf with its encoded values
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub key: Vec<u8>,
    pub values: Vec<Vec<u8>>,
}

/// Every data leaf of a fully known collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub root: Hash,
    pub records: Vec<StoredRecord>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Frame for storage
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let encoded = bincode::serialize(self)?;
        let mut output = vec![VERSION];
        output.extend(zstd::encode_all(encoded.as_slice(), 3)?);
        Ok(output)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (&version, body) = data
            .split_first()
            .ok_or_else(|| Error::Corruption("Empty snapshot data".into()))?;
        if version != VERSION {
            return Err(Error::Corruption(format!(
                "Unsupported snapshot version: {}",
                version
            )));
        }

        let decompressed = zstd::decode_all(body)?;
        Ok(bincode::deserialize(&decompressed)?)
    }
}

impl Collection {
    /// Export every data leaf. Fails on a partial replica.
    pub fn snapshot(&self) -> Result<Snapshot> {
        if !self.is_fully_known() {
            return Err(Error::UnknownSubtree);
        }

        let records = self
            .records()
            .into_iter()
            .map(|record| StoredRecord {
                key: record.key().to_vec(),
                values: record.raw_values().to_vec(),
            })
            .collect();

        Ok(Snapshot {
            root: self.root_label(),
            records,
        })
    }

    /// Rebuild a collection from a snapshot, checking that it reproduces
    /// the recorded root
    pub fn restore(fields: Vec<Field>, snapshot: &Snapshot) -> Result<Self> {
        let mut collection = Collection::new(fields);
        collection.begin()?;
        for record in &snapshot.records {
            collection.fields.decode(&record.values)?;
            collection.insert(&record.key, record.values.clone())?;
        }
        collection.end()?;

        if collection.root_label() != snapshot.root {
            return Err(Error::Corruption(format!(
                "snapshot root {} rebuilt as {}",
                snapshot.root.short(),
                collection.root_label().short()
            )));
        }

        debug!(
            target: "collection::snapshot",
            records = snapshot.len(),
            root = %snapshot.root.short(),
            "restored"
        );
        Ok(collection)
    }

    /// Rebuild a collection by adding every entry in one transaction
    pub fn replay<I>(fields: Vec<Field>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<Value>)>,
    {
        let mut collection = Collection::new(fields);
        collection.begin()?;
        let mut count = 0usize;
        for (key, values) in entries {
            collection.add(&key, values)?;
            count += 1;
        }
        collection.end()?;

        debug!(target: "collection::snapshot", records = count, "replayed");
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<Field> {
        vec![Field::Stake64, Field::Data]
    }

    fn populated() -> Collection {
        Collection::replay(
            fields(),
            (0u64..50).map(|i| {
                (
                    format!("key-{}", i).into_bytes(),
                    vec![Value::U64(i), Value::from(format!("value-{}", i))],
                )
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_snapshot_round_trip() {
        let collection = populated();
        let snapshot = collection.snapshot().unwrap();
        assert_eq!(snapshot.len(), 50);

        let bytes = snapshot.to_bytes().unwrap();
        let decoded = Snapshot::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, snapshot);

        let restored = Collection::restore(fields(), &decoded).unwrap();
        assert_eq!(restored.root_label(), collection.root_label());
    }

    #[test]
    fn test_bad_framing() {
        assert!(matches!(
            Snapshot::from_bytes(&[]),
            Err(Error::Corruption(_))
        ));
        assert!(matches!(
            Snapshot::from_bytes(&[9, 1, 2, 3]),
            Err(Error::Corruption(_))
        ));
        assert!(Snapshot::from_bytes(&[VERSION, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_restore_detects_wrong_root() {
        let mut snapshot = populated().snapshot().unwrap();
        snapshot.records.pop();
        assert!(matches!(
            Collection::restore(fields(), &snapshot),
            Err(Error::Corruption(_))
        ));

        let mut snapshot = populated().snapshot().unwrap();
        snapshot.records[0].values[0] = vec![1, 2, 3];
        assert!(matches!(
            Collection::restore(fields(), &snapshot),
            Err(Error::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_snapshot_of_partial_replica() {
        let mut collection = populated();
        collection.scope_mut().set_none();
        collection.collect();
        assert!(matches!(collection.snapshot(), Err(Error::UnknownSubtree)));
    }

    #[test]
    fn test_replay_duplicate_key() {
        let entries = vec![
            (b"a".to_vec(), vec![Value::U64(1), Value::from("x")]),
            (b"a".to_vec(), vec![Value::U64(2), Value::from("y")]),
        ];
        assert!(matches!(
            Collection::replay(fields(), entries),
            Err(Error::KeyCollision)
        ));
    }
}
