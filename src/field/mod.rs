//! Per-key value semantics
//!
//! Every node of a collection carries one encoded value per registered
//! field. A field decides how values are encoded, what an empty position
//! holds, how two children's values aggregate into their parent's, and how a
//! query descends through the aggregates.

mod data;
mod stake;

pub use data::Data;
pub use stake::Stake64;

use crate::model::Value;
use crate::Result;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Which child a navigation step descends into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// The outcome of one navigation step: where to go, and the (possibly
/// reduced) encoded query to carry into that child
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
    pub direction: Direction,
    pub query: Vec<u8>,
}

impl Navigation {
    pub fn left(query: Vec<u8>) -> Self {
        Navigation {
            direction: Direction::Left,
            query,
        }
    }

    pub fn right(query: Vec<u8>) -> Self {
        Navigation {
            direction: Direction::Right,
            query,
        }
    }
}

/// The capability set of a field
///
/// `parent` is only ever called on values that `decode` accepts: the
/// collection validates everything it imports from proofs.
pub trait FieldKind: Send + Sync + fmt::Debug {
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Value>;

    fn placeholder(&self) -> Vec<u8>;

    fn parent(&self, left: &[u8], right: &[u8]) -> Vec<u8>;

    fn navigate(
        &self,
        query: &[u8],
        parent: &[u8],
        left: &[u8],
        right: &[u8],
    ) -> Result<Navigation>;
}

/// A field registered on a collection
#[derive(Clone, Debug)]
pub enum Field {
    /// Opaque bytes, no aggregation
    Data,
    /// A 64-bit stake, summed up the tree
    Stake64,
    /// A caller-defined field
    Custom(Arc<dyn FieldKind>),
}

impl Field {
    /// Wrap a caller-defined field
    pub fn custom(kind: impl FieldKind + 'static) -> Self {
        Field::Custom(Arc::new(kind))
    }

    fn kind(&self) -> &dyn FieldKind {
        match self {
            Field::Data => &Data,
            Field::Stake64 => &Stake64,
            Field::Custom(kind) => kind.as_ref(),
        }
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        self.kind().encode(value)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        self.kind().decode(bytes)
    }

    pub fn placeholder(&self) -> Vec<u8> {
        self.kind().placeholder()
    }

    pub fn parent(&self, left: &[u8], right: &[u8]) -> Vec<u8> {
        self.kind().parent(left, right)
    }

    pub fn navigate(
        &self,
        query: &[u8],
        parent: &[u8],
        left: &[u8],
        right: &[u8],
    ) -> Result<Navigation> {
        self.kind().navigate(query, parent, left, right)
    }
}

/// The ordered, shared field list of one collection
#[derive(Clone, Debug, Default)]
pub struct Fields(Arc<Vec<Field>>);

impl Fields {
    pub fn new(fields: Vec<Field>) -> Self {
        Fields(Arc::new(fields))
    }

    /// The values of an empty position
    pub fn placeholders(&self) -> Vec<Vec<u8>> {
        self.iter().map(Field::placeholder).collect()
    }

    /// Aggregate two children's values into their parent's
    pub fn parents(&self, left: &[Vec<u8>], right: &[Vec<u8>]) -> Vec<Vec<u8>> {
        self.iter()
            .zip(left.iter().zip(right))
            .map(|(field, (left, right))| field.parent(left, right))
            .collect()
    }

    /// Encode one value per field
    ///
    /// # Panics
    ///
    /// Panics if `values` does not hold exactly one value per field.
    pub fn encode(&self, values: &[Value]) -> Result<Vec<Vec<u8>>> {
        self.check_arity(values.len());
        self.iter()
            .zip(values)
            .map(|(field, value)| field.encode(value))
            .collect()
    }

    /// Decode one stored value per field
    pub fn decode(&self, raw: &[Vec<u8>]) -> Result<Vec<Value>> {
        if raw.len() != self.len() {
            return Err(crate::Error::InvalidEncoding(format!(
                "expected {} values, found {}",
                self.len(),
                raw.len()
            )));
        }
        self.iter()
            .zip(raw)
            .map(|(field, bytes)| field.decode(bytes))
            .collect()
    }

    /// Whether `raw` holds one decodable value per field
    pub fn accepts(&self, raw: &[Vec<u8>]) -> bool {
        self.decode(raw).is_ok()
    }

    pub(crate) fn check_arity(&self, count: usize) {
        assert_eq!(
            count,
            self.len(),
            "wrong number of values: collection has {} fields",
            self.len()
        );
    }
}

impl Deref for Fields {
    type Target = [Field];

    fn deref(&self) -> &[Field] {
        &self.0
    }
}

impl From<Vec<Field>> for Fields {
    fn from(fields: Vec<Field>) -> Self {
        Fields::new(fields)
    }
}
