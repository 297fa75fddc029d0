//! Error types for merkle_collection

use thiserror::Error;

/// Result type alias for collection operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in collection operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown subtree: the path crosses a node that is not materialized locally")]
    UnknownSubtree,

    #[error("Key collision: the key already exists in the collection")]
    KeyCollision,

    #[error("Key not found")]
    KeyNotFound,

    #[error("Empty key")]
    EmptyKey,

    #[error("No match: the record does not hold the queried key")]
    NoMatch,

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Field is not navigable")]
    NotNavigable,

    #[error("Navigation query out of range")]
    QueryOutOfRange,

    #[error("Invalid proof")]
    InvalidProof,

    #[error("No transaction is ongoing")]
    NoTransaction,

    #[error("A transaction is already ongoing")]
    TransactionAlreadyOngoing,

    #[error("Stale transaction: prepared at epoch {prepared}, collection is at epoch {current}")]
    StaleTransaction { prepared: u64, current: u64 },

    #[error("Update precondition failed")]
    PreconditionFailed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corruption detected: {0}")]
    Corruption(String),
}
