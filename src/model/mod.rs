//! Core data model types for merkle_collection

mod hash;
mod value;

pub use hash::Hash;
pub use value::Value;

pub(crate) use hash::prefix_match;
