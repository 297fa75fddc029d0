//! Collection configuration
//!
//! Scope and collection behaviour can be described in JSON, so a replica's
//! materialization policy lives next to the rest of its settings.

use crate::scope::Scope;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One kept prefix: the first `bits` bits of the hex-encoded `prefix`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixConfig {
    pub prefix: String,
    pub bits: usize,
}

/// Which subtrees a replica keeps
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeConfig {
    #[default]
    All,
    None,
    Prefixes(Vec<PrefixConfig>),
}

/// Settings for a collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Collect after every mutation outside a transaction and every end
    pub auto_collect: bool,
    pub scope: ScopeConfig,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfig {
            auto_collect: true,
            scope: ScopeConfig::All,
        }
    }
}

impl CollectionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a file, or the defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Build the scope this configuration describes
    pub fn scope(&self) -> Result<Scope> {
        match &self.scope {
            ScopeConfig::All => Ok(Scope::all()),
            ScopeConfig::None => Ok(Scope::none()),
            ScopeConfig::Prefixes(prefixes) => {
                let mut scope = Scope::none();
                for entry in prefixes {
                    let value = hex::decode(&entry.prefix).map_err(|e| {
                        Error::InvalidEncoding(format!("scope prefix {:?}: {}", entry.prefix, e))
                    })?;
                    if entry.bits > value.len() * 8 {
                        return Err(Error::InvalidEncoding(format!(
                            "scope prefix {:?} is shorter than {} bits",
                            entry.prefix, entry.bits
                        )));
                    }
                    scope.add(&value, entry.bits);
                }
                Ok(scope)
            }
        }
    }
}
