//! Consensus parameters injected into the DAG.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! missing_parent = "strict"   # or "lenient" (default)
//! default_weight = 1
//! quorum = 3                  # optional; defaults to 2 * total / 3 + 1
//!
//! [validators]
//! alice = 1
//! bob = 2
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::event::ValidatorId;
use crate::root::ValidatorSet;

/// What to do with a parent id that is not in the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingParentPolicy {
    /// Skip the parent; the vector is computed from what is known.
    #[default]
    Lenient,
    /// Refuse to seal the event.
    Strict,
}

impl MissingParentPolicy {
    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl fmt::Display for MissingParentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lenient => "lenient",
            Self::Strict => "strict",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    #[serde(default)]
    pub validators: BTreeMap<ValidatorId, u64>,
    /// Weight given to validators registered without an explicit stake.
    #[serde(default = "default_weight")]
    pub default_weight: u64,
    #[serde(default)]
    pub quorum: Option<u64>,
    #[serde(default)]
    pub missing_parent: MissingParentPolicy,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            validators: BTreeMap::new(),
            default_weight: default_weight(),
            quorum: None,
            missing_parent: MissingParentPolicy::default(),
        }
    }
}

const fn default_weight() -> u64 {
    1
}

impl ConsensusConfig {
    /// Build the stake table handed to the root classifier.
    #[must_use]
    pub fn validator_set(&self) -> ValidatorSet {
        let set = ValidatorSet::new(self.validators.iter().map(|(v, w)| (v.clone(), *w)));
        match self.quorum {
            Some(quorum) => set.with_quorum(quorum),
            None => set,
        }
    }

    /// Register `validators` that have no configured stake at
    /// [`ConsensusConfig::default_weight`].
    ///
    /// Returns how many were added.
    pub fn register_missing<'a>(
        &mut self,
        validators: impl IntoIterator<Item = &'a ValidatorId>,
    ) -> usize {
        let mut added = 0;
        for validator in validators {
            if !self.validators.contains_key(validator) {
                self.validators.insert(validator.clone(), self.default_weight);
                added += 1;
            }
        }
        added
    }

    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse consensus config")
    }
}

/// Load the consensus config at `path`, or defaults if the file is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<ConsensusConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no consensus config; using defaults");
        return Ok(ConsensusConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ConsensusConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}
