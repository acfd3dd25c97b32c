//! Learning configuration, persisted as TOML.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes. Command-line flags override values loaded from a file.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{EdgeIndex, RelationId};
use crate::rules::confidence::MAX_BODY_LEN;
use crate::walk::TransitionDistr;

/// Errors from configuration loading and validation.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown transition distribution \"{name}\"")]
    #[diagnostic(
        code(chronorule::config::transition_distr),
        help("Use \"unif\" for uniform or \"exp\" for exponentially recency-weighted transitions.")
    )]
    UnknownTransitionDistr { name: String },

    #[error("no rule lengths requested")]
    #[diagnostic(
        code(chronorule::config::no_rule_lengths),
        help("Request at least one rule length, e.g. `-l 1 2 3`.")
    )]
    NoRuleLengths,

    #[error("unsupported rule length {length}")]
    #[diagnostic(
        code(chronorule::config::rule_length),
        help("Rule bodies must have between 1 and 3 relations.")
    )]
    UnsupportedRuleLength { length: usize },

    #[error("{field} must be > 0")]
    #[diagnostic(code(chronorule::config::zero))]
    Zero { field: &'static str },

    #[error("requested relation {relation} has no facts")]
    #[diagnostic(
        code(chronorule::config::empty_relation),
        help("Walks start from facts of the target relation; drop it from `relations`.")
    )]
    EmptyRelation { relation: RelationId },

    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(chronorule::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(chronorule::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(code(chronorule::config::write))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Parameters of one learning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnConfig {
    /// Rule body lengths to learn.
    #[serde(default = "default_rule_lengths")]
    pub rule_lengths: Vec<usize>,
    /// Walk attempts per (relation, length).
    #[serde(default = "default_num_walks")]
    pub num_walks: usize,
    /// Next-edge distribution.
    #[serde(default)]
    pub transition_distr: TransitionDistr,
    /// Parallel workers; relations are sharded across them.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// Seed for every worker's RNG. `None` draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Body samples per confidence estimate.
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    /// Target relations. `None` learns for every relation with facts.
    #[serde(default)]
    pub relations: Option<Vec<RelationId>>,
}

fn default_rule_lengths() -> Vec<usize> {
    vec![1]
}
fn default_num_walks() -> usize {
    100
}
fn default_num_workers() -> usize {
    1
}
fn default_num_samples() -> usize {
    500
}

impl Default for LearnConfig {
    fn default() -> Self {
        Self {
            rule_lengths: default_rule_lengths(),
            num_walks: default_num_walks(),
            transition_distr: TransitionDistr::default(),
            num_workers: default_num_workers(),
            seed: None,
            num_samples: default_num_samples(),
            relations: None,
        }
    }
}

impl LearnConfig {
    /// Check that the run is well-formed before any worker starts.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.rule_lengths.is_empty() {
            return Err(ConfigError::NoRuleLengths);
        }
        if let Some(&length) = self
            .rule_lengths
            .iter()
            .find(|l| **l == 0 || **l > MAX_BODY_LEN)
        {
            return Err(ConfigError::UnsupportedRuleLength { length });
        }
        if self.num_workers == 0 {
            return Err(ConfigError::Zero { field: "num_workers" });
        }
        if self.num_samples == 0 {
            return Err(ConfigError::Zero { field: "num_samples" });
        }
        Ok(())
    }

    /// Resolve the target relations against `index`, sorted ascending.
    pub fn target_relations(&self, index: &EdgeIndex) -> ConfigResult<Vec<RelationId>> {
        match &self.relations {
            None => Ok(index.relations()),
            Some(requested) => {
                let mut rels = requested.clone();
                rels.sort_unstable();
                rels.dedup();
                if let Some(&relation) = rels.iter().find(|r| !index.contains_relation(**r)) {
                    return Err(ConfigError::EmptyRelation { relation });
                }
                Ok(rels)
            }
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &std::path::Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &std::path::Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
