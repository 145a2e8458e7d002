//! Run configuration.
//!
//! All fields are optional; `effective_*()` accessors apply the defaults
//! from [`crate::constants`]. Loadable from TOML, overridable from the CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::GroupingError;

/// Configuration for one grouping run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GroupingConfig {
    /// Maximum members per emitted group. Default: 50. Must be >= 2.
    pub max_group_size: Option<usize>,
    /// TF-IDF vocabulary cap. Default: 1000.
    pub max_terms: Option<usize>,
    /// Explicit lower bound for the candidate-k sweep. When unset, derived
    /// as max(5, distinct publishers for the date).
    pub min_clusters: Option<usize>,
    /// Explicit upper bound for the candidate-k sweep. When unset, derived
    /// as min(65, corpus size / 3).
    pub max_clusters: Option<usize>,
    /// Cohesion-slope magnitude treated as a plateau. Default: 6e-5.
    pub plateau_threshold: Option<f64>,
    /// Combined-score weight for per-item inertia. Default: 1e-3.
    pub inertia_weight: Option<f64>,
    /// Combined-score weight for cluster-size variance. Default: 1e-3.
    pub variance_weight: Option<f64>,
    /// Base seed for every k-means invocation. Default: 42.
    pub seed: Option<u64>,
    /// Seeded k-means restarts per candidate k. Default: 10.
    pub n_init: Option<usize>,
    /// Lloyd iteration cap. Default: 100.
    pub max_iterations: Option<usize>,
    /// Directory holding `card/` inputs and `group/` outputs. Default: "data".
    pub data_root: Option<PathBuf>,
}

impl GroupingConfig {
    /// Load a config from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, GroupingError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> Result<(), GroupingError> {
        let max_size = self.effective_max_group_size();
        if max_size < 2 {
            return Err(GroupingError::InvalidConfig {
                message: format!("max_group_size must be >= 2, got {max_size}"),
            });
        }
        if self.effective_max_terms() == 0 {
            return Err(GroupingError::InvalidConfig {
                message: "max_terms must be >= 1".to_string(),
            });
        }
        if self.effective_n_init() == 0 {
            return Err(GroupingError::InvalidConfig {
                message: "n_init must be >= 1".to_string(),
            });
        }
        if let (Some(min), Some(max)) = (self.min_clusters, self.max_clusters) {
            if min > max {
                return Err(GroupingError::InvalidConfig {
                    message: format!("min_clusters ({min}) exceeds max_clusters ({max})"),
                });
            }
        }
        Ok(())
    }

    pub fn effective_max_group_size(&self) -> usize {
        self.max_group_size
            .unwrap_or(constants::DEFAULT_MAX_GROUP_SIZE)
    }

    pub fn effective_max_terms(&self) -> usize {
        self.max_terms.unwrap_or(constants::DEFAULT_MAX_TERMS)
    }

    pub fn effective_plateau_threshold(&self) -> f64 {
        self.plateau_threshold
            .unwrap_or(constants::DEFAULT_PLATEAU_THRESHOLD)
    }

    pub fn effective_inertia_weight(&self) -> f64 {
        self.inertia_weight
            .unwrap_or(constants::DEFAULT_INERTIA_WEIGHT)
    }

    pub fn effective_variance_weight(&self) -> f64 {
        self.variance_weight
            .unwrap_or(constants::DEFAULT_VARIANCE_WEIGHT)
    }

    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or(constants::DEFAULT_SEED)
    }

    pub fn effective_n_init(&self) -> usize {
        self.n_init.unwrap_or(constants::DEFAULT_N_INIT)
    }

    pub fn effective_max_iterations(&self) -> usize {
        self.max_iterations
            .unwrap_or(constants::DEFAULT_MAX_ITERATIONS)
    }

    pub fn effective_data_root(&self) -> PathBuf {
        self.data_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_DATA_ROOT))
    }
}
