//! Engine-wide default constants.
//!
//! The plateau threshold and score weights are empirical values carried
//! over from production runs; they are overridable through
//! [`crate::config::GroupingConfig`] rather than being baked in.

/// Maximum members per emitted group.
pub const DEFAULT_MAX_GROUP_SIZE: usize = 50;

/// Vocabulary cap for the TF-IDF vector space.
pub const DEFAULT_MAX_TERMS: usize = 1000;

/// Lower bound of the candidate cluster-count sweep.
pub const DEFAULT_MIN_CLUSTERS: usize = 5;

/// Hard upper cap of the candidate cluster-count sweep.
pub const DEFAULT_MAX_CLUSTERS_CAP: usize = 65;

/// Cohesion-slope magnitude below which the sweep is considered flat.
pub const DEFAULT_PLATEAU_THRESHOLD: f64 = 6e-5;

/// Weight applied to per-item inertia in the combined diagnostic score.
pub const DEFAULT_INERTIA_WEIGHT: f64 = 1e-3;

/// Weight applied to cluster-size variance in the combined diagnostic score.
pub const DEFAULT_VARIANCE_WEIGHT: f64 = 1e-3;

/// Base seed for every k-means invocation in a run.
pub const DEFAULT_SEED: u64 = 42;

/// Number of seeded k-means restarts per candidate k.
pub const DEFAULT_N_INIT: usize = 10;

/// Lloyd iteration cap per k-means restart.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Centroid-shift convergence tolerance for Lloyd iterations.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Default data root; card inputs and group outputs live under it.
pub const DEFAULT_DATA_ROOT: &str = "data";

/// Group result artifact name, one row per surviving group.
pub const GROUP_RESULT_FILE: &str = "group_result.csv";

/// Per-k clustering metrics artifact name.
pub const PERFORMANCE_FILE: &str = "clustering_performance.json";
