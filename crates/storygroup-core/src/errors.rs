//! Error taxonomy for the partitioning engine.
//!
//! Recoverable conditions (missing input files, per-k clustering failures,
//! validation rejections) are handled locally and never surface here; these
//! variants are the fatal paths that abort a run before anything is written.

/// Errors that abort a grouping run.
#[derive(Debug, thiserror::Error)]
pub enum GroupingError {
    #[error("duplicate content id within one run: {content_id}")]
    DuplicateContentId { content_id: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("explicit cluster range [{k_min}, {k_max}] has no feasible candidate for {points} items")]
    EmptyCandidateRange {
        k_min: usize,
        k_max: usize,
        points: usize,
    },

    #[error("clustering failed for every candidate k; cannot produce an assignment")]
    NoViableClustering,

    #[error("k-means infeasible: k={k} for {points} points")]
    DegenerateClustering { k: usize, points: usize },

    #[error("group {group_id} (size {size}) cannot be split into {subgroups} subgroups")]
    UnsplittableGroup {
        group_id: u32,
        size: usize,
        subgroups: usize,
    },

    #[error("invalid date (expected YYYY-MM-DD): {value}")]
    InvalidDate { value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),
}
