//! # storygroup-core
//!
//! Foundation crate for the storygroup partitioning engine.
//! Defines the data model, errors, config, and constants.
//! The engine and CLI crates both depend on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::GroupingConfig;
pub use errors::GroupingError;
pub use types::{
    ClusterMetrics, ClusterRun, ContentItem, ContentKind, Corpus, Group, GroupRow,
    PerformanceReport,
};
