//! # storygroup-engine
//!
//! Adaptive content clustering and size-constrained partitioning.
//!
//! One run flows strictly left to right:
//! aggregate → vectorize → cluster → split → report.
//! The vector space is fit once per run and only re-sliced afterwards;
//! every k-means invocation is seeded, so a run is fully deterministic
//! given its inputs and config.

pub mod aggregate;
pub mod cluster;
pub mod pipeline;
pub mod report;
pub mod split;
pub mod vectorize;

pub use pipeline::{Pipeline, RunSummary};
