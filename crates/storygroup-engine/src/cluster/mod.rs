//! Clustering: seeded k-means, silhouette cohesion, and the adaptive
//! cluster-count selector.

pub mod kmeans;
pub mod selector;
pub mod silhouette;

pub use kmeans::{KMeansConfig, KMeansRun};
pub use selector::{
    feasible_candidates, plateau_select, select, Candidates, Selection, SelectorConfig,
};
