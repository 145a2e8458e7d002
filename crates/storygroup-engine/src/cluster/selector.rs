//! Adaptive cluster-count selection.
//!
//! Sweeps a candidate range of k, scores every partition, and picks the
//! smallest k at which cohesion improvement plateaus — past the elbow,
//! extra clusters only fragment stories. The sweep is independent per k
//! and runs on the rayon pool; per-k failures are skipped, and only the
//! re-run at the selected k survives as the authoritative assignment.

use rayon::prelude::*;
use storygroup_core::{ClusterMetrics, ClusterRun, GroupingError, PerformanceReport};
use tracing::{debug, info, warn};

use super::kmeans::{self, KMeansConfig, KMeansRun};
use super::silhouette;
use crate::vectorize::VectorSpace;

/// Parameters for the candidate-k sweep.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub k_min: usize,
    pub k_max: usize,
    /// Whether the range came from an explicit operator override. An empty
    /// explicit range is a config error; an empty derived range means the
    /// corpus is too small to sweep and the caller should bypass clustering.
    pub explicit_range: bool,
    pub plateau_threshold: f64,
    pub inertia_weight: f64,
    pub variance_weight: f64,
    pub seed: u64,
    pub n_init: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl SelectorConfig {
    fn kmeans_config(&self, k: usize) -> KMeansConfig {
        KMeansConfig {
            k,
            n_init: self.n_init,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            seed: self.seed,
        }
    }
}

/// The surviving cluster run plus the full sweep report.
#[derive(Debug, Clone)]
pub struct Selection {
    pub run: ClusterRun,
    pub report: PerformanceReport,
}

/// Outcome of the feasibility check on the candidate range.
pub enum Candidates {
    Feasible(Vec<usize>),
    /// Derived range was empty — corpus too small; bypass clustering.
    TooSmall,
}

/// Clamp the configured range to what silhouette admits (2 <= k <= n - 1).
pub fn feasible_candidates(
    cfg: &SelectorConfig,
    n_rows: usize,
) -> Result<Candidates, GroupingError> {
    let lo = cfg.k_min.max(2);
    let hi = cfg.k_max.min(n_rows.saturating_sub(1));
    if lo > hi {
        if cfg.explicit_range {
            return Err(GroupingError::EmptyCandidateRange {
                k_min: cfg.k_min,
                k_max: cfg.k_max,
                points: n_rows,
            });
        }
        return Ok(Candidates::TooSmall);
    }
    Ok(Candidates::Feasible((lo..=hi).collect()))
}

/// Run the sweep and produce the authoritative assignment.
///
/// Precondition: `feasible_candidates` returned `Feasible(candidates)`.
pub fn select(
    space: &VectorSpace,
    candidates: &[usize],
    cfg: &SelectorConfig,
) -> Result<Selection, GroupingError> {
    let row_indices: Vec<usize> = (0..space.len()).collect();
    info!(
        candidates = candidates.len(),
        k_min = candidates.first().copied(),
        k_max = candidates.last().copied(),
        "sweeping candidate cluster counts"
    );

    // Each k is independent; the sweep keeps metrics only, runs are transient.
    let evaluated: Vec<(usize, Result<ClusterMetrics, GroupingError>)> = candidates
        .par_iter()
        .map(|&k| (k, evaluate_k(space, &row_indices, cfg, k)))
        .collect();

    let mut report = PerformanceReport::default();
    for (k, outcome) in evaluated {
        match outcome {
            Ok(metrics) => {
                debug!(
                    k,
                    cohesion = metrics.cohesion_score,
                    inertia = metrics.inertia,
                    combined = metrics.combined_score,
                    "evaluated candidate"
                );
                report.per_k.insert(k, metrics);
            }
            Err(err) => {
                warn!(k, error = %err, "candidate k failed; skipping");
            }
        }
    }
    if report.per_k.is_empty() {
        return Err(GroupingError::NoViableClustering);
    }

    let ks: Vec<usize> = report.per_k.keys().copied().collect();
    let cohesion: Vec<f64> = report.per_k.values().map(|m| m.cohesion_score).collect();
    let selected = plateau_select(&ks, &cohesion, cfg.plateau_threshold);
    info!(selected_k = selected, "cohesion plateau selection");
    report.selected_k = Some(selected);

    // Authoritative re-run at the selected k, same seeded algorithm.
    let run = kmeans::run(space, &row_indices, &cfg.kmeans_config(selected))?;
    let metrics = evaluate_run(space, &row_indices, cfg, selected, &run)?;
    Ok(Selection {
        run: ClusterRun {
            k: selected,
            assignment: run.assignment,
            metrics,
        },
        report,
    })
}

/// Plateau detection: first k whose cohesion slope magnitude drops below
/// the threshold; the largest tested k when none qualifies.
///
/// `ks` is sorted ascending and `cohesion` is aligned with it.
pub fn plateau_select(ks: &[usize], cohesion: &[f64], threshold: f64) -> usize {
    for i in 0..cohesion.len().saturating_sub(1) {
        let slope = cohesion[i + 1] - cohesion[i];
        if slope.abs() < threshold {
            debug!(k = ks[i], slope, "plateau detected");
            return ks[i];
        }
    }
    *ks.last().unwrap_or(&0)
}

fn evaluate_k(
    space: &VectorSpace,
    row_indices: &[usize],
    cfg: &SelectorConfig,
    k: usize,
) -> Result<ClusterMetrics, GroupingError> {
    let run = kmeans::run(space, row_indices, &cfg.kmeans_config(k))?;
    evaluate_run(space, row_indices, cfg, k, &run)
}

/// Score one partition: cohesion, inertia, size variance, combined.
fn evaluate_run(
    space: &VectorSpace,
    row_indices: &[usize],
    cfg: &SelectorConfig,
    k: usize,
    run: &KMeansRun,
) -> Result<ClusterMetrics, GroupingError> {
    let n = row_indices.len();
    let cohesion = silhouette::mean_silhouette(space, row_indices, &run.assignment, k)?;
    let inertia_per_item = run.inertia / n as f64;

    // Population variance of cluster sizes.
    let sizes: Vec<f64> = run.cluster_sizes.iter().map(|&s| s as f64).collect();
    let mean = sizes.iter().sum::<f64>() / sizes.len() as f64;
    let size_variance = sizes.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / sizes.len() as f64;

    let combined = cohesion
        - inertia_per_item * cfg.inertia_weight
        - size_variance * cfg.variance_weight;

    Ok(ClusterMetrics {
        cohesion_score: cohesion,
        inertia: run.inertia,
        inertia_per_item,
        cluster_size_variance: size_variance,
        combined_score: combined,
        cluster_sizes: run.cluster_sizes.clone(),
    })
}
