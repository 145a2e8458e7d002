//! Seeded k-means over slices of the shared vector space.
//!
//! Lloyd's algorithm with k-means++ seeding, Euclidean distance, and a
//! fixed number of seeded restarts keeping the lowest-inertia run. Empty
//! clusters are repaired deterministically by stealing the farthest point
//! from the largest cluster, so a run always ends with k non-empty
//! clusters — the size enforcer relies on that to make progress.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use storygroup_core::GroupingError;

use crate::vectorize::VectorSpace;

/// Parameters for one k-means invocation.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub k: usize,
    /// Seeded restarts; the lowest-inertia run wins.
    pub n_init: usize,
    pub max_iterations: usize,
    /// Centroid-shift convergence tolerance.
    pub tolerance: f64,
    /// Base seed; restart i uses seed + i.
    pub seed: u64,
}

/// Best run across all restarts.
#[derive(Debug, Clone)]
pub struct KMeansRun {
    /// `assignment[i] ∈ 0..k`, aligned with the input row-index slice.
    pub assignment: Vec<usize>,
    pub inertia: f64,
    /// All k entries are non-zero.
    pub cluster_sizes: Vec<usize>,
}

/// Cluster the given rows of the space into `cfg.k` clusters.
///
/// `row_indices` selects the rows; the assignment is aligned with it.
pub fn run(
    space: &VectorSpace,
    row_indices: &[usize],
    cfg: &KMeansConfig,
) -> Result<KMeansRun, GroupingError> {
    let n = row_indices.len();
    if cfg.k == 0 || cfg.k > n {
        return Err(GroupingError::DegenerateClustering {
            k: cfg.k,
            points: n,
        });
    }

    let mut best: Option<KMeansRun> = None;
    for init in 0..cfg.n_init.max(1) {
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed.wrapping_add(init as u64));
        let run = lloyd(space, row_indices, cfg, &mut rng);
        let better = match &best {
            Some(current) => run.inertia < current.inertia,
            None => true,
        };
        if better {
            best = Some(run);
        }
    }
    // n_init >= 1, so best is always populated here.
    best.ok_or(GroupingError::DegenerateClustering {
        k: cfg.k,
        points: n,
    })
}

/// One seeded restart: k-means++ init then Lloyd iterations.
fn lloyd(
    space: &VectorSpace,
    row_indices: &[usize],
    cfg: &KMeansConfig,
    rng: &mut ChaCha8Rng,
) -> KMeansRun {
    let n = row_indices.len();
    let k = cfg.k;
    let dim = space.dim();

    let mut centroids = plus_plus_init(space, row_indices, k, rng);
    let mut assignment = vec![0usize; n];

    for _ in 0..cfg.max_iterations {
        // Assignment step.
        let centroid_norms: Vec<f64> = centroids
            .iter()
            .map(|c| c.iter().map(|v| v * v).sum())
            .collect();
        for (slot, &row) in row_indices.iter().enumerate() {
            let (cluster, _) = nearest(space, row, &centroids, &centroid_norms);
            assignment[slot] = cluster;
        }

        // Update step.
        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (slot, &row) in row_indices.iter().enumerate() {
            space.row(row).add_to_dense(&mut sums[assignment[slot]]);
            counts[assignment[slot]] += 1;
        }
        repair_empty_clusters(space, row_indices, &mut assignment, &mut sums, &mut counts);

        let mut shift = 0.0;
        for (cluster, sum) in sums.iter_mut().enumerate() {
            let count = counts[cluster] as f64;
            for v in sum.iter_mut() {
                *v /= count;
            }
            shift += centroids[cluster]
                .iter()
                .zip(sum.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>();
        }
        centroids = sums;

        if shift < cfg.tolerance {
            break;
        }
    }

    // Final pass so assignment and inertia match the last centroids.
    let centroid_norms: Vec<f64> = centroids
        .iter()
        .map(|c| c.iter().map(|v| v * v).sum())
        .collect();
    let mut inertia = 0.0;
    let mut cluster_sizes = vec![0usize; k];
    for (slot, &row) in row_indices.iter().enumerate() {
        let (cluster, dist) = nearest(space, row, &centroids, &centroid_norms);
        assignment[slot] = cluster;
        inertia += dist;
        cluster_sizes[cluster] += 1;
    }
    if cluster_sizes.iter().any(|&s| s == 0) {
        // The final reassignment emptied a repaired cluster; pin each empty
        // cluster to the farthest member of the largest one.
        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (slot, &row) in row_indices.iter().enumerate() {
            space.row(row).add_to_dense(&mut sums[assignment[slot]]);
            counts[assignment[slot]] += 1;
        }
        repair_empty_clusters(space, row_indices, &mut assignment, &mut sums, &mut counts);
        cluster_sizes = vec![0usize; k];
        inertia = 0.0;
        for (slot, &row) in row_indices.iter().enumerate() {
            let cluster = assignment[slot];
            cluster_sizes[cluster] += 1;
            inertia += space
                .row(row)
                .sq_dist_dense(&centroids[cluster], centroid_norms[cluster]);
        }
    }

    KMeansRun {
        assignment,
        inertia,
        cluster_sizes,
    }
}

/// k-means++ seeding: each next centroid is sampled proportionally to the
/// squared distance from the nearest already-chosen centroid.
fn plus_plus_init(
    space: &VectorSpace,
    row_indices: &[usize],
    k: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<Vec<f64>> {
    let n = row_indices.len();
    let dim = space.dim();
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);

    let first = rng.gen_range(0..n);
    centroids.push(space.row(row_indices[first]).to_dense(dim));

    let mut nearest_sq = vec![0.0f64; n];
    while centroids.len() < k {
        let last = centroids.last().map(|c| c.as_slice()).unwrap_or(&[]);
        let last_norm: f64 = last.iter().map(|v| v * v).sum();
        for (slot, &row) in row_indices.iter().enumerate() {
            let d = space.row(row).sq_dist_dense(last, last_norm);
            if centroids.len() == 1 || d < nearest_sq[slot] {
                nearest_sq[slot] = d;
            }
        }
        let total: f64 = nearest_sq.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = n - 1;
            for (slot, &d) in nearest_sq.iter().enumerate() {
                if target < d {
                    pick = slot;
                    break;
                }
                target -= d;
            }
            pick
        } else {
            // All remaining points coincide with a centroid.
            rng.gen_range(0..n)
        };
        centroids.push(space.row(row_indices[chosen]).to_dense(dim));
    }
    centroids
}

/// Index and squared distance of the nearest centroid for one row.
fn nearest(
    space: &VectorSpace,
    row: usize,
    centroids: &[Vec<f64>],
    centroid_norms: &[f64],
) -> (usize, f64) {
    let mut best_cluster = 0;
    let mut best_dist = f64::INFINITY;
    for (cluster, centroid) in centroids.iter().enumerate() {
        let d = space.row(row).sq_dist_dense(centroid, centroid_norms[cluster]);
        if d < best_dist {
            best_dist = d;
            best_cluster = cluster;
        }
    }
    (best_cluster, best_dist)
}

/// Move the farthest member of the largest cluster into each empty cluster.
/// Deterministic: ties resolve to the lowest slot index.
fn repair_empty_clusters(
    space: &VectorSpace,
    row_indices: &[usize],
    assignment: &mut [usize],
    sums: &mut [Vec<f64>],
    counts: &mut [usize],
) {
    loop {
        let Some(empty) = counts.iter().position(|&c| c == 0) else {
            return;
        };
        let donor = counts
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(cluster, _)| cluster)
            .unwrap_or(0);
        if counts[donor] < 2 {
            // Cannot steal without emptying the donor; caller guards k <= n,
            // so this only happens when every cluster is a singleton.
            return;
        }

        // Donor mean for farthest-point selection.
        let mean: Vec<f64> = sums[donor]
            .iter()
            .map(|v| v / counts[donor] as f64)
            .collect();
        let mean_norm: f64 = mean.iter().map(|v| v * v).sum();

        let mut stolen_slot = None;
        let mut stolen_dist = -1.0;
        for (slot, &row) in row_indices.iter().enumerate() {
            if assignment[slot] != donor {
                continue;
            }
            let d = space.row(row).sq_dist_dense(&mean, mean_norm);
            if d > stolen_dist {
                stolen_dist = d;
                stolen_slot = Some(slot);
            }
        }
        let Some(slot) = stolen_slot else { return };
        let row = row_indices[slot];

        assignment[slot] = empty;
        counts[donor] -= 1;
        counts[empty] += 1;
        let dense = space.row(row).to_dense(sums[donor].len());
        for (i, v) in dense.iter().enumerate() {
            sums[donor][i] -= v;
            sums[empty][i] += v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorize::VectorSpace;

    fn two_blob_space() -> (VectorSpace, Vec<usize>) {
        // Two tight blobs far apart in 2D.
        let mut rows = Vec::new();
        for i in 0..10 {
            rows.push(vec![0.0 + (i as f64) * 0.01, 0.0]);
        }
        for i in 0..10 {
            rows.push(vec![10.0 + (i as f64) * 0.01, 10.0]);
        }
        let indices = (0..rows.len()).collect();
        (VectorSpace::from_dense(&rows), indices)
    }

    fn config(k: usize) -> KMeansConfig {
        KMeansConfig {
            k,
            n_init: 10,
            max_iterations: 100,
            tolerance: 1e-4,
            seed: 42,
        }
    }

    #[test]
    fn separates_two_blobs() {
        let (space, indices) = two_blob_space();
        let run = run(&space, &indices, &config(2)).unwrap();
        assert_eq!(run.cluster_sizes, vec![10, 10]);
        // All of the first blob shares one label, all of the second the other.
        let first = run.assignment[0];
        assert!(run.assignment[..10].iter().all(|&c| c == first));
        assert!(run.assignment[10..].iter().all(|&c| c != first));
        assert!(run.inertia < 1.0);
    }

    #[test]
    fn deterministic_across_calls() {
        let (space, indices) = two_blob_space();
        let a = run(&space, &indices, &config(3)).unwrap();
        let b = run(&space, &indices, &config(3)).unwrap();
        assert_eq!(a.assignment, b.assignment);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn different_seed_may_differ_but_stays_valid() {
        let (space, indices) = two_blob_space();
        let mut cfg = config(4);
        cfg.seed = 7;
        let run = run(&space, &indices, &cfg).unwrap();
        assert_eq!(run.cluster_sizes.len(), 4);
        assert!(run.cluster_sizes.iter().all(|&s| s > 0));
        assert_eq!(run.cluster_sizes.iter().sum::<usize>(), 20);
    }

    #[test]
    fn identical_points_still_fill_all_clusters() {
        let rows = vec![vec![1.0, 1.0]; 8];
        let space = VectorSpace::from_dense(&rows);
        let indices: Vec<usize> = (0..8).collect();
        let run = run(&space, &indices, &config(2)).unwrap();
        assert!(run.cluster_sizes.iter().all(|&s| s > 0));
        assert_eq!(run.cluster_sizes.iter().sum::<usize>(), 8);
    }

    #[test]
    fn rejects_k_larger_than_points() {
        let (space, indices) = two_blob_space();
        let err = run(&space, &indices[..3], &config(5)).unwrap_err();
        assert!(matches!(
            err,
            GroupingError::DegenerateClustering { k: 5, points: 3 }
        ));
    }

    #[test]
    fn works_on_row_subset() {
        let (space, _) = two_blob_space();
        // Only blob-two rows.
        let subset: Vec<usize> = (10..20).collect();
        let run = run(&space, &subset, &config(2)).unwrap();
        assert_eq!(run.assignment.len(), 10);
        assert_eq!(run.cluster_sizes.iter().sum::<usize>(), 10);
    }
}
