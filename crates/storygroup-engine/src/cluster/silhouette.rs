//! Mean silhouette coefficient — the cohesion score of a partition.
//!
//! Euclidean distances over the sparse rows. Singleton clusters score 0
//! for their lone member. Defined only for 2 <= k <= n - 1.

use storygroup_core::GroupingError;

use crate::vectorize::VectorSpace;

/// Mean silhouette coefficient across all rows in `row_indices`.
///
/// `assignment[i] ∈ 0..k` is aligned with `row_indices`.
pub fn mean_silhouette(
    space: &VectorSpace,
    row_indices: &[usize],
    assignment: &[usize],
    k: usize,
) -> Result<f64, GroupingError> {
    let n = row_indices.len();
    if k < 2 || k + 1 > n {
        return Err(GroupingError::DegenerateClustering { k, points: n });
    }

    let mut cluster_sizes = vec![0usize; k];
    for &cluster in assignment {
        cluster_sizes[cluster] += 1;
    }

    // Full pairwise distance matrix; corpora are daily-sized, so n² is fine.
    let mut dist = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = space
                .row(row_indices[i])
                .sq_dist(space.row(row_indices[j]))
                .sqrt();
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = assignment[i];
        if cluster_sizes[own] <= 1 {
            // Convention: a singleton contributes 0.
            continue;
        }

        // Mean distance to every cluster.
        let mut sums = vec![0.0f64; k];
        for j in 0..n {
            if j != i {
                sums[assignment[j]] += dist[i * n + j];
            }
        }

        let a = sums[own] / (cluster_sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && cluster_sizes[c] > 0)
            .map(|c| sums[c] / cluster_sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Ok(total / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorize::VectorSpace;

    #[test]
    fn well_separated_blobs_score_high() {
        let mut rows = Vec::new();
        for i in 0..5 {
            rows.push(vec![i as f64 * 0.01, 0.0]);
        }
        for i in 0..5 {
            rows.push(vec![100.0 + i as f64 * 0.01, 100.0]);
        }
        let space = VectorSpace::from_dense(&rows);
        let indices: Vec<usize> = (0..10).collect();
        let assignment = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        let score = mean_silhouette(&space, &indices, &assignment, 2).unwrap();
        assert!(score > 0.95, "score {score}");
    }

    #[test]
    fn mixed_assignment_scores_lower() {
        let mut rows = Vec::new();
        for i in 0..5 {
            rows.push(vec![i as f64 * 0.01, 0.0]);
        }
        for i in 0..5 {
            rows.push(vec![100.0 + i as f64 * 0.01, 100.0]);
        }
        let space = VectorSpace::from_dense(&rows);
        let indices: Vec<usize> = (0..10).collect();
        let good = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        let bad = vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 1];
        let good_score = mean_silhouette(&space, &indices, &good, 2).unwrap();
        let bad_score = mean_silhouette(&space, &indices, &bad, 2).unwrap();
        assert!(good_score > bad_score);
    }

    #[test]
    fn singletons_contribute_zero() {
        let rows = vec![vec![0.0, 0.0], vec![0.1, 0.0], vec![50.0, 50.0]];
        let space = VectorSpace::from_dense(&rows);
        let indices = vec![0, 1, 2];
        // Cluster 1 is a singleton.
        let score = mean_silhouette(&space, &indices, &[0, 0, 1], 2).unwrap();
        // The two cluster-0 members score near 1, the singleton 0.
        assert!(score > 0.6 && score < 1.0, "score {score}");
    }

    #[test]
    fn rejects_degenerate_k() {
        let rows = vec![vec![0.0], vec![1.0], vec![2.0]];
        let space = VectorSpace::from_dense(&rows);
        let indices = vec![0, 1, 2];
        assert!(mean_silhouette(&space, &indices, &[0, 0, 0], 1).is_err());
        assert!(mean_silhouette(&space, &indices, &[0, 1, 2], 3).is_err());
    }
}
