//! Size enforcement: recursively re-cluster any group over the cap.
//!
//! Groups are processed in ascending id order. An oversized group is
//! re-clustered into `ceil(size / cap)` children on its slice of the shared
//! vector space — never a refit — and the children are re-enqueued, so a
//! child that is still oversized splits again. Child ids come from a
//! counter starting above the current maximum id; a split group disappears
//! and only its children persist.

use std::collections::VecDeque;

use storygroup_core::{Group, GroupingError};
use tracing::{debug, info};

use crate::cluster::kmeans::{self, KMeansConfig};
use crate::vectorize::VectorSpace;

/// Groups from the authoritative assignment; ids are `cluster_index + 1`.
pub fn initial_groups(assignment: &[usize], k: usize) -> Vec<Group> {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (row, &cluster) in assignment.iter().enumerate() {
        members[cluster].push(row);
    }
    members
        .into_iter()
        .enumerate()
        .filter(|(_, m)| !m.is_empty())
        .map(|(cluster, m)| Group::new(cluster as u32 + 1, m))
        .collect()
}

/// Split every group over `max_group_size` until all groups fit.
///
/// On exit: every group's size <= the cap, the member union is exactly the
/// input union, and no member sits in two groups. Groups already within the
/// cap pass through untouched.
pub fn enforce_max_size(
    space: &VectorSpace,
    groups: Vec<Group>,
    max_group_size: usize,
    base: &KMeansConfig,
) -> Result<Vec<Group>, GroupingError> {
    let mut queue: VecDeque<Group> = {
        let mut sorted = groups;
        sorted.sort_by_key(|g| g.group_id);
        sorted.into()
    };
    let mut next_id = queue.iter().map(|g| g.group_id).max().unwrap_or(0) + 1;
    let mut kept = Vec::new();
    let mut splits = 0usize;

    while let Some(group) = queue.pop_front() {
        if group.size() <= max_group_size {
            kept.push(group);
            continue;
        }

        let n_subgroups = group.size().div_ceil(max_group_size);
        if group.size() < n_subgroups || group.size() < 2 {
            return Err(GroupingError::UnsplittableGroup {
                group_id: group.group_id,
                size: group.size(),
                subgroups: n_subgroups,
            });
        }
        info!(
            group_id = group.group_id,
            size = group.size(),
            n_subgroups,
            "splitting oversized group"
        );
        splits += 1;

        let cfg = KMeansConfig {
            k: n_subgroups,
            ..base.clone()
        };
        let run = kmeans::run(space, &group.members, &cfg)?;

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n_subgroups];
        for (slot, &cluster) in run.assignment.iter().enumerate() {
            children[cluster].push(group.members[slot]);
        }
        for members in children.into_iter().filter(|m| !m.is_empty()) {
            let child = Group::new(next_id, members);
            debug!(child_id = child.group_id, size = child.size(), "created subgroup");
            next_id += 1;
            // Re-enqueue: an oversized child splits again.
            queue.push_back(child);
        }
    }

    if splits > 0 {
        info!(splits, groups = kept.len(), "size enforcement complete");
    }
    kept.sort_by_key(|g| g.group_id);
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorize::VectorSpace;
    use rustc_hash::FxHashSet;

    fn base_config() -> KMeansConfig {
        KMeansConfig {
            k: 1,
            n_init: 10,
            max_iterations: 100,
            tolerance: 1e-4,
            seed: 42,
        }
    }

    /// `n` points spread along a line, distinct enough to split cleanly.
    fn line_space(n: usize) -> VectorSpace {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        VectorSpace::from_dense(&rows)
    }

    fn member_set(groups: &[Group]) -> FxHashSet<usize> {
        groups.iter().flat_map(|g| g.members.iter().copied()).collect()
    }

    #[test]
    fn initial_groups_start_at_one() {
        let groups = initial_groups(&[0, 1, 0, 2, 1], 3);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].group_id, 1);
        assert_eq!(groups[0].members, vec![0, 2]);
        assert_eq!(groups[2].group_id, 3);
        assert_eq!(groups[2].members, vec![3]);
    }

    #[test]
    fn within_cap_is_untouched() {
        let space = line_space(10);
        let groups = vec![Group::new(1, (0..4).collect()), Group::new(2, (4..10).collect())];
        let result = enforce_max_size(&space, groups.clone(), 50, &base_config()).unwrap();
        assert_eq!(result, groups);
    }

    #[test]
    fn oversized_group_splits_into_ceil_children() {
        // Scenario: one group of 120 with cap 50 -> exactly 3 children.
        let space = line_space(120);
        let groups = vec![Group::new(1, (0..120).collect())];
        let result = enforce_max_size(&space, groups, 50, &base_config()).unwrap();

        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|g| g.size() <= 50));
        assert_eq!(result.iter().map(Group::size).sum::<usize>(), 120);
        // Fresh ids above the prior maximum.
        assert!(result.iter().all(|g| g.group_id > 1));
        let ids: FxHashSet<u32> = result.iter().map(|g| g.group_id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn no_member_lost_or_duplicated() {
        let space = line_space(180);
        let groups = vec![
            Group::new(1, (0..100).collect()),
            Group::new(2, (100..130).collect()),
            Group::new(3, (130..180).collect()),
        ];
        let before = member_set(&groups);
        let result = enforce_max_size(&space, groups, 40, &base_config()).unwrap();

        assert_eq!(member_set(&result), before);
        let total: usize = result.iter().map(Group::size).sum();
        assert_eq!(total, 180);
        assert!(result.iter().all(|g| g.size() <= 40));
    }

    #[test]
    fn recursive_split_handles_stubborn_children() {
        // Identical points: k-means cannot separate them semantically, but
        // the empty-cluster repair still carves the group down to the cap.
        let rows = vec![vec![1.0, 2.0]; 30];
        let space = VectorSpace::from_dense(&rows);
        let groups = vec![Group::new(1, (0..30).collect())];
        let result = enforce_max_size(&space, groups, 8, &base_config()).unwrap();
        assert!(result.iter().all(|g| g.size() <= 8));
        assert_eq!(result.iter().map(Group::size).sum::<usize>(), 30);
    }

    #[test]
    fn deterministic_split_ids() {
        let space = line_space(120);
        let groups = vec![Group::new(1, (0..120).collect())];
        let a = enforce_max_size(&space, groups.clone(), 50, &base_config()).unwrap();
        let b = enforce_max_size(&space, groups, 50, &base_config()).unwrap();
        assert_eq!(a, b);
    }
}
