//! The 5-stage grouping pipeline.
//!
//! Stage 1: aggregate event and post cards into the corpus
//! Stage 2: fit the TF-IDF vector space
//! Stage 3: adaptive cluster-count sweep and authoritative assignment
//! Stage 4: size enforcement (recursive splitting)
//! Stage 5: validation and artifact emission
//!
//! Nothing is written until stage 5; every fatal error leaves no partial
//! artifacts behind.

use std::path::PathBuf;
use std::time::Instant;

use storygroup_core::constants::{DEFAULT_MAX_CLUSTERS_CAP, DEFAULT_MIN_CLUSTERS, DEFAULT_TOLERANCE};
use storygroup_core::{Group, GroupRow, GroupingConfig, GroupingError, PerformanceReport};
use tracing::{info, warn};

use crate::aggregate::{Aggregator, RunCache};
use crate::cluster::kmeans::KMeansConfig;
use crate::cluster::{self, Candidates, SelectorConfig};
use crate::report::{validate, Emitter};
use crate::split;
use crate::vectorize::VectorSpace;

/// End-of-run accounting, for the CLI's final report line.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub date: String,
    pub corpus_size: usize,
    pub selected_k: Option<usize>,
    pub groups_written: usize,
    pub groups_rejected: usize,
    /// Microseconds per stage: aggregate, vectorize, cluster, split, emit.
    pub stage_times_us: [u64; 5],
}

/// Single-writer batch pipeline for one processing date.
pub struct Pipeline {
    config: GroupingConfig,
    data_root: PathBuf,
}

impl Pipeline {
    pub fn new(config: GroupingConfig) -> Result<Self, GroupingError> {
        config.validate()?;
        let data_root = config.effective_data_root();
        Ok(Self { config, data_root })
    }

    pub fn config(&self) -> &GroupingConfig {
        &self.config
    }

    /// Whether the group-result artifact for this date already exists.
    pub fn result_exists(&self, date: &str) -> bool {
        Emitter::new(&self.data_root, date).result_path().exists()
    }

    /// Run the full pipeline for one date.
    pub fn run(&self, date: &str) -> Result<RunSummary, GroupingError> {
        validate_date(date)?;
        info!(date, max_group_size = self.config.effective_max_group_size(), "starting grouping run");
        let mut stage_times_us = [0u64; 5];

        // Stage 1: aggregate.
        let stage = Instant::now();
        let aggregator = Aggregator::new(&self.data_root, date);
        let mut cache = RunCache::default();
        let corpus = aggregator.build_corpus(&mut cache)?;
        stage_times_us[0] = stage.elapsed().as_micros() as u64;

        let emitter = Emitter::new(&self.data_root, date);
        if corpus.is_empty() {
            warn!(date, "no content for date; emitting single empty group");
            let trivial = GroupRow {
                group_id: 0,
                size: 0,
                event_ids: Vec::new(),
                post_ids: Vec::new(),
            };
            emitter.write_groups(std::slice::from_ref(&trivial))?;
            emitter.write_performance(&PerformanceReport::default())?;
            return Ok(RunSummary {
                date: date.to_string(),
                corpus_size: 0,
                selected_k: None,
                groups_written: 1,
                groups_rejected: 0,
                stage_times_us,
            });
        }

        // Stage 2: vectorize. Fit once; splits re-slice this space.
        let stage = Instant::now();
        let space = VectorSpace::fit(&corpus, self.config.effective_max_terms());
        stage_times_us[1] = stage.elapsed().as_micros() as u64;
        info!(rows = space.len(), dim = space.dim(), "fitted vector space");

        // Stage 3: adaptive clustering.
        let stage = Instant::now();
        let (groups, report) = self.cluster_stage(&space, &aggregator, &mut cache)?;
        stage_times_us[2] = stage.elapsed().as_micros() as u64;
        let selected_k = report.selected_k;

        // Stage 4: size enforcement.
        let stage = Instant::now();
        let base = KMeansConfig {
            k: 1,
            n_init: self.config.effective_n_init(),
            max_iterations: self.config.effective_max_iterations(),
            tolerance: DEFAULT_TOLERANCE,
            seed: self.config.effective_seed(),
        };
        let groups = split::enforce_max_size(
            &space,
            groups,
            self.config.effective_max_group_size(),
            &base,
        )?;
        stage_times_us[3] = stage.elapsed().as_micros() as u64;

        // Stage 5: validate and emit.
        let stage = Instant::now();
        let summary = validate(&corpus, &groups);
        emitter.write_groups(&summary.rows)?;
        emitter.write_performance(&report)?;
        stage_times_us[4] = stage.elapsed().as_micros() as u64;

        info!(
            date,
            corpus = corpus.len(),
            surviving = summary.rows.len(),
            rejected = summary.rejected,
            selected_k,
            "grouping run complete"
        );
        Ok(RunSummary {
            date: date.to_string(),
            corpus_size: corpus.len(),
            selected_k,
            groups_written: summary.rows.len(),
            groups_rejected: summary.rejected,
            stage_times_us,
        })
    }

    /// Stage 3: produce initial groups and the sweep report.
    ///
    /// Corpora too small to sweep bypass clustering entirely and land in a
    /// single group with id 0.
    fn cluster_stage(
        &self,
        space: &VectorSpace,
        aggregator: &Aggregator,
        cache: &mut RunCache,
    ) -> Result<(Vec<Group>, PerformanceReport), GroupingError> {
        let n = space.len();
        if n < 2 {
            warn!(corpus = n, "not enough content for clustering; single group");
            return Ok((vec![Group::new(0, (0..n).collect())], PerformanceReport::default()));
        }

        let explicit_range = self.config.min_clusters.is_some() || self.config.max_clusters.is_some();
        let k_min = self.config.min_clusters.unwrap_or_else(|| {
            match aggregator.distinct_publishers(cache) {
                Some(publishers) => DEFAULT_MIN_CLUSTERS.max(publishers),
                None => DEFAULT_MIN_CLUSTERS,
            }
        });
        let k_max = self
            .config
            .max_clusters
            .unwrap_or_else(|| DEFAULT_MAX_CLUSTERS_CAP.min(n / 3));

        let selector_config = SelectorConfig {
            k_min,
            k_max,
            explicit_range,
            plateau_threshold: self.config.effective_plateau_threshold(),
            inertia_weight: self.config.effective_inertia_weight(),
            variance_weight: self.config.effective_variance_weight(),
            seed: self.config.effective_seed(),
            n_init: self.config.effective_n_init(),
            max_iterations: self.config.effective_max_iterations(),
            tolerance: DEFAULT_TOLERANCE,
        };

        match cluster::feasible_candidates(&selector_config, n)? {
            Candidates::TooSmall => {
                warn!(corpus = n, k_min, k_max, "corpus too small to sweep; single group");
                Ok((vec![Group::new(0, (0..n).collect())], PerformanceReport::default()))
            }
            Candidates::Feasible(candidates) => {
                let selection = cluster::select(space, &candidates, &selector_config)?;
                let groups = split::initial_groups(&selection.run.assignment, selection.run.k);
                Ok((groups, selection.report))
            }
        }
    }
}

/// Strict `YYYY-MM-DD` shape check.
fn validate_date(date: &str) -> Result<(), GroupingError> {
    let bytes = date.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, &b)| matches!(i, 4 | 7) || b.is_ascii_digit());
    let in_range = well_formed && {
        let month: u32 = date[5..7].parse().unwrap_or(0);
        let day: u32 = date[8..10].parse().unwrap_or(0);
        (1..=12).contains(&month) && (1..=31).contains(&day)
    };
    if in_range {
        Ok(())
    } else {
        Err(GroupingError::InvalidDate {
            value: date.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_dates() {
        validate_date("2025-06-21").unwrap();
        validate_date("1999-12-01").unwrap();
    }

    #[test]
    fn rejects_malformed_dates() {
        for bad in ["2025/06/21", "21-06-2025", "2025-13-01", "2025-00-10", "2025-6-1", "junk"] {
            assert!(
                matches!(validate_date(bad), Err(GroupingError::InvalidDate { .. })),
                "{bad} should be rejected"
            );
        }
    }
}
