//! Group validation and artifact emission.
//!
//! A group with no anchoring event member cannot be safely summarized
//! downstream, so it is dropped — counted and logged, never an error.
//! Surviving groups land in `group_result.csv`; the full per-k sweep
//! metrics land in `clustering_performance.json`. Consumers may assume
//! every emitted row has a non-empty event list and size within the cap.

use std::fs;
use std::path::{Path, PathBuf};

use storygroup_core::constants::{GROUP_RESULT_FILE, PERFORMANCE_FILE};
use storygroup_core::{ContentKind, Corpus, Group, GroupRow, GroupingError, PerformanceReport};
use tracing::{debug, info};

/// Validation outcome: rows to emit plus the rejection count.
#[derive(Debug, Clone)]
pub struct ValidationSummary {
    pub rows: Vec<GroupRow>,
    pub rejected: usize,
}

/// Partition each group's members by kind and reject event-less groups.
pub fn validate(corpus: &Corpus, groups: &[Group]) -> ValidationSummary {
    let mut ordered: Vec<&Group> = groups.iter().collect();
    ordered.sort_by_key(|g| g.group_id);

    let mut rows = Vec::with_capacity(ordered.len());
    let mut rejected = 0usize;

    for group in ordered {
        let mut event_ids = Vec::new();
        let mut post_ids = Vec::new();
        for &row in &group.members {
            // Members always index into the run's corpus.
            if let Some(item) = corpus.get(row) {
                match item.kind {
                    ContentKind::Event => event_ids.push(item.content_id.clone()),
                    ContentKind::Post => post_ids.push(item.content_id.clone()),
                }
            }
        }

        if event_ids.is_empty() {
            debug!(group_id = group.group_id, size = group.size(), "rejecting group without events");
            rejected += 1;
            continue;
        }
        rows.push(GroupRow {
            group_id: group.group_id,
            size: group.size(),
            event_ids,
            post_ids,
        });
    }

    info!(surviving = rows.len(), rejected, "validation complete");
    ValidationSummary { rows, rejected }
}

/// Writes the run's artifacts under `<data_root>/group/<date>/`.
pub struct Emitter {
    output_dir: PathBuf,
}

impl Emitter {
    pub fn new(data_root: &Path, date: &str) -> Self {
        Self {
            output_dir: data_root.join("group").join(date),
        }
    }

    pub fn result_path(&self) -> PathBuf {
        self.output_dir.join(GROUP_RESULT_FILE)
    }

    pub fn performance_path(&self) -> PathBuf {
        self.output_dir.join(PERFORMANCE_FILE)
    }

    /// Write the group-result CSV. Id lists are JSON-encoded in their cells.
    pub fn write_groups(&self, rows: &[GroupRow]) -> Result<(), GroupingError> {
        fs::create_dir_all(&self.output_dir)?;
        let mut writer = csv::Writer::from_path(self.result_path())?;
        writer.write_record(["group_id", "size", "event_ids", "post_ids"])?;
        for row in rows {
            writer.write_record([
                row.group_id.to_string(),
                row.size.to_string(),
                serde_json::to_string(&row.event_ids)?,
                serde_json::to_string(&row.post_ids)?,
            ])?;
        }
        writer.flush()?;
        info!(path = %self.result_path().display(), rows = rows.len(), "wrote group results");
        Ok(())
    }

    /// Write the per-k clustering metrics artifact.
    pub fn write_performance(&self, report: &PerformanceReport) -> Result<(), GroupingError> {
        fs::create_dir_all(&self.output_dir)?;
        let json = serde_json::to_string_pretty(report)?;
        fs::write(self.performance_path(), json)?;
        info!(path = %self.performance_path().display(), "wrote clustering performance");
        Ok(())
    }
}

/// Parse an emitted group-result CSV back into rows. Used by operators'
/// re-grouping tooling and by the idempotence check in the CLI.
pub fn read_group_result(path: &Path) -> Result<Vec<GroupRow>, GroupingError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let group_id = record.get(0).unwrap_or("0").parse().unwrap_or(0);
        let size = record.get(1).unwrap_or("0").parse().unwrap_or(0);
        let event_ids: Vec<String> = serde_json::from_str(record.get(2).unwrap_or("[]"))?;
        let post_ids: Vec<String> = serde_json::from_str(record.get(3).unwrap_or("[]"))?;
        rows.push(GroupRow {
            group_id,
            size,
            event_ids,
            post_ids,
        });
    }
    Ok(rows)
}
