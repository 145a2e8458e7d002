//! Data model for one grouping run.
//!
//! A run loads a [`Corpus`] once, derives a vector space from it, and
//! produces [`Group`]s that reference corpus rows by index — groups never
//! own item data, so splitting a group can never lose or duplicate an item
//! that the corpus holds.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::errors::GroupingError;

/// Whether an item came from a news event card or a social post card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Event,
    Post,
}

impl ContentKind {
    /// Stable lowercase name, used in logs and artifact rows.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Post => "post",
        }
    }
}

/// One event- or post-derived text record to be grouped.
///
/// Immutable once loaded. Identity is `content_id`, unique within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Source-assigned id, or a positional fallback (`event_3`, `post_7`).
    pub content_id: String,
    pub kind: ContentKind,
    /// Concatenated descriptive text, non-empty after trimming.
    pub text: String,
    /// Which card directory the item came from.
    pub origin: String,
}

/// Ordered, read-only collection of content items for one processing date.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    items: Vec<ContentItem>,
}

impl Corpus {
    /// Build a corpus, enforcing content-id uniqueness within the run.
    pub fn new(items: Vec<ContentItem>) -> Result<Self, GroupingError> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for item in &items {
            if !seen.insert(item.content_id.as_str()) {
                return Err(GroupingError::DuplicateContentId {
                    content_id: item.content_id.clone(),
                });
            }
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ContentItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.iter()
    }
}

/// A set of content items treated as one story.
///
/// Members are row indices into the corpus (and the vector space, which is
/// aligned with it), so `size == member count` holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Globally unique within a run. Initial groups start at 1; split
    /// children are numbered above the running maximum.
    pub group_id: u32,
    /// Corpus row indices of the members.
    pub members: Vec<usize>,
}

impl Group {
    pub fn new(group_id: u32, members: Vec<usize>) -> Self {
        Self { group_id, members }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Internal quality metrics for one clustering run at a fixed k.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMetrics {
    /// Mean silhouette coefficient; rewards tight, well-separated clusters.
    pub cohesion_score: f64,
    /// Sum of squared distances to assigned centroids.
    pub inertia: f64,
    pub inertia_per_item: f64,
    /// Population variance of cluster sizes; penalizes lopsided partitions.
    pub cluster_size_variance: f64,
    /// Diagnostic composite; not the selection signal.
    pub combined_score: f64,
    pub cluster_sizes: Vec<usize>,
}

/// The authoritative clustering: assignment of every corpus row to one of
/// `k` clusters, with the metrics of that final run.
#[derive(Debug, Clone)]
pub struct ClusterRun {
    pub k: usize,
    /// `assignment[row] ∈ 0..k`, aligned with corpus order.
    pub assignment: Vec<usize>,
    pub metrics: ClusterMetrics,
}

/// Every candidate k's metrics, persisted for offline diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Metrics keyed by tested k, in increasing-k order.
    pub per_k: BTreeMap<usize, ClusterMetrics>,
    /// The k the plateau rule selected, if clustering ran at all.
    pub selected_k: Option<usize>,
}

/// One row of the emitted group-result artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRow {
    pub group_id: u32,
    pub size: usize,
    /// Content ids of the anchoring event members; non-empty for every
    /// surviving group.
    pub event_ids: Vec<String>,
    pub post_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, kind: ContentKind) -> ContentItem {
        ContentItem {
            content_id: id.to_string(),
            kind,
            text: "some text".to_string(),
            origin: "event_card".to_string(),
        }
    }

    #[test]
    fn corpus_rejects_duplicate_ids() {
        let items = vec![item("a", ContentKind::Event), item("a", ContentKind::Post)];
        let err = Corpus::new(items).unwrap_err();
        assert!(matches!(
            err,
            GroupingError::DuplicateContentId { content_id } if content_id == "a"
        ));
    }

    #[test]
    fn corpus_preserves_order() {
        let items = vec![
            item("e1", ContentKind::Event),
            item("p1", ContentKind::Post),
            item("e2", ContentKind::Event),
        ];
        let corpus = Corpus::new(items).unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.get(1).unwrap().content_id, "p1");
    }

    #[test]
    fn group_size_is_member_count() {
        let group = Group::new(7, vec![0, 3, 5]);
        assert_eq!(group.size(), 3);
    }

    #[test]
    fn kind_names() {
        assert_eq!(ContentKind::Event.name(), "event");
        assert_eq!(ContentKind::Post.name(), "post");
    }
}
