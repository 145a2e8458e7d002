//! Content aggregation: event and post cards for one date become a corpus.
//!
//! Either card file may be missing or empty; a missing file is a warning,
//! not an error, and per-row decode failures skip the row. The per-run
//! cache is an explicit value owned by the pipeline — nothing persists
//! across runs unless the caller keeps the cache alive, and `invalidate`
//! drops everything loaded.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::Deserialize;
use storygroup_core::{ContentItem, ContentKind, Corpus, GroupingError};
use tracing::{info, warn};

/// One row of an event card CSV. Extra columns are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub event_description: Option<String>,
    #[serde(default)]
    pub statement_or_comment: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
}

/// One row of a post card CSV. Extra columns are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PostRecord {
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// One row of the raw publisher feed, read only for `publisher` diversity.
#[derive(Debug, Clone, Deserialize)]
struct PublisherRecord {
    #[serde(default)]
    publisher: Option<String>,
}

/// Loaded inputs for one run, scoped to that run.
#[derive(Debug, Default)]
pub struct RunCache {
    events: Option<Vec<EventRecord>>,
    posts: Option<Vec<PostRecord>>,
    /// Outer None = not yet read; inner None = feed unreadable.
    publishers: Option<Option<usize>>,
}

impl RunCache {
    /// Drop everything loaded; the next access re-reads from disk.
    pub fn invalidate(&mut self) {
        self.events = None;
        self.posts = None;
        self.publishers = None;
    }
}

/// Merges event and post records for one date into a corpus.
pub struct Aggregator {
    data_root: PathBuf,
    date: String,
}

impl Aggregator {
    pub fn new(data_root: &Path, date: &str) -> Self {
        Self {
            data_root: data_root.to_path_buf(),
            date: date.to_string(),
        }
    }

    fn event_card_path(&self) -> PathBuf {
        self.data_root
            .join("card")
            .join("event_card")
            .join(format!("{}.csv", self.date))
    }

    fn post_card_path(&self) -> PathBuf {
        self.data_root
            .join("card")
            .join("statement_card")
            .join("posts")
            .join(format!("{}.csv", self.date))
    }

    fn publisher_feed_path(&self) -> PathBuf {
        self.data_root
            .join("raw")
            .join("fundus")
            .join(&self.date)
            .join(format!("{}.csv", self.date))
    }

    /// Load both card files into the cache (no-op for already-loaded ones).
    pub fn load(&self, cache: &mut RunCache) -> Result<(), GroupingError> {
        if cache.events.is_none() {
            let events = read_rows::<EventRecord>(&self.event_card_path(), "event")?;
            info!(date = %self.date, events = events.len(), "loaded event cards");
            cache.events = Some(events);
        }
        if cache.posts.is_none() {
            let posts = read_rows::<PostRecord>(&self.post_card_path(), "post")?;
            info!(date = %self.date, posts = posts.len(), "loaded post cards");
            cache.posts = Some(posts);
        }
        Ok(())
    }

    /// Build the corpus: concatenated text per record, empty items dropped,
    /// positional id fallback when the source lacks one.
    pub fn build_corpus(&self, cache: &mut RunCache) -> Result<Corpus, GroupingError> {
        self.load(cache)?;
        let events = cache.events.as_deref().unwrap_or(&[]);
        let posts = cache.posts.as_deref().unwrap_or(&[]);

        let mut items = Vec::with_capacity(events.len() + posts.len());
        let mut dropped = 0usize;

        for (row, event) in events.iter().enumerate() {
            let text = join_fields(&event.event_description, &event.statement_or_comment);
            if text.is_empty() {
                dropped += 1;
                continue;
            }
            items.push(ContentItem {
                content_id: event
                    .event_id
                    .clone()
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| format!("event_{row}")),
                kind: ContentKind::Event,
                text,
                origin: "event_card".to_string(),
            });
        }

        for (row, post) in posts.iter().enumerate() {
            let text = join_fields(&post.title, &post.content);
            if text.is_empty() {
                dropped += 1;
                continue;
            }
            items.push(ContentItem {
                content_id: post
                    .post_id
                    .clone()
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| format!("post_{row}")),
                kind: ContentKind::Post,
                text,
                origin: "statement_card".to_string(),
            });
        }

        if dropped > 0 {
            warn!(dropped, "dropped items with empty text");
        }
        info!(items = items.len(), "aggregated corpus");
        Corpus::new(items)
    }

    /// Count of distinct publishers in the raw feed for this date, used to
    /// derive the sweep's lower bound. None when the feed is unreadable.
    pub fn distinct_publishers(&self, cache: &mut RunCache) -> Option<usize> {
        if let Some(cached) = cache.publishers {
            return cached;
        }
        let path = self.publisher_feed_path();
        let count = match read_rows::<PublisherRecord>(&path, "publisher") {
            Ok(rows) if !rows.is_empty() => {
                let distinct: FxHashSet<&str> = rows
                    .iter()
                    .filter_map(|r| r.publisher.as_deref())
                    .filter(|p| !p.trim().is_empty())
                    .collect();
                Some(distinct.len())
            }
            Ok(_) => None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "publisher feed unreadable");
                None
            }
        };
        cache.publishers = Some(count);
        count
    }
}

/// Read a card CSV, tolerating a missing file and bad rows.
fn read_rows<T: serde::de::DeserializeOwned>(
    path: &Path,
    label: &str,
) -> Result<Vec<T>, GroupingError> {
    if !path.exists() {
        warn!(path = %path.display(), "no {label} data found");
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rows = Vec::new();
    for (row, record) in reader.deserialize::<T>().enumerate() {
        match record {
            Ok(value) => rows.push(value),
            Err(err) => {
                warn!(row, error = %err, "skipping malformed {label} row");
            }
        }
    }
    Ok(rows)
}

/// Concatenate two optional text fields with a single space, trimmed.
fn join_fields(first: &Option<String>, second: &Option<String>) -> String {
    let a = first.as_deref().unwrap_or("").trim();
    let b = second.as_deref().unwrap_or("").trim();
    match (a.is_empty(), b.is_empty()) {
        (true, true) => String::new(),
        (false, true) => a.to_string(),
        (true, false) => b.to_string(),
        (false, false) => format!("{a} {b}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DATE: &str = "2025-06-21";

    fn write_cards(root: &Path, events: &str, posts: &str) {
        let event_dir = root.join("card/event_card");
        let post_dir = root.join("card/statement_card/posts");
        fs::create_dir_all(&event_dir).unwrap();
        fs::create_dir_all(&post_dir).unwrap();
        fs::write(event_dir.join(format!("{DATE}.csv")), events).unwrap();
        fs::write(post_dir.join(format!("{DATE}.csv")), posts).unwrap();
    }

    #[test]
    fn builds_corpus_from_both_cards() {
        let tmp = TempDir::new().unwrap();
        write_cards(
            tmp.path(),
            "event_id,event_description,statement_or_comment\n\
             ev1,storm hits coast,mayor urges evacuation\n\
             ev2,,\n\
             ,budget approved,\n",
            "post_id,title,content\n\
             p1,flooding downtown,my street is underwater\n",
        );

        let aggregator = Aggregator::new(tmp.path(), DATE);
        let mut cache = RunCache::default();
        let corpus = aggregator.build_corpus(&mut cache).unwrap();

        // ev2 dropped (empty text); the id-less event got a positional id.
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.get(0).unwrap().content_id, "ev1");
        assert_eq!(corpus.get(0).unwrap().text, "storm hits coast mayor urges evacuation");
        assert_eq!(corpus.get(1).unwrap().content_id, "event_2");
        assert_eq!(corpus.get(2).unwrap().kind, ContentKind::Post);
        assert_eq!(corpus.get(2).unwrap().origin, "statement_card");
    }

    #[test]
    fn missing_files_yield_empty_corpus() {
        let tmp = TempDir::new().unwrap();
        let aggregator = Aggregator::new(tmp.path(), DATE);
        let mut cache = RunCache::default();
        let corpus = aggregator.build_corpus(&mut cache).unwrap();
        assert!(corpus.is_empty());
    }

    #[test]
    fn publisher_count_distinct_nonempty() {
        let tmp = TempDir::new().unwrap();
        let feed_dir = tmp.path().join("raw/fundus").join(DATE);
        fs::create_dir_all(&feed_dir).unwrap();
        fs::write(
            feed_dir.join(format!("{DATE}.csv")),
            "publisher,title\nReuters,a\nAP,b\nReuters,c\n,d\n",
        )
        .unwrap();

        let aggregator = Aggregator::new(tmp.path(), DATE);
        let mut cache = RunCache::default();
        assert_eq!(aggregator.distinct_publishers(&mut cache), Some(2));
        // Second read hits the cache.
        assert_eq!(aggregator.distinct_publishers(&mut cache), Some(2));
    }

    #[test]
    fn publisher_count_none_when_feed_missing() {
        let tmp = TempDir::new().unwrap();
        let aggregator = Aggregator::new(tmp.path(), DATE);
        let mut cache = RunCache::default();
        assert_eq!(aggregator.distinct_publishers(&mut cache), None);
    }

    #[test]
    fn invalidate_forces_reload() {
        let tmp = TempDir::new().unwrap();
        write_cards(
            tmp.path(),
            "event_id,event_description,statement_or_comment\nev1,first version,\n",
            "post_id,title,content\n",
        );
        let aggregator = Aggregator::new(tmp.path(), DATE);
        let mut cache = RunCache::default();
        assert_eq!(aggregator.build_corpus(&mut cache).unwrap().len(), 1);

        write_cards(
            tmp.path(),
            "event_id,event_description,statement_or_comment\n\
             ev1,first version,\nev2,second event,\n",
            "post_id,title,content\n",
        );
        // Stale without invalidation, fresh after.
        assert_eq!(aggregator.build_corpus(&mut cache).unwrap().len(), 1);
        cache.invalidate();
        assert_eq!(aggregator.build_corpus(&mut cache).unwrap().len(), 2);
    }

    #[test]
    fn duplicate_ids_are_fatal() {
        let tmp = TempDir::new().unwrap();
        write_cards(
            tmp.path(),
            "event_id,event_description,statement_or_comment\nev1,one,\nev1,two,\n",
            "post_id,title,content\n",
        );
        let aggregator = Aggregator::new(tmp.path(), DATE);
        let mut cache = RunCache::default();
        assert!(matches!(
            aggregator.build_corpus(&mut cache),
            Err(GroupingError::DuplicateContentId { .. })
        ));
    }
}
