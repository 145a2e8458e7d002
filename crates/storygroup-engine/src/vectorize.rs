//! TF-IDF vector space over the corpus text.
//!
//! Terms are lowercased unigrams and adjacent bigrams (stop words removed
//! before bigram formation), the vocabulary is capped at the top `max_terms`
//! terms by total corpus frequency, weights use smoothed idf, and every row
//! is L2-normalized.
//!
//! The space is fit exactly once per run. Sub-clustering re-slices rows by
//! index through the same space; it never refits on a subset, so split
//! children live in the same semantics as their parents.

use rustc_hash::FxHashMap;
use storygroup_core::Corpus;

/// Common English stop words, excluded from the vocabulary.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now",
    "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "said", "same", "she", "should", "so", "some", "such", "than", "that",
    "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
    "you", "your", "yours", "yourself", "yourselves",
];

/// One L2-normalized sparse weight vector. Indices are sorted ascending.
#[derive(Debug, Clone, Default)]
pub struct SparseRow {
    pub indices: Vec<u32>,
    pub values: Vec<f64>,
}

impl SparseRow {
    /// Dot product against a dense vector of the space's dimension.
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.indices
            .iter()
            .zip(&self.values)
            .map(|(&i, &v)| v * dense[i as usize])
            .sum()
    }

    pub fn squared_norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    /// Squared Euclidean distance to a dense centroid with a precomputed
    /// squared norm: ||x||² − 2·x·c + ||c||².
    pub fn sq_dist_dense(&self, centroid: &[f64], centroid_sq_norm: f64) -> f64 {
        (self.squared_norm() - 2.0 * self.dot_dense(centroid) + centroid_sq_norm).max(0.0)
    }

    /// Squared Euclidean distance between two sparse rows (merge walk).
    pub fn sq_dist(&self, other: &SparseRow) -> f64 {
        let mut total = 0.0;
        let (mut a, mut b) = (0usize, 0usize);
        while a < self.indices.len() && b < other.indices.len() {
            match self.indices[a].cmp(&other.indices[b]) {
                std::cmp::Ordering::Less => {
                    total += self.values[a] * self.values[a];
                    a += 1;
                }
                std::cmp::Ordering::Greater => {
                    total += other.values[b] * other.values[b];
                    b += 1;
                }
                std::cmp::Ordering::Equal => {
                    let d = self.values[a] - other.values[b];
                    total += d * d;
                    a += 1;
                    b += 1;
                }
            }
        }
        while a < self.indices.len() {
            total += self.values[a] * self.values[a];
            a += 1;
        }
        while b < other.indices.len() {
            total += other.values[b] * other.values[b];
            b += 1;
        }
        total
    }

    /// Accumulate this row into a dense sum vector.
    pub fn add_to_dense(&self, dense: &mut [f64]) {
        for (&i, &v) in self.indices.iter().zip(&self.values) {
            dense[i as usize] += v;
        }
    }

    /// Expand to a dense vector of the given dimension.
    pub fn to_dense(&self, dim: usize) -> Vec<f64> {
        let mut dense = vec![0.0; dim];
        self.add_to_dense(&mut dense);
        dense
    }
}

/// A fitted vector space: one sparse row per corpus item, aligned by index.
/// Never mutated after fit.
#[derive(Debug, Clone)]
pub struct VectorSpace {
    dim: usize,
    rows: Vec<SparseRow>,
    vocabulary: Vec<String>,
}

impl VectorSpace {
    /// Fit a TF-IDF space over the full corpus text.
    pub fn fit(corpus: &Corpus, max_terms: usize) -> Self {
        let docs: Vec<Vec<String>> = corpus.iter().map(|item| extract_terms(&item.text)).collect();

        // Total corpus frequency and document frequency per term.
        let mut totals: FxHashMap<&str, (usize, usize)> = FxHashMap::default();
        for doc in &docs {
            let mut seen: FxHashMap<&str, usize> = FxHashMap::default();
            for term in doc {
                *seen.entry(term.as_str()).or_insert(0) += 1;
            }
            for (term, count) in seen {
                let entry = totals.entry(term).or_insert((0, 0));
                entry.0 += count;
                entry.1 += 1;
            }
        }

        // Top max_terms by total frequency, lexicographic tiebreak, then
        // index assignment in lexicographic order for determinism.
        let mut ranked: Vec<(&str, usize, usize)> = totals
            .iter()
            .map(|(&term, &(count, df))| (term, count, df))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_terms);
        ranked.sort_by(|a, b| a.0.cmp(b.0));

        let vocabulary: Vec<String> = ranked.iter().map(|(t, _, _)| t.to_string()).collect();
        let index_of: FxHashMap<&str, u32> = ranked
            .iter()
            .enumerate()
            .map(|(i, (t, _, _))| (*t, i as u32))
            .collect();
        let n_docs = docs.len();
        let idf: Vec<f64> = ranked
            .iter()
            .map(|(_, _, df)| (((1 + n_docs) as f64 / (1 + df) as f64).ln()) + 1.0)
            .collect();

        let rows = docs
            .iter()
            .map(|doc| {
                let mut counts: FxHashMap<u32, f64> = FxHashMap::default();
                for term in doc {
                    if let Some(&idx) = index_of.get(term.as_str()) {
                        *counts.entry(idx).or_insert(0.0) += 1.0;
                    }
                }
                let mut pairs: Vec<(u32, f64)> = counts
                    .into_iter()
                    .map(|(idx, count)| (idx, count * idf[idx as usize]))
                    .collect();
                pairs.sort_by_key(|(idx, _)| *idx);

                let norm: f64 = pairs.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, v) in &mut pairs {
                        *v /= norm;
                    }
                }
                SparseRow {
                    indices: pairs.iter().map(|(i, _)| *i).collect(),
                    values: pairs.iter().map(|(_, v)| *v).collect(),
                }
            })
            .collect();

        Self {
            dim: vocabulary.len(),
            rows,
            vocabulary,
        }
    }

    /// Build a space from pre-computed dense vectors (all of equal length).
    pub fn from_dense(dense_rows: &[Vec<f64>]) -> Self {
        let dim = dense_rows.first().map_or(0, |r| r.len());
        let rows = dense_rows
            .iter()
            .map(|row| {
                let mut indices = Vec::new();
                let mut values = Vec::new();
                for (i, &v) in row.iter().enumerate() {
                    if v != 0.0 {
                        indices.push(i as u32);
                        values.push(v);
                    }
                }
                SparseRow { indices, values }
            })
            .collect();
        Self {
            dim,
            rows,
            vocabulary: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, index: usize) -> &SparseRow {
        &self.rows[index]
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }
}

/// Lowercased alphanumeric tokens of length >= 2, stop words removed.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| !STOP_WORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}

/// Unigrams plus adjacent bigrams over the stop-filtered token stream.
fn extract_terms(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut terms = Vec::with_capacity(tokens.len() * 2);
    for window in tokens.windows(2) {
        terms.push(format!("{} {}", window[0], window[1]));
    }
    terms.extend(tokens);
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use storygroup_core::{ContentItem, ContentKind, Corpus};

    fn corpus(texts: &[&str]) -> Corpus {
        let items = texts
            .iter()
            .enumerate()
            .map(|(i, text)| ContentItem {
                content_id: format!("item_{i}"),
                kind: ContentKind::Event,
                text: text.to_string(),
                origin: "event_card".to_string(),
            })
            .collect();
        Corpus::new(items).unwrap()
    }

    #[test]
    fn tokenize_drops_stop_words_and_short_tokens() {
        let tokens = tokenize("The cabinet approved a new budget!");
        assert_eq!(tokens, vec!["cabinet", "approved", "new", "budget"]);
    }

    #[test]
    fn terms_include_bigrams() {
        let terms = extract_terms("storm hits coast");
        assert!(terms.contains(&"storm hits".to_string()));
        assert!(terms.contains(&"hits coast".to_string()));
        assert!(terms.contains(&"storm".to_string()));
    }

    #[test]
    fn rows_are_l2_normalized() {
        let space = VectorSpace::fit(
            &corpus(&["election results announced today", "heavy storm flooding coast"]),
            1000,
        );
        for i in 0..space.len() {
            let norm = space.row(i).squared_norm();
            assert!((norm - 1.0).abs() < 1e-9, "row {i} norm {norm}");
        }
    }

    #[test]
    fn vocabulary_is_capped() {
        let space = VectorSpace::fit(
            &corpus(&[
                "alpha beta gamma delta epsilon",
                "zeta eta theta iota kappa",
            ]),
            4,
        );
        assert_eq!(space.dim(), 4);
        assert_eq!(space.vocabulary().len(), 4);
    }

    #[test]
    fn shared_terms_make_similar_rows() {
        let space = VectorSpace::fit(
            &corpus(&[
                "wildfire spreads north county",
                "wildfire spreads across county",
                "parliament votes tax reform",
            ]),
            1000,
        );
        let close = space.row(0).sq_dist(space.row(1));
        let far = space.row(0).sq_dist(space.row(2));
        assert!(close < far, "close={close} far={far}");
    }

    #[test]
    fn sparse_dense_distance_agree() {
        let space = VectorSpace::from_dense(&[vec![1.0, 0.0, 2.0], vec![0.0, 3.0, 1.0]]);
        let dense = space.row(1).to_dense(3);
        let via_dense = space.row(0).sq_dist_dense(&dense, space.row(1).squared_norm());
        let via_sparse = space.row(0).sq_dist(space.row(1));
        assert!((via_dense - via_sparse).abs() < 1e-9);
    }

    #[test]
    fn deterministic_fit() {
        let c = corpus(&["one two three", "two three four", "three four five"]);
        let a = VectorSpace::fit(&c, 1000);
        let b = VectorSpace::fit(&c, 1000);
        assert_eq!(a.vocabulary(), b.vocabulary());
        for i in 0..a.len() {
            assert_eq!(a.row(i).indices, b.row(i).indices);
            assert_eq!(a.row(i).values, b.row(i).values);
        }
    }
}
