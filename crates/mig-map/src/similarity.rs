//! Textual similarity between short descriptors.
//!
//! Scores are always computed for a whole candidate set at once: the
//! [`TextSimilarity`] capability receives every source and every target
//! descriptor so that vocabulary and term weights are shared and scores are
//! comparable across the matrix.
//!
//! The default implementation is TF-IDF over word unigrams and bigrams with
//! cosine similarity. [`JaroWinklerSimilarity`] is an alternative backend for
//! catalogs whose names are abbreviations rather than words.

use std::collections::BTreeMap;

use rapidfuzz::distance::jaro_winkler;

use crate::utils::normalize_text;

/// English function words dropped before weighting.
///
/// Domain words such as `name`, `id` or `type` are deliberately absent.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "into",
    "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "will",
    "with",
];

/// Capability producing a source x target similarity matrix.
///
/// Implementations must return scores in [0, 1], derive any weighting from
/// the joint set of descriptors, and be deterministic.
pub trait TextSimilarity {
    fn similarity_matrix(&self, sources: &[String], targets: &[String]) -> SimilarityMatrix;
}

impl<T: TextSimilarity + ?Sized> TextSimilarity for Box<T> {
    fn similarity_matrix(&self, sources: &[String], targets: &[String]) -> SimilarityMatrix {
        (**self).similarity_matrix(sources, targets)
    }
}

/// Dense row-major matrix of scores; rows are sources, columns are targets.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    rows: usize,
    cols: usize,
    scores: Vec<f64>,
}

impl SimilarityMatrix {
    /// Build a matrix from a scoring function. Scores are clamped to [0, 1];
    /// NaN and negative zero become 0.
    pub fn from_fn(rows: usize, cols: usize, mut score: impl FnMut(usize, usize) -> f64) -> Self {
        let mut scores = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let value = score(row, col);
                scores.push(if value.is_nan() || value <= 0.0 {
                    0.0
                } else {
                    value.min(1.0)
                });
            }
        }
        Self { rows, cols, scores }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.scores[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.scores[row * self.cols..(row + 1) * self.cols]
    }

    /// Column with the maximal score in `row`. Ties go to the lowest column.
    pub fn best_in_row(&self, row: usize) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (col, &score) in self.row(row).iter().enumerate() {
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((col, score)),
            }
        }
        best
    }

    /// Best column per row, kept only when its score strictly exceeds `threshold`.
    pub fn best_matches(&self, threshold: f64) -> Vec<Option<(usize, f64)>> {
        (0..self.rows)
            .map(|row| {
                self.best_in_row(row)
                    .filter(|&(_, score)| score > threshold)
            })
            .collect()
    }
}

/// TF-IDF weighted cosine similarity over word unigrams and bigrams.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfIdfSimilarity;

impl TextSimilarity for TfIdfSimilarity {
    fn similarity_matrix(&self, sources: &[String], targets: &[String]) -> SimilarityMatrix {
        let documents: Vec<BTreeMap<String, f64>> = sources
            .iter()
            .chain(targets)
            .map(|text| term_counts(text))
            .collect();

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for document in &documents {
            for term in document.keys() {
                *document_frequency.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let vectors: Vec<BTreeMap<&str, f64>> = documents
            .iter()
            .map(|document| {
                let mut weights: BTreeMap<&str, f64> = document
                    .iter()
                    .map(|(term, tf)| {
                        let df = document_frequency.get(term.as_str()).copied().unwrap_or(1) as f64;
                        let idf = ((1.0 + n) / (1.0 + df)).ln() + 1.0;
                        (term.as_str(), tf * idf)
                    })
                    .collect();
                let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for weight in weights.values_mut() {
                        *weight /= norm;
                    }
                }
                weights
            })
            .collect();

        let (source_vectors, target_vectors) = vectors.split_at(sources.len());
        SimilarityMatrix::from_fn(sources.len(), targets.len(), |row, col| {
            dot(&source_vectors[row], &target_vectors[col])
        })
    }
}

/// Jaro-Winkler similarity of normalized descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinklerSimilarity;

impl TextSimilarity for JaroWinklerSimilarity {
    fn similarity_matrix(&self, sources: &[String], targets: &[String]) -> SimilarityMatrix {
        let sources: Vec<String> = sources.iter().map(|s| normalize_text(s)).collect();
        let targets: Vec<String> = targets.iter().map(|s| normalize_text(s)).collect();
        SimilarityMatrix::from_fn(sources.len(), targets.len(), |row, col| {
            let (left, right) = (&sources[row], &targets[col]);
            if left.is_empty() || right.is_empty() {
                return 0.0;
            }
            jaro_winkler::similarity(left.chars(), right.chars())
        })
    }
}

/// Lowercased words with stop words removed.
///
/// Words break on any non-alphanumeric character and on camelCase
/// boundaries, so `customerId`, `customer_id` and `Customer ID` agree.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous: Option<char> = None;

    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            flush_word(&mut words, &mut current);
            previous = None;
            continue;
        }
        if ch.is_uppercase() && previous.is_some_and(char::is_lowercase) {
            flush_word(&mut words, &mut current);
        }
        current.extend(ch.to_lowercase());
        previous = Some(ch);
    }
    flush_word(&mut words, &mut current);

    words.retain(|word| !STOP_WORDS.contains(&word.as_str()));
    words
}

fn flush_word(words: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

/// Raw term frequencies of unigrams and adjacent bigrams.
fn term_counts(text: &str) -> BTreeMap<String, f64> {
    let tokens = tokenize(text);
    let mut counts = BTreeMap::new();
    for token in &tokens {
        *counts.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    for pair in tokens.windows(2) {
        *counts.entry(format!("{} {}", pair[0], pair[1])).or_insert(0.0) += 1.0;
    }
    counts
}

fn dot(left: &BTreeMap<&str, f64>, right: &BTreeMap<&str, f64>) -> f64 {
    let (small, large) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    small
        .iter()
        .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn tokenize_splits_case_and_separators() {
        assert_eq!(tokenize("customerId"), vec!["customer", "id"]);
        assert_eq!(tokenize("cust_id integer"), vec!["cust", "id", "integer"]);
        assert_eq!(tokenize("Name of the Client"), vec!["name", "client"]);
        assert!(tokenize("the of and").is_empty());
    }

    #[test]
    fn identical_descriptors_score_one() {
        let matrix = TfIdfSimilarity.similarity_matrix(
            &strings(&["order date"]),
            &strings(&["order date", "ship via"]),
        );
        assert!((matrix.get(0, 0) - 1.0).abs() < 1e-9);
        assert_eq!(matrix.get(0, 1), 0.0);
    }

    #[test]
    fn empty_and_stop_word_descriptors_score_zero() {
        let matrix = TfIdfSimilarity.similarity_matrix(
            &strings(&["", "of the"]),
            &strings(&["the", "customer"]),
        );
        for row in 0..2 {
            assert_eq!(matrix.row(row), &[0.0, 0.0]);
        }
    }

    #[test]
    fn shared_type_hint_yields_partial_similarity() {
        let matrix = TfIdfSimilarity.similarity_matrix(
            &strings(&["cust_id integer", "full_name string"]),
            &strings(&["id integer", "name string"]),
        );
        assert!(matrix.get(0, 0) > 0.6, "got {}", matrix.get(0, 0));
        assert!(matrix.get(1, 1) > 0.6, "got {}", matrix.get(1, 1));
        assert_eq!(matrix.get(0, 1), 0.0);
        assert_eq!(matrix.get(1, 0), 0.0);
    }

    #[test]
    fn ties_pick_first_column() {
        let matrix = SimilarityMatrix::from_fn(1, 3, |_, col| if col == 0 { 0.2 } else { 0.5 });
        assert_eq!(matrix.best_in_row(0), Some((1, 0.5)));
        assert_eq!(matrix.best_matches(0.5), vec![None]);
        assert_eq!(matrix.best_matches(0.3), vec![Some((1, 0.5))]);
    }

    #[test]
    fn empty_target_set_has_no_best() {
        let matrix = TfIdfSimilarity.similarity_matrix(&strings(&["orders"]), &[]);
        assert_eq!(matrix.best_matches(0.3), vec![None]);
    }

    #[test]
    fn jaro_winkler_backend_is_bounded() {
        let matrix = JaroWinklerSimilarity.similarity_matrix(
            &strings(&["CUST_NM", ""]),
            &strings(&["cust name", "zip"]),
        );
        assert!(matrix.get(0, 0) > matrix.get(0, 1));
        assert_eq!(matrix.get(1, 0), 0.0);
    }

    proptest! {
        #[test]
        fn scores_stay_in_unit_interval(
            a in "[a-zA-Z_ ]{0,24}",
            b in "[a-zA-Z_ ]{0,24}",
        ) {
            let matrix = TfIdfSimilarity.similarity_matrix(&[a.clone()], &[b, a]);
            for col in 0..2 {
                let score = matrix.get(0, col);
                prop_assert!((0.0..=1.0).contains(&score));
            }
        }

        #[test]
        fn self_similarity_dominates_disjoint_descriptor(
            a in "[a-m]{2,8}( [a-m]{2,8}){0,3}",
            b in "[n-z]{2,8}( [n-z]{2,8}){0,3}",
        ) {
            let matrix = TfIdfSimilarity.similarity_matrix(&[a.clone()], &[a, b]);
            prop_assert!(matrix.get(0, 0) >= matrix.get(0, 1));
            prop_assert_eq!(matrix.get(0, 1), 0.0);
        }
    }
}
