// 🔍 Duplicate Detector - exact grouping on key columns, fuzzy grouping on text
//
// Exact: rows with the same key fingerprint form a class; every member after
// the first (original order) is a duplicate.
// Fuzzy: greedy pairwise grouping, O(n²), meant for one small column.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

// ============================================================================
// MATCH STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Identical key fingerprint
    ExactMatch,

    /// Similarity score at or above the threshold
    FuzzyMatch,

    /// One value contains the other (no scorer available)
    Containment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Row / value indices in original order; the first is the survivor
    pub indices: Vec<usize>,

    pub strategy: MatchStrategy,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

// ============================================================================
// EXACT DETECTOR
// ============================================================================

pub struct DuplicateDetector {
    key_columns: Vec<String>,
    skip_blank_keys: bool,
}

impl DuplicateDetector {
    pub fn new(key_columns: Vec<String>) -> Self {
        DuplicateDetector {
            key_columns,
            skip_blank_keys: true,
        }
    }

    /// Rows whose keys are all blank never count as duplicates of each other
    /// (on by default; pass `false` to group them like any other value)
    pub fn skip_blank_keys(mut self, skip: bool) -> Self {
        self.skip_blank_keys = skip;
        self
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// SHA-256 over the key values (length-prefixed so ("ab","c") != ("a","bc"))
    pub fn fingerprint(&self, record: &Record) -> Option<String> {
        let values: Vec<String> = self
            .key_columns
            .iter()
            .map(|column| record.text(column).trim().to_string())
            .collect();

        if self.skip_blank_keys && values.iter().all(|v| v.is_empty()) {
            return None;
        }

        let mut hasher = Sha256::new();
        for value in &values {
            hasher.update(value.len().to_le_bytes());
            hasher.update(value.as_bytes());
        }
        Some(format!("{:x}", hasher.finalize()))
    }

    /// One flag per row: true for every row after the first of its class
    pub fn mark_duplicates(&self, rows: &[Record]) -> Vec<bool> {
        let mut flags = vec![false; rows.len()];
        for group in self.find_exact_groups(rows) {
            for &index in &group.indices[1..] {
                flags[index] = true;
            }
        }
        flags
    }

    /// Classes with more than one member, ordered by first occurrence
    pub fn find_exact_groups(&self, rows: &[Record]) -> Vec<DuplicateGroup> {
        let mut order: Vec<String> = Vec::new();
        let mut members: HashMap<String, Vec<usize>> = HashMap::new();

        for (index, row) in rows.iter().enumerate() {
            let Some(fingerprint) = self.fingerprint(row) else {
                continue;
            };
            let entry = members.entry(fingerprint.clone()).or_default();
            if entry.is_empty() {
                order.push(fingerprint);
            }
            entry.push(index);
        }

        order
            .into_iter()
            .filter_map(|fingerprint| members.remove(&fingerprint))
            .filter(|indices| indices.len() > 1)
            .map(|indices| DuplicateGroup {
                indices,
                strategy: MatchStrategy::ExactMatch,
            })
            .collect()
    }
}

// ============================================================================
// FUZZY MATCHING
// ============================================================================

/// Similarity between two strings on a 0–100 scale
pub trait SimilarityScorer {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// 100 × (1 − edit distance / longer length), case-insensitive
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinRatio;

impl SimilarityScorer for LevenshteinRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a = a.to_lowercase();
        let b = b.to_lowercase();
        let longest = a.chars().count().max(b.chars().count());
        if longest == 0 {
            return 100.0;
        }
        let distance = levenshtein_distance(&a, &b);
        (1.0 - distance as f64 / longest as f64) * 100.0
    }
}

pub struct FuzzyMatcher<'s> {
    /// Minimum score (0–100) for two values to share a group
    pub threshold: f64,
    scorer: Option<&'s dyn SimilarityScorer>,
}

impl<'s> FuzzyMatcher<'s> {
    pub fn new(threshold: f64, scorer: &'s dyn SimilarityScorer) -> Self {
        FuzzyMatcher {
            threshold,
            scorer: Some(scorer),
        }
    }

    /// Substring containment only
    pub fn containment_only() -> Self {
        FuzzyMatcher {
            threshold: 0.0,
            scorer: None,
        }
    }

    pub fn is_match(&self, a: &str, b: &str) -> bool {
        match self.scorer {
            Some(scorer) => scorer.score(a, b) >= self.threshold,
            None => {
                let a = a.to_lowercase();
                let b = b.to_lowercase();
                a.contains(&b) || b.contains(&a)
            }
        }
    }

    fn strategy(&self) -> MatchStrategy {
        if self.scorer.is_some() {
            MatchStrategy::FuzzyMatch
        } else {
            MatchStrategy::Containment
        }
    }

    /// Greedy grouping: each unassigned value collects every later unassigned match
    pub fn find_groups(&self, values: &[String]) -> Vec<DuplicateGroup> {
        let mut assigned = vec![false; values.len()];
        let mut groups = Vec::new();

        for i in 0..values.len() {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;
            let mut indices = vec![i];

            for j in (i + 1)..values.len() {
                if !assigned[j] && self.is_match(&values[i], &values[j]) {
                    assigned[j] = true;
                    indices.push(j);
                }
            }

            if indices.len() > 1 {
                groups.push(DuplicateGroup {
                    indices,
                    strategy: self.strategy(),
                });
            }
        }

        groups
    }
}

impl Default for FuzzyMatcher<'static> {
    fn default() -> Self {
        FuzzyMatcher::new(85.0, &LevenshteinRatio)
    }
}

/// Minimum number of single-character insertions, deletions or substitutions
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        current[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            current[j] = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(phone: &str, email: &str) -> Record {
        Record::new().with("phone", phone).with("email", email)
    }

    fn detector() -> DuplicateDetector {
        DuplicateDetector::new(vec!["phone".to_string(), "email".to_string()])
    }

    #[test]
    fn test_first_of_class_is_never_marked() {
        let rows = vec![
            contact("966501234567", "a@x.com"),
            contact("966501234567", "b@x.com"),
            contact("966501234567", "a@x.com"),
            contact("966551234567", "a@x.com"),
            contact("966501234567", "a@x.com"),
        ];

        let flags = detector().mark_duplicates(&rows);
        assert_eq!(flags, vec![false, false, true, false, true]);

        let groups = detector().find_exact_groups(&rows);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].indices, vec![0, 2, 4]);
        assert_eq!(groups[0].strategy, MatchStrategy::ExactMatch);
    }

    #[test]
    fn test_fingerprint_is_stable_and_separated() {
        let det = DuplicateDetector::new(vec!["a".into(), "b".into()]);
        let left = Record::new().with("a", "ab").with("b", "c");
        let right = Record::new().with("a", "a").with("b", "bc");

        assert_eq!(det.fingerprint(&left), det.fingerprint(&left.clone()));
        assert_ne!(det.fingerprint(&left), det.fingerprint(&right));
        assert_eq!(det.fingerprint(&left).map(|f| f.len()), Some(64));
    }

    #[test]
    fn test_blank_keys_are_never_duplicates() {
        let rows = vec![contact("", ""), contact("", ""), contact("  ", "")];
        assert_eq!(detector().mark_duplicates(&rows), vec![false, false, false]);
        assert!(detector().find_exact_groups(&rows).is_empty());
    }

    #[test]
    fn test_blank_keys_group_when_asked() {
        let rows = vec![contact("", ""), contact("", ""), contact("  ", "")];
        assert_eq!(
            detector().skip_blank_keys(false).mark_duplicates(&rows),
            vec![false, true, true]
        );
    }

    #[test]
    fn test_one_blank_key_still_matches() {
        let rows = vec![contact("966501234567", ""), contact("966501234567", "")];
        assert_eq!(detector().mark_duplicates(&rows), vec![false, true]);
    }

    #[test]
    fn test_missing_key_column_reads_as_blank() {
        let det = DuplicateDetector::new(vec!["nope".into()]);
        let rows = vec![contact("1", "a"), contact("2", "b")];
        assert_eq!(det.mark_duplicates(&rows), vec![false, false]);
        assert_eq!(det.skip_blank_keys(false).mark_duplicates(&rows), vec![false, true]);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("شركة", "شركه"), 1);

        let scorer = LevenshteinRatio;
        assert_eq!(scorer.score("ACME", "acme"), 100.0);
        assert!(scorer.score("Al Noor Trading", "Al Nour Trading") > 85.0);
        assert!(scorer.score("Al Noor Trading", "Blue Sky") < 50.0);
    }

    #[test]
    fn test_fuzzy_groups() {
        let values: Vec<String> = [
            "Al Noor Trading",
            "Blue Sky",
            "al noor trading",
            "Al Nour Trading",
            "Red Sea",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let groups = FuzzyMatcher::default().find_groups(&values);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].indices, vec![0, 2, 3]);
        assert_eq!(groups[0].strategy, MatchStrategy::FuzzyMatch);
    }

    #[test]
    fn test_containment_fallback() {
        let values: Vec<String> = ["Starbucks", "STARBUCKS Coffee", "Amazon"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let groups = FuzzyMatcher::containment_only().find_groups(&values);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].indices, vec![0, 1]);
        assert_eq!(groups[0].strategy, MatchStrategy::Containment);
    }
}
