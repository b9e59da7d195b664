/// Word similarity capability used by the embedding scoring modes.
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Cosine-like similarity between two words, conventionally in [-1, 1].
///
/// Implemented for any `Fn(&str, &str) -> f64`, so a vector-store lookup can
/// be injected as a closure.
pub trait Similarity: Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

impl<F> Similarity for F
where
    F: Fn(&str, &str) -> f64 + Sync,
{
    fn similarity(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Precomputed symmetric similarities. Identical words score 1.0 and
/// unlisted pairs 0.0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String, f64)>", into = "Vec<(String, String, f64)>")]
pub struct SimilarityTable {
    scores: FxHashMap<(String, String), f64>,
}

impl SimilarityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, a: &str, b: &str, score: f64) {
        self.scores.insert(ordered_pair(a, b), score);
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Load a table written as a RON list of `(word, word, score)` tuples.
    pub fn load_from_ron(path: &Path) -> Result<Self, SimilarityError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, SimilarityError> {
        Ok(ron::from_str(input)?)
    }
}

impl Similarity for SimilarityTable {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let key = ordered_pair(a, b);
        if key.0 == key.1 {
            return 1.0;
        }
        self.scores.get(&key).copied().unwrap_or(0.0)
    }
}

impl From<Vec<(String, String, f64)>> for SimilarityTable {
    fn from(entries: Vec<(String, String, f64)>) -> Self {
        let mut table = Self::new();
        for (a, b, score) in entries {
            table.insert(&a, &b, score);
        }
        table
    }
}

impl From<SimilarityTable> for Vec<(String, String, f64)> {
    fn from(table: SimilarityTable) -> Self {
        let mut entries: Vec<_> = table
            .scores
            .into_iter()
            .map(|((a, b), score)| (a, b, score))
            .collect();
        entries.sort_by(|x, y| (&x.0, &x.1).cmp(&(&y.0, &y.1)));
        entries
    }
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_similarities() {
        let sim = |a: &str, b: &str| if a.len() == b.len() { 0.5 } else { -0.5 };
        assert_eq!(sim.similarity("buy", "pay"), 0.5);
        assert_eq!(sim.similarity("buy", "sell"), -0.5);
    }

    #[test]
    fn table_is_symmetric_with_defaults() {
        let mut table = SimilarityTable::new();
        table.insert("sell", "buy", 0.7);
        assert_eq!(table.similarity("buy", "sell"), 0.7);
        assert_eq!(table.similarity("sell", "buy"), 0.7);
        assert_eq!(table.similarity("buy", "buy"), 1.0);
        assert_eq!(table.similarity("buy", "walk"), 0.0);
    }

    #[test]
    fn lookups_ignore_case() {
        let mut table = SimilarityTable::new();
        table.insert("Buy", "SELL", 0.7);
        assert_eq!(table.similarity("Buy", "buy"), 1.0);
        assert_eq!(table.similarity("sell", "BUY"), 0.7);
    }

    #[test]
    fn load_table_from_ron() {
        let path = std::path::PathBuf::from("tests/fixtures/test_similarity.ron");
        let table = SimilarityTable::load_from_ron(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.similarity("sell", "buy"), 0.8);
        assert_eq!(table.similarity("hold", "buy"), 0.4);
    }

    #[test]
    fn ron_round_trip() {
        let table = SimilarityTable::parse_ron(r#"[("buy", "sell", 0.8), ("pay", "lend", 0.3)]"#).unwrap();
        let serialized = ron::to_string(&table).unwrap();
        let deserialized = SimilarityTable::parse_ron(&serialized).unwrap();
        assert_eq!(deserialized.len(), 2);
        assert_eq!(deserialized.similarity("lend", "pay"), 0.3);
    }
}
