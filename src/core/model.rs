/// The frozen corpus model: per-verb argument counts and the verb
/// coreference matrix, plus RON persistence.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    RonSer(#[from] ron::Error),
    #[error("inconsistent model snapshot: {0}")]
    Inconsistent(String),
}

/// verb → key → count. Keys are arguments for the count tables and
/// verbs for the coreference matrix.
pub type CountTable = FxHashMap<String, FxHashMap<String, u64>>;

/// Persisted form of a `Model`. Exactly the five stored fields; the verb
/// set and per-verb frequencies are derived on load. Ordered maps keep the
/// written file stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub subject_counts: BTreeMap<String, BTreeMap<String, u64>>,
    pub object_counts: BTreeMap<String, BTreeMap<String, u64>>,
    pub coreference: BTreeMap<String, BTreeMap<String, u64>>,
    pub total_events: u64,
    pub total_coreference: u64,
}

/// Immutable statistics over a complete corpus.
///
/// The coreference matrix is directed: `coreference(a, b)` and
/// `coreference(b, a)` are stored separately and are not guaranteed to be
/// equal. Symmetric quantities must read both entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelSnapshot", into = "ModelSnapshot")]
pub struct Model {
    subject_counts: CountTable,
    object_counts: CountTable,
    coreference: CountTable,
    total_events: u64,
    total_coreference: u64,
    verbs: BTreeSet<String>,
    frequencies: FxHashMap<String, u64>,
}

impl Model {
    /// Assemble a model from tables produced by the corpus builder, deriving
    /// the verb set and per-verb frequencies.
    pub(crate) fn from_tables(
        subject_counts: CountTable,
        object_counts: CountTable,
        coreference: CountTable,
        total_events: u64,
        total_coreference: u64,
    ) -> Self {
        let mut frequencies: FxHashMap<String, u64> = FxHashMap::default();
        for table in [&subject_counts, &object_counts] {
            for (verb, args) in table {
                *frequencies.entry(verb.clone()).or_default() += args.values().sum::<u64>();
            }
        }
        let verbs = subject_counts
            .keys()
            .chain(object_counts.keys())
            .cloned()
            .collect();

        Self {
            subject_counts,
            object_counts,
            coreference,
            total_events,
            total_coreference,
            verbs,
            frequencies,
        }
    }

    /// Rebuild a model from a snapshot, checking the count invariants:
    /// totals must equal the sums of their tables and every coreference
    /// verb must appear in a count table.
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self, ModelError> {
        let model = Self::from_tables(
            to_table(snapshot.subject_counts),
            to_table(snapshot.object_counts),
            to_table(snapshot.coreference),
            snapshot.total_events,
            snapshot.total_coreference,
        );

        let event_sum: u64 = model.frequencies.values().sum();
        if event_sum != model.total_events {
            return Err(ModelError::Inconsistent(format!(
                "total_events is {} but the count tables sum to {}",
                model.total_events, event_sum
            )));
        }

        let matrix_sum: u64 = model
            .coreference
            .values()
            .flat_map(|row| row.values())
            .sum();
        if matrix_sum != model.total_coreference {
            return Err(ModelError::Inconsistent(format!(
                "total_coreference is {} but the matrix sums to {}",
                model.total_coreference, matrix_sum
            )));
        }

        for (v1, row) in &model.coreference {
            if let Some(v) = std::iter::once(v1)
                .chain(row.keys())
                .find(|v| !model.verbs.contains(v.as_str()))
            {
                return Err(ModelError::Inconsistent(format!(
                    "coreference verb '{}' has no argument counts",
                    v
                )));
            }
        }

        Ok(model)
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            subject_counts: to_sorted(&self.subject_counts),
            object_counts: to_sorted(&self.object_counts),
            coreference: to_sorted(&self.coreference),
            total_events: self.total_events,
            total_coreference: self.total_coreference,
        }
    }

    /// Argument counts for `verb` as a subject, if seen.
    pub fn subject_counts(&self, verb: &str) -> Option<&FxHashMap<String, u64>> {
        self.subject_counts.get(verb)
    }

    /// Argument counts for `verb` as any kind of object, if seen.
    pub fn object_counts(&self, verb: &str) -> Option<&FxHashMap<String, u64>> {
        self.object_counts.get(verb)
    }

    /// Directed coreference count for (v1, v2); zero when absent.
    pub fn coreference(&self, v1: &str, v2: &str) -> u64 {
        self.coreference
            .get(v1)
            .and_then(|row| row.get(v2))
            .copied()
            .unwrap_or(0)
    }

    /// Total subject and object observations of `verb`; zero when unseen.
    pub fn verb_frequency(&self, verb: &str) -> u64 {
        self.frequencies.get(verb).copied().unwrap_or(0)
    }

    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    pub fn total_coreference(&self) -> u64 {
        self.total_coreference
    }

    /// All verbs with at least one subject or object count, sorted.
    pub fn verbs(&self) -> &BTreeSet<String> {
        &self.verbs
    }

    pub fn verb_count(&self) -> usize {
        self.verbs.len()
    }

    pub fn contains_verb(&self, verb: &str) -> bool {
        self.verbs.contains(verb)
    }

    /// Serialize to a pretty RON string.
    pub fn to_ron(&self) -> Result<String, ModelError> {
        Ok(ron::ser::to_string_pretty(
            &self.snapshot(),
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Parse and validate a RON snapshot.
    pub fn from_ron(input: &str) -> Result<Self, ModelError> {
        let snapshot: ModelSnapshot = ron::from_str(input)?;
        Self::from_snapshot(snapshot)
    }
}

impl TryFrom<ModelSnapshot> for Model {
    type Error = ModelError;

    fn try_from(snapshot: ModelSnapshot) -> Result<Self, Self::Error> {
        Self::from_snapshot(snapshot)
    }
}

impl From<Model> for ModelSnapshot {
    fn from(model: Model) -> Self {
        model.snapshot()
    }
}

fn to_table(sorted: BTreeMap<String, BTreeMap<String, u64>>) -> CountTable {
    sorted
        .into_iter()
        .map(|(k, row)| (k, row.into_iter().collect()))
        .collect()
}

fn to_sorted(table: &CountTable) -> BTreeMap<String, BTreeMap<String, u64>> {
    table
        .iter()
        .map(|(k, row)| {
            (
                k.clone(),
                row.iter().map(|(k2, c)| (k2.clone(), *c)).collect(),
            )
        })
        .collect()
}

/// Save a Model to a RON file.
pub fn save_model(model: &Model, path: &Path) -> Result<(), ModelError> {
    std::fs::write(path, model.to_ron()?)?;
    Ok(())
}

/// Load a Model from a RON file.
pub fn load_model(path: &Path) -> Result<Model, ModelError> {
    let contents = std::fs::read_to_string(path)?;
    Model::from_ron(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
        entries.iter().map(|(k, c)| (k.to_string(), *c)).collect()
    }

    fn market_snapshot() -> ModelSnapshot {
        let mut snapshot = ModelSnapshot::default();
        snapshot
            .subject_counts
            .insert("buy".into(), row(&[("trader", 2), ("investor", 1)]));
        snapshot
            .subject_counts
            .insert("sell".into(), row(&[("trader", 1)]));
        snapshot
            .object_counts
            .insert("buy".into(), row(&[("stock", 1)]));
        snapshot
            .object_counts
            .insert("sell".into(), row(&[("stock", 1)]));
        snapshot
            .coreference
            .insert("buy".into(), row(&[("buy", 3), ("sell", 2)]));
        snapshot
            .coreference
            .insert("sell".into(), row(&[("buy", 2), ("sell", 2)]));
        snapshot.total_events = 6;
        snapshot.total_coreference = 9;
        snapshot
    }

    #[test]
    fn snapshot_derives_verbs_and_frequencies() {
        let model = Model::from_snapshot(market_snapshot()).unwrap();
        assert_eq!(model.verb_count(), 2);
        assert!(model.contains_verb("buy"));
        assert_eq!(model.verb_frequency("buy"), 4);
        assert_eq!(model.verb_frequency("sell"), 2);
        assert_eq!(model.verb_frequency("walk"), 0);
        assert_eq!(model.coreference("buy", "sell"), 2);
        assert_eq!(model.coreference("buy", "walk"), 0);
        assert_eq!(model.subject_counts("buy").unwrap()["trader"], 2);
        assert!(model.object_counts("walk").is_none());
    }

    #[test]
    fn inconsistent_event_total_rejected() {
        let mut snapshot = market_snapshot();
        snapshot.total_events = 7;
        assert!(matches!(
            Model::from_snapshot(snapshot),
            Err(ModelError::Inconsistent(_))
        ));
    }

    #[test]
    fn inconsistent_coreference_total_rejected() {
        let mut snapshot = market_snapshot();
        snapshot.total_coreference = 10;
        assert!(matches!(
            Model::from_snapshot(snapshot),
            Err(ModelError::Inconsistent(_))
        ));
    }

    #[test]
    fn unknown_coreference_verb_rejected() {
        let mut snapshot = market_snapshot();
        snapshot
            .coreference
            .get_mut("buy")
            .unwrap()
            .insert("walk".into(), 1);
        snapshot.total_coreference = 10;
        assert!(matches!(
            Model::from_snapshot(snapshot),
            Err(ModelError::Inconsistent(_))
        ));
    }

    #[test]
    fn ron_round_trip() {
        let model = Model::from_snapshot(market_snapshot()).unwrap();
        let serialized = model.to_ron().unwrap();
        let deserialized = Model::from_ron(&serialized).unwrap();
        assert_eq!(deserialized, model);
        assert_eq!(deserialized.snapshot(), market_snapshot());
    }

    #[test]
    fn serde_goes_through_snapshot() {
        let model = Model::from_snapshot(market_snapshot()).unwrap();
        let serialized = ron::to_string(&model).unwrap();
        let deserialized: Model = ron::from_str(&serialized).unwrap();
        assert_eq!(deserialized.total_coreference(), 9);
        assert_eq!(deserialized.verbs(), model.verbs());
    }

    #[test]
    fn save_and_load_model() {
        let model = Model::from_snapshot(market_snapshot()).unwrap();
        let path = std::path::PathBuf::from("target/test_chain_model.ron");

        save_model(&model, &path).unwrap();
        let loaded = load_model(&path).unwrap();
        assert_eq!(loaded, model);

        let _ = std::fs::remove_file(&path);
    }
}
