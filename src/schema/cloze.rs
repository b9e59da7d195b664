/// Narrative cloze pairs: partial chains with a held-out correct event.

use rand::rngs::StdRng;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::event::{Dependency, Event};

#[derive(Debug, Error)]
pub enum ClozeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A partial chain and the event that actually follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClozePair {
    pub chain: Vec<Event>,
    pub correct: Event,
}

impl ClozePair {
    pub fn new(chain: Vec<Event>, correct: Event) -> Self {
        Self { chain, correct }
    }
}

fn ev(verb: &str, argument: &str, dependency: Dependency) -> Event {
    Event::new(verb, argument, dependency)
}

/// The built-in benchmark pairs.
pub fn narrative_cloze_fixture() -> Vec<ClozePair> {
    use Dependency::{DirectObject as Obj, Subject as Subj};

    vec![
        ClozePair::new(
            vec![ev("receive", "clients", Subj), ev("download", "clients", Obj)],
            ev("make", "clients", Subj),
        ),
        ClozePair::new(
            vec![ev("fled", "gelman", Subj), ev("found", "gelman", Subj)],
            ev("take", "gelman", Subj),
        ),
        ClozePair::new(
            vec![ev("am", "i", Subj), ev("did", "i", Subj), ev("think", "i", Subj)],
            ev("believe", "i", Subj),
        ),
        ClozePair::new(
            vec![ev("bought", "team", Obj), ev("included", "team", Obj)],
            ev("take", "team", Subj),
        ),
        ClozePair::new(
            vec![ev("heard", "parents", Subj), ev("talking", "parents", Subj)],
            ev("choose", "parents", Subj),
        ),
        ClozePair::new(
            vec![ev("buy", "stock", Obj), ev("lend", "money", Obj)],
            ev("struggle", "edison", Subj),
        ),
        ClozePair::new(
            vec![ev("advocated", "league", Subj), ev("fought", "league", Subj)],
            ev("withdraw", "league", Subj),
        ),
        ClozePair::new(
            vec![
                ev("was", "cranston", Subj),
                ev("spent", "cranston", Subj),
                ev("fight", "cranston", Subj),
            ],
            ev("raise", "cranston", Subj),
        ),
        ClozePair::new(
            vec![
                ev("have", "administration", Subj),
                ev("convinced", "administration", Subj),
                ev("look", "administration", Subj),
            ],
            ev("push", "administration", Subj),
        ),
        ClozePair::new(
            vec![ev("hug", "father", Obj), ev("tell", "father", Obj)],
            ev("love", "father", Obj),
        ),
        ClozePair::new(
            vec![ev("be", "i", Subj), ev("get", "i", Subj), ev("have", "i", Subj)],
            ev("call", "i", Subj),
        ),
    ]
}

/// Load cloze pairs from a RON list.
pub fn load_pairs_from_ron(path: &Path) -> Result<Vec<ClozePair>, ClozeError> {
    let contents = std::fs::read_to_string(path)?;
    parse_pairs_ron(&contents)
}

pub fn parse_pairs_ron(input: &str) -> Result<Vec<ClozePair>, ClozeError> {
    Ok(ron::from_str(input)?)
}

/// Group an ordered event list into chains sharing an argument.
///
/// Chains are returned in order of their argument's first appearance and
/// keep the stream order of their events.
pub fn chains_by_protagonist(events: &[Event]) -> Vec<Vec<Event>> {
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut chains: Vec<Vec<Event>> = Vec::new();

    for event in events {
        let slot = *index.entry(event.argument.as_str()).or_insert_with(|| {
            chains.push(Vec::new());
            chains.len() - 1
        });
        chains[slot].push(event.clone());
    }

    chains
}

/// Build cloze pairs by holding out one random event per chain.
///
/// Chains shorter than `min_len` (and never fewer than two events) are
/// skipped, as are draws whose held-out verb also occurs in the rest of the
/// chain: the predictor never ranks chain verbs, so such a pair could only
/// ever score a miss.
pub fn sample_cloze_pairs(chains: &[Vec<Event>], min_len: usize, rng: &mut StdRng) -> Vec<ClozePair> {
    let min_len = min_len.max(2);
    let mut pairs = Vec::new();

    for chain in chains {
        if chain.len() < min_len {
            continue;
        }
        let held_out = rng.gen_range(0..chain.len());
        let correct = chain[held_out].clone();

        let rest: Vec<Event> = chain
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != held_out)
            .map(|(_, e)| e.clone())
            .collect();

        if rest.iter().any(|e| e.verb == correct.verb) {
            continue;
        }
        pairs.push(ClozePair::new(rest, correct));
    }

    pairs
}
