/// Corpus accumulation — one batch pass over an event stream producing a
/// frozen `Model`.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::core::model::{CountTable, Model};
use crate::schema::event::{Event, RawEvent, Role};

/// Accepted/skipped tallies for a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub accepted: u64,
    pub skipped: u64,
}

/// Owns all accumulation state for a model build. Nothing is shared
/// between builders; partial builders are combined with `merge`.
#[derive(Debug, Clone, Default)]
pub struct CorpusBuilder {
    subject_counts: CountTable,
    object_counts: CountTable,
    total_events: u64,
    ordered: Vec<Event>,
    stats: BuildStats,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and count one raw triple. Malformed triples are logged and
    /// skipped; returns whether the triple was accepted.
    pub fn observe(&mut self, raw: &RawEvent) -> bool {
        match raw.validate() {
            Ok(event) => {
                self.observe_event(event);
                true
            }
            Err(e) => {
                warn!(verb = %raw.verb, dependency = %raw.dependency, error = %e, "skipping malformed event");
                self.stats.skipped += 1;
                false
            }
        }
    }

    /// Count an already validated event.
    pub fn observe_event(&mut self, event: Event) {
        let table = match event.dependency.role() {
            Role::Subject => &mut self.subject_counts,
            Role::Object => &mut self.object_counts,
        };
        *table
            .entry(event.verb.clone())
            .or_default()
            .entry(event.argument.clone())
            .or_default() += 1;
        self.total_events += 1;
        self.stats.accepted += 1;
        self.ordered.push(event);
    }

    pub fn observe_all<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a RawEvent>,
    {
        for raw in events {
            self.observe(raw);
        }
    }

    /// Accumulate a stream in independent shards of `shard_size` events and
    /// merge the partial tables. Counts are identical to a single pass.
    pub fn from_shards(events: &[RawEvent], shard_size: usize) -> Self {
        let shard_size = shard_size.max(1);
        let accumulate = |shard: &[RawEvent]| {
            let mut builder = CorpusBuilder::new();
            builder.observe_all(shard);
            builder
        };

        #[cfg(feature = "parallel")]
        let merged = events
            .par_chunks(shard_size)
            .map(accumulate)
            .reduce(CorpusBuilder::new, |mut left, right| {
                left.merge(right);
                left
            });

        #[cfg(not(feature = "parallel"))]
        let merged = events
            .chunks(shard_size)
            .map(accumulate)
            .fold(CorpusBuilder::new(), |mut left, right| {
                left.merge(right);
                left
            });

        debug!(shards = events.len().div_ceil(shard_size), "merged corpus shards");
        merged
    }

    /// Fold another builder's counts into this one by per-key addition.
    /// `other`'s ordered events are appended after this builder's.
    pub fn merge(&mut self, other: CorpusBuilder) {
        merge_table(&mut self.subject_counts, other.subject_counts);
        merge_table(&mut self.object_counts, other.object_counts);
        self.total_events += other.total_events;
        self.stats.accepted += other.stats.accepted;
        self.stats.skipped += other.stats.skipped;
        self.ordered.extend(other.ordered);
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Accepted events in stream order.
    pub fn ordered_events(&self) -> &[Event] {
        &self.ordered
    }

    /// Compute the coreference matrix and freeze the model.
    pub fn build(self) -> Model {
        let mut coreference = coreference_counts(&self.subject_counts);
        merge_table(&mut coreference, coreference_counts(&self.object_counts));
        let total_coreference: u64 = coreference.values().flat_map(|row| row.values()).sum();

        let model = Model::from_tables(
            self.subject_counts,
            self.object_counts,
            coreference,
            self.total_events,
            total_coreference,
        );

        info!(
            events = model.total_events(),
            verbs = model.verb_count(),
            coreference = model.total_coreference(),
            skipped = self.stats.skipped,
            "corpus model built"
        );
        model
    }
}

/// Count, for every ordered verb pair (v1, v2) including v1 = v2, the
/// arguments both verbs took in this table.
///
/// Works from an inverted index argument → verbs: each argument shared by
/// `d` verbs contributes one count to each of the `d²` ordered pairs.
fn coreference_counts(table: &CountTable) -> CountTable {
    let mut by_argument: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for (verb, args) in table {
        for argument in args.keys() {
            by_argument
                .entry(argument.as_str())
                .or_default()
                .push(verb.as_str());
        }
    }
    let groups: Vec<Vec<&str>> = by_argument.into_values().collect();

    #[cfg(feature = "parallel")]
    let counts = groups
        .par_iter()
        .fold(CountTable::default, |mut acc, verbs| {
            add_pairs(&mut acc, verbs);
            acc
        })
        .reduce(CountTable::default, |mut left, right| {
            merge_table(&mut left, right);
            left
        });

    #[cfg(not(feature = "parallel"))]
    let counts = groups.iter().fold(CountTable::default(), |mut acc, verbs| {
        add_pairs(&mut acc, verbs);
        acc
    });

    counts
}

fn add_pairs(acc: &mut CountTable, verbs: &[&str]) {
    for v1 in verbs {
        let row = acc.entry((*v1).to_string()).or_default();
        for v2 in verbs {
            *row.entry((*v2).to_string()).or_default() += 1;
        }
    }
}

fn merge_table(into: &mut CountTable, from: CountTable) {
    for (key, row) in from {
        let target = into.entry(key).or_default();
        for (inner, count) in row {
            *target.entry(inner).or_default() += count;
        }
    }
}
