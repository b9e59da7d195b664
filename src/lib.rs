//! Narrative Chains — statistical narrative event chain modelling.
//!
//! Builds per-verb argument counts and a verb coreference matrix from a
//! stream of (verb, argument, dependency) triples, estimates PMI between
//! events, ranks plausible next events for a partial chain, and scores
//! rankings on the narrative cloze task.

pub mod core;
pub mod schema;
