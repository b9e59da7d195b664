/// Narrative cloze evaluation — rank positions of held-out events.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::predictor::{ChainPredictor, PredictError, Prediction, ScoringMode};
use crate::schema::cloze::ClozePair;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EvaluationError {
    #[error("prediction error: {0}")]
    Predict(#[from] PredictError),
    #[error("no cloze pairs to evaluate")]
    NoPairs,
}

/// Outcome of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub mode: ScoringMode,
    /// Size of the model vocabulary; also the position recorded for a miss.
    pub verb_count: usize,
    /// 1-based rank of each correct verb, in pair order.
    pub positions: Vec<usize>,
    pub mean_position: f64,
    /// Mean over positions below `verb_count`. `None` when every pair
    /// missed, since that mean is undefined.
    pub adjusted_mean_position: Option<f64>,
}

impl EvaluationReport {
    /// Pairs whose position is below the miss penalty.
    pub fn hits(&self) -> usize {
        self.positions.iter().filter(|&&p| p < self.verb_count).count()
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} model over {} verbs:", self.mode, self.verb_count)?;
        for position in &self.positions {
            writeln!(f, "  position: {}", position)?;
        }
        writeln!(f, "average position: {:.3}", self.mean_position)?;
        match self.adjusted_mean_position {
            Some(adjusted) => write!(f, "adjusted average position: {:.3}", adjusted),
            None => write!(f, "adjusted average position: undefined (no hits)"),
        }
    }
}

/// Runs a predictor over labelled cloze pairs.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationHarness<'p, 'm> {
    predictor: &'p ChainPredictor<'m>,
}

impl<'p, 'm> EvaluationHarness<'p, 'm> {
    pub fn new(predictor: &'p ChainPredictor<'m>) -> Self {
        Self { predictor }
    }

    /// Rank position of each pair's correct verb, plus the means.
    ///
    /// A correct verb absent from the ranking is recorded as position
    /// `verb_count`. Only the verb is matched; argument and role of the
    /// correct event are ignored.
    pub fn evaluate(&self, pairs: &[ClozePair], mode: ScoringMode) -> Result<EvaluationReport, EvaluationError> {
        if pairs.is_empty() {
            return Err(EvaluationError::NoPairs);
        }
        let verb_count = self.predictor.model().verb_count();

        let mut positions = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let ranked = self.predictor.predict(&pair.chain, mode)?;
            let position = position_of(&ranked, &pair.correct.verb).unwrap_or(verb_count);
            debug!(verb = %pair.correct.verb, position, "cloze pair ranked");
            positions.push(position);
        }

        let mean_position = mean(positions.iter().copied());
        let adjusted_mean_position = {
            let hits: Vec<usize> = positions.iter().copied().filter(|&p| p < verb_count).collect();
            (!hits.is_empty()).then(|| mean(hits.into_iter()))
        };

        info!(
            mode = %mode,
            pairs = pairs.len(),
            mean = mean_position,
            adjusted = ?adjusted_mean_position,
            "cloze evaluation finished"
        );

        Ok(EvaluationReport {
            mode,
            verb_count,
            positions,
            mean_position,
            adjusted_mean_position,
        })
    }
}

/// 1-based rank of the first prediction for `verb`.
pub fn position_of(ranked: &[Prediction], verb: &str) -> Option<usize> {
    ranked.iter().position(|p| p.verb == verb).map(|i| i + 1)
}

fn mean(values: impl ExactSizeIterator<Item = usize>) -> f64 {
    let n = values.len();
    values.sum::<usize>() as f64 / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::corpus::CorpusBuilder;
    use crate::core::model::Model;
    use crate::schema::event::{Dependency, Event};
    use crate::schema::stream::read_tsv;

    fn market_model() -> Model {
        let text = std::fs::read_to_string("tests/fixtures/test_events.tsv").unwrap();
        let mut builder = CorpusBuilder::new();
        builder.observe_all(&read_tsv(&text));
        builder.build()
    }

    fn subj(verb: &str) -> Event {
        Event::new(verb, "trader", Dependency::Subject)
    }

    #[test]
    fn hit_is_reported_by_rank() {
        let model = market_model();
        let predictor = ChainPredictor::new(&model);
        let harness = EvaluationHarness::new(&predictor);

        let pairs = vec![ClozePair::new(vec![subj("walk")], subj("bark"))];
        let report = harness.evaluate(&pairs, ScoringMode::PmiOnly).unwrap();
        assert_eq!(report.positions, vec![1]);
        assert_eq!(report.mean_position, 1.0);
        assert_eq!(report.adjusted_mean_position, Some(1.0));
        assert_eq!(report.hits(), 1);
    }

    #[test]
    fn miss_costs_vocabulary_size_and_is_not_adjusted() {
        let model = market_model();
        let predictor = ChainPredictor::new(&model);
        let harness = EvaluationHarness::new(&predictor);

        let pairs = vec![
            ClozePair::new(vec![subj("walk")], subj("bark")),
            ClozePair::new(vec![subj("walk")], subj("fly")),
        ];
        let report = harness.evaluate(&pairs, ScoringMode::PmiOnly).unwrap();
        assert_eq!(report.verb_count, model.verb_count());
        assert_eq!(report.positions, vec![1, model.verb_count()]);
        assert_eq!(report.mean_position, (1 + model.verb_count()) as f64 / 2.0);
        assert_eq!(report.adjusted_mean_position, Some(1.0));
    }

    #[test]
    fn all_misses_leave_adjusted_mean_undefined() {
        let model = market_model();
        let predictor = ChainPredictor::new(&model);
        let harness = EvaluationHarness::new(&predictor);

        let pairs = vec![
            ClozePair::new(vec![subj("buy")], subj("fly")),
            // chain verbs are never ranked, so this is a miss too
            ClozePair::new(vec![subj("buy")], subj("buy")),
        ];
        let report = harness.evaluate(&pairs, ScoringMode::PmiOnly).unwrap();
        assert!(report.positions.iter().all(|&p| p == model.verb_count()));
        assert_eq!(report.adjusted_mean_position, None);
        assert_eq!(report.hits(), 0);
        assert!(report.to_string().contains("undefined"));
    }

    #[test]
    fn match_ignores_role_and_argument() {
        let model = market_model();
        let predictor = ChainPredictor::new(&model);
        let harness = EvaluationHarness::new(&predictor);

        let correct = Event::new("bark", "moon", Dependency::PrepositionalObject);
        let pairs = vec![ClozePair::new(vec![subj("walk")], correct)];
        let report = harness.evaluate(&pairs, ScoringMode::PmiOnly).unwrap();
        assert_eq!(report.positions, vec![1]);
    }

    #[test]
    fn empty_pairs_rejected() {
        let model = market_model();
        let predictor = ChainPredictor::new(&model);
        assert_eq!(
            EvaluationHarness::new(&predictor).evaluate(&[], ScoringMode::PmiOnly),
            Err(EvaluationError::NoPairs)
        );
    }

    #[test]
    fn predictor_errors_surface() {
        let model = market_model();
        let predictor = ChainPredictor::new(&model);
        let pairs = vec![ClozePair::new(vec![subj("walk")], subj("bark"))];
        assert_eq!(
            EvaluationHarness::new(&predictor).evaluate(&pairs, ScoringMode::EmbeddingOnly),
            Err(EvaluationError::Predict(PredictError::MissingSimilarity(
                ScoringMode::EmbeddingOnly
            )))
        );
    }

    #[test]
    fn position_of_is_one_based() {
        let ranked = vec![
            Prediction { verb: "sell".into(), score: 2.0 },
            Prediction { verb: "hold".into(), score: 1.0 },
        ];
        assert_eq!(position_of(&ranked, "sell"), Some(1));
        assert_eq!(position_of(&ranked, "hold"), Some(2));
        assert_eq!(position_of(&ranked, "pay"), None);
    }
}
