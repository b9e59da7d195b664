/// Next-event prediction: ranks every model verb as the continuation of a
/// partial chain.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use thiserror::Error;

use crate::core::estimator::{EstimateError, PmiVariant, ProbabilityEstimator};
use crate::core::model::Model;
use crate::core::similarity::Similarity;
use crate::schema::event::Event;

/// Interpolation weight given to similarity when none is configured.
pub const DEFAULT_ALPHA: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PredictError {
    #[error("estimate error: {0}")]
    Estimate(#[from] EstimateError),
    #[error("{0} scoring requires a similarity capability")]
    MissingSimilarity(ScoringMode),
    #[error("interpolation weight {0} is outside [0, 1]")]
    InvalidAlpha(f64),
    #[error("prediction deadline exceeded")]
    DeadlineExceeded,
}

/// How candidate verbs are scored against a chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    #[default]
    PmiOnly,
    EmbeddingOnly,
    Interpolated,
}

impl ScoringMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PmiOnly => "pmi",
            Self::EmbeddingOnly => "embedding",
            Self::Interpolated => "interpolated",
        }
    }

    pub fn needs_similarity(&self) -> bool {
        !matches!(self, Self::PmiOnly)
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pmi" | "pmi_only" => Ok(Self::PmiOnly),
            "embedding" | "embedding_only" => Ok(Self::EmbeddingOnly),
            "interpolated" => Ok(Self::Interpolated),
            other => Err(format!("unknown scoring mode '{}'", other)),
        }
    }
}

/// A ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub verb: String,
    pub score: f64,
}

/// Scores candidates against a frozen model. Holds only shared borrows,
/// so one predictor can serve concurrent callers.
#[derive(Clone, Copy)]
pub struct ChainPredictor<'m> {
    estimator: ProbabilityEstimator<'m>,
    similarity: Option<&'m dyn Similarity>,
    alpha: f64,
    deadline: Option<Instant>,
}

impl<'m> ChainPredictor<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            estimator: ProbabilityEstimator::new(model),
            similarity: None,
            alpha: DEFAULT_ALPHA,
            deadline: None,
        }
    }

    /// Set the similarity weight used by `Interpolated` scoring.
    pub fn with_alpha(mut self, alpha: f64) -> Result<Self, PredictError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(PredictError::InvalidAlpha(alpha));
        }
        self.alpha = alpha;
        Ok(self)
    }

    pub fn with_similarity(mut self, similarity: &'m dyn Similarity) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn with_pmi_variant(mut self, variant: PmiVariant) -> Self {
        self.estimator = self.estimator.with_variant(variant);
        self
    }

    /// Abort scoring with `DeadlineExceeded` once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn model(&self) -> &'m Model {
        self.estimator.model()
    }

    /// Rank every model verb not already in `chain`, best first.
    ///
    /// Chain verbs are excluded by verb alone, whatever their argument or
    /// role. Equal scores are ordered by verb so output is reproducible.
    /// The full list is returned.
    pub fn predict(&self, chain: &[Event], mode: ScoringMode) -> Result<Vec<Prediction>, PredictError> {
        let similarity = match (mode.needs_similarity(), self.similarity) {
            (true, None) => return Err(PredictError::MissingSimilarity(mode)),
            (_, similarity) => similarity,
        };

        let chain_verbs: FxHashSet<&str> = chain.iter().map(|e| e.verb.as_str()).collect();
        let candidates: Vec<&String> = self
            .model()
            .verbs()
            .iter()
            .filter(|v| !chain_verbs.contains(v.as_str()))
            .collect();

        let score = |verb: &&String| -> Result<Prediction, PredictError> {
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(PredictError::DeadlineExceeded);
            }
            let mut total = 0.0;
            for event in chain {
                total += match (mode, similarity) {
                    (ScoringMode::PmiOnly, _) => self.estimator.pmi_of(&event.verb, verb)?,
                    (ScoringMode::EmbeddingOnly, Some(sim)) => sim.similarity(&event.verb, verb),
                    (ScoringMode::Interpolated, Some(sim)) => {
                        self.alpha * sim.similarity(&event.verb, verb)
                            + (1.0 - self.alpha) * self.estimator.pmi_of(&event.verb, verb)?
                    }
                    (_, None) => return Err(PredictError::MissingSimilarity(mode)),
                };
            }
            Ok(Prediction {
                verb: (*verb).clone(),
                score: total,
            })
        };

        #[cfg(feature = "parallel")]
        let mut ranked = candidates
            .par_iter()
            .map(score)
            .collect::<Result<Vec<_>, _>>()?;

        #[cfg(not(feature = "parallel"))]
        let mut ranked = candidates
            .iter()
            .map(score)
            .collect::<Result<Vec<_>, _>>()?;

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.verb.cmp(&b.verb)));
        Ok(ranked)
    }
}

impl fmt::Debug for ChainPredictor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainPredictor")
            .field("variant", &self.estimator.variant())
            .field("has_similarity", &self.similarity.is_some())
            .field("alpha", &self.alpha)
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// The first `n` predictions, or all of them when fewer.
pub fn top_n(predictions: &[Prediction], n: usize) -> &[Prediction] {
    &predictions[..n.min(predictions.len())]
}
