/// Marginal, joint and PMI estimates over a frozen `Model`.
///
/// This is the single place where missing counts become zeros: an unseen
/// verb has marginal 0 and PMI 0.0. An empty corpus is different and is
/// reported as `EstimateError::DegenerateProbability`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::model::Model;
use crate::schema::event::EventKey;

/// Added to the joint probability by `PmiVariant::Smoothed`.
const JOINT_EPSILON: f64 = 1e-8;
/// Added to the second marginal by `PmiVariant::Smoothed`.
const MARGINAL_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EstimateError {
    #[error("degenerate probability: {0} is zero")]
    DegenerateProbability(Denominator),
}

/// The count a probability is divided by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denominator {
    TotalEvents,
    TotalCoreference,
}

impl std::fmt::Display for Denominator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TotalEvents => f.write_str("total event count"),
            Self::TotalCoreference => f.write_str("total coreference count"),
        }
    }
}

/// Which PMI formula to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PmiVariant {
    /// `ln(joint / (m1 · m2))`, or exactly 0.0 when any factor is zero.
    #[default]
    Canonical,
    /// Epsilon-regularised form. Never hits `ln(0)` on the joint, but its
    /// sign and scale differ from `Canonical` near zero.
    Smoothed,
}

/// Pure estimates over a borrowed model. Cheap to copy and safe to share
/// across threads.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilityEstimator<'m> {
    model: &'m Model,
    variant: PmiVariant,
}

impl<'m> ProbabilityEstimator<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            variant: PmiVariant::Canonical,
        }
    }

    pub fn with_variant(mut self, variant: PmiVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn variant(&self) -> PmiVariant {
        self.variant
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    /// P(e): subject plus object frequency of the verb over all events.
    pub fn marginal(&self, event: &EventKey) -> Result<f64, EstimateError> {
        self.marginal_of(&event.verb)
    }

    /// P(e1, e2): both directed coreference entries over the matrix total.
    /// Symmetric in its arguments.
    pub fn joint(&self, e1: &EventKey, e2: &EventKey) -> Result<f64, EstimateError> {
        self.joint_of(&e1.verb, &e2.verb)
    }

    /// Pointwise mutual information of two events under the configured
    /// variant.
    pub fn pmi(&self, e1: &EventKey, e2: &EventKey) -> Result<f64, EstimateError> {
        self.pmi_of(&e1.verb, &e2.verb)
    }

    pub(crate) fn marginal_of(&self, verb: &str) -> Result<f64, EstimateError> {
        let total = self.model.total_events();
        if total == 0 {
            return Err(EstimateError::DegenerateProbability(Denominator::TotalEvents));
        }
        Ok(self.model.verb_frequency(verb) as f64 / total as f64)
    }

    pub(crate) fn joint_of(&self, v1: &str, v2: &str) -> Result<f64, EstimateError> {
        let total = self.model.total_coreference();
        if total == 0 {
            return Err(EstimateError::DegenerateProbability(
                Denominator::TotalCoreference,
            ));
        }
        let shared = self.model.coreference(v1, v2) + self.model.coreference(v2, v1);
        Ok(shared as f64 / total as f64)
    }

    pub(crate) fn pmi_of(&self, v1: &str, v2: &str) -> Result<f64, EstimateError> {
        let joint = self.joint_of(v1, v2)?;
        let m1 = self.marginal_of(v1)?;
        let m2 = self.marginal_of(v2)?;

        Ok(match self.variant {
            PmiVariant::Canonical => canonical_pmi(joint, m1, m2),
            PmiVariant::Smoothed => smoothed_pmi(joint, m1, m2),
        })
    }
}

fn canonical_pmi(joint: f64, m1: f64, m2: f64) -> f64 {
    if m1 == 0.0 || m2 == 0.0 || joint == 0.0 {
        return 0.0;
    }
    (joint / (m1 * m2)).ln()
}

fn smoothed_pmi(joint: f64, m1: f64, m2: f64) -> f64 {
    let numerator = (joint + JOINT_EPSILON).ln();
    // ln(0) = -inf and exp(-inf) = 0, so an unseen first verb drops out
    let denominator = m1.ln() + (m2 + MARGINAL_EPSILON).ln();
    let result = (numerator - denominator.exp()).exp();
    if result > 0.0 {
        result.ln()
    } else {
        0.0
    }
}
