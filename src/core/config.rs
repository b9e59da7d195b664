/// Run configuration, loaded from RON.
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::core::estimator::PmiVariant;
use crate::core::model::Model;
use crate::core::predictor::{ChainPredictor, PredictError, ScoringMode, DEFAULT_ALPHA};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("alpha must lie in [0, 1], got {0}")]
    InvalidAlpha(f64),
    #[error("shard_size must be positive")]
    ZeroShardSize,
}

/// Settings for training and evaluation runs. Every field is optional in
/// the RON source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClozeConfig {
    pub mode: ScoringMode,
    /// Similarity weight for interpolated scoring.
    pub alpha: f64,
    pub pmi: PmiVariant,
    /// Rows to print per prediction; rankings themselves are never cut.
    pub top_n: Option<usize>,
    /// Events per corpus shard.
    pub shard_size: usize,
    /// Time budget in milliseconds for each predictor built from this
    /// config, counted from when it is built.
    pub deadline_ms: Option<u64>,
}

impl Default for ClozeConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::PmiOnly,
            alpha: DEFAULT_ALPHA,
            pmi: PmiVariant::Canonical,
            top_n: None,
            shard_size: 10_000,
            deadline_ms: None,
        }
    }
}

impl ClozeConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and validate a RON config.
    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        let config: ClozeConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ConfigError::InvalidAlpha(self.alpha));
        }
        if self.shard_size == 0 {
            return Err(ConfigError::ZeroShardSize);
        }
        Ok(())
    }

    /// A predictor over `model` with this config's alpha, PMI variant and
    /// deadline (counted from now).
    pub fn predictor<'m>(&self, model: &'m Model) -> Result<ChainPredictor<'m>, PredictError> {
        let mut predictor = ChainPredictor::new(model)
            .with_alpha(self.alpha)?
            .with_pmi_variant(self.pmi);
        if let Some(ms) = self.deadline_ms {
            predictor = predictor.with_deadline(Instant::now() + Duration::from_millis(ms));
        }
        Ok(predictor)
    }
}
