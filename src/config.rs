//! Run configuration for the consensus pipeline.

use crate::commands::validate::DEFAULT_OVERLAP_RATIO;
use crate::error::{Result, SvError};

/// Settings shared by reading, validation and output.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusConfig {
    /// Reciprocal overlap a validating call needs with its cluster.
    pub overlap_ratio: f64,
    /// Wiggle given to calls whose input row has none.
    pub default_wiggle: i64,
    /// Sample name written to VCF and SVP output.
    pub sample: String,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsensusConfig {
    pub fn new() -> Self {
        Self {
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
            default_wiggle: 0,
            sample: "SAMPLE".to_string(),
        }
    }

    /// Set the reciprocal overlap ratio.
    pub fn with_overlap_ratio(mut self, ratio: f64) -> Self {
        self.overlap_ratio = ratio;
        self
    }

    /// Set the wiggle used for rows without one.
    pub fn with_default_wiggle(mut self, wiggle: i64) -> Self {
        self.default_wiggle = wiggle;
        self
    }

    /// Set the sample name.
    pub fn with_sample(mut self, sample: impl Into<String>) -> Self {
        self.sample = sample.into();
        self
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !(self.overlap_ratio > 0.0 && self.overlap_ratio <= 1.0) {
            return Err(SvError::InvalidConfig(format!(
                "overlap ratio must be in (0, 1], got {}",
                self.overlap_ratio
            )));
        }
        if self.default_wiggle < 0 {
            return Err(SvError::InvalidConfig(format!(
                "wiggle must be non-negative, got {}",
                self.default_wiggle
            )));
        }
        if self.sample.is_empty() || self.sample.contains(char::is_whitespace) {
            return Err(SvError::InvalidConfig(format!(
                "invalid sample name '{}'",
                self.sample
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConsensusConfig::default();
        assert_eq!(config.overlap_ratio, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_ratio() {
        for ratio in [0.0, -0.1, 1.5, f64::NAN] {
            let config = ConsensusConfig::new().with_overlap_ratio(ratio);
            assert!(matches!(config.validate(), Err(SvError::InvalidConfig(_))));
        }
        assert!(ConsensusConfig::new()
            .with_overlap_ratio(1.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_rejects_bad_wiggle_and_sample() {
        assert!(ConsensusConfig::new()
            .with_default_wiggle(-1)
            .validate()
            .is_err());
        assert!(ConsensusConfig::new()
            .with_sample("two words")
            .validate()
            .is_err());
    }
}
