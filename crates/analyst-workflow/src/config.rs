//! Workflow configuration

use analyst_core::QualityScore;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Rejected workflow settings
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_iterations must be at least 1")]
    ZeroIterations,

    #[error("quality_threshold must be within 0-10, got {0}")]
    ThresholdOutOfRange(f32),

    #[error("timeout must be greater than 0")]
    ZeroTimeout,
}

/// Where a revision pass re-enters the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionPolicy {
    /// Every revision re-runs the analyst, then the writer
    #[default]
    Reanalyze,
    /// Re-run only the writer when every deficiency is about presentation
    Targeted,
}

/// Workflow controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Upper bound on analyst/writer/checker cycles
    pub max_iterations: u32,

    /// Minimum passing score on the 0-10 scale
    pub quality_threshold: f32,

    /// Wall-clock budget for the whole run
    pub timeout: Duration,

    /// How long a node may keep running past the deadline before it is cut off
    pub node_grace: Duration,

    pub revision_policy: RevisionPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            quality_threshold: 7.0,
            timeout: Duration::from_secs(300),
            node_grace: Duration::from_secs(5),
            revision_policy: RevisionPolicy::Reanalyze,
        }
    }
}

impl WorkflowConfig {
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }

        if !(QualityScore::MIN..=QualityScore::MAX).contains(&self.quality_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.quality_threshold));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }
}

/// Builder for WorkflowConfig
#[derive(Debug, Default)]
pub struct WorkflowConfigBuilder {
    max_iterations: Option<u32>,
    quality_threshold: Option<f32>,
    timeout: Option<Duration>,
    node_grace: Option<Duration>,
    revision_policy: Option<RevisionPolicy>,
}

impl WorkflowConfigBuilder {
    pub fn max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn quality_threshold(mut self, threshold: f32) -> Self {
        self.quality_threshold = Some(threshold);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn node_grace(mut self, grace: Duration) -> Self {
        self.node_grace = Some(grace);
        self
    }

    pub fn revision_policy(mut self, policy: RevisionPolicy) -> Self {
        self.revision_policy = Some(policy);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<WorkflowConfig, ConfigError> {
        let defaults = WorkflowConfig::default();

        let config = WorkflowConfig {
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            quality_threshold: self.quality_threshold.unwrap_or(defaults.quality_threshold),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            node_grace: self.node_grace.unwrap_or(defaults.node_grace),
            revision_policy: self.revision_policy.unwrap_or(defaults.revision_policy),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.revision_policy, RevisionPolicy::Reanalyze);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = WorkflowConfig::builder()
            .max_iterations(1)
            .quality_threshold(8.5)
            .revision_policy(RevisionPolicy::Targeted)
            .build()
            .unwrap();

        assert_eq!(config.max_iterations, 1);
        assert!((config.quality_threshold - 8.5).abs() < f32::EPSILON);
        assert_eq!(config.revision_policy, RevisionPolicy::Targeted);
        assert_eq!(config.node_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            WorkflowConfig::builder().max_iterations(0).build().unwrap_err(),
            ConfigError::ZeroIterations
        );
        assert_eq!(
            WorkflowConfig::builder().quality_threshold(11.0).build().unwrap_err(),
            ConfigError::ThresholdOutOfRange(11.0)
        );
        assert_eq!(
            WorkflowConfig::builder().timeout(Duration::ZERO).build().unwrap_err(),
            ConfigError::ZeroTimeout
        );
    }
}
