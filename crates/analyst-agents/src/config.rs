//! Configuration for the research nodes

use crate::error::{ResearchError, Result};
use analyst_llm::providers::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// LLM settings shared by the planner, analyst, writer, and checker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model identifier sent to the provider
    pub model: String,

    /// Sampling temperature for planning, analysis, and writing
    pub temperature: f32,

    pub planner_max_tokens: usize,
    pub analysis_max_tokens: usize,
    pub report_max_tokens: usize,
    pub checker_max_tokens: usize,

    /// Longest source summary included in the analyst prompt
    pub summary_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            planner_max_tokens: 1024,
            analysis_max_tokens: 4096,
            report_max_tokens: 4096,
            checker_max_tokens: 1024,
            summary_chars: 500,
        }
    }
}

impl AgentConfig {
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Default configuration with the model taken from `ANALYST_MODEL`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var("ANALYST_MODEL")
            && !model.trim().is_empty()
        {
            config.model = model.trim().to_string();
        }
        debug!(model = %config.model, "Loaded agent configuration");
        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ResearchError::Config("model must not be empty".to_string()));
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ResearchError::Config(format!(
                "temperature must be within 0-1, got {}",
                self.temperature
            )));
        }

        if self.planner_max_tokens == 0
            || self.analysis_max_tokens == 0
            || self.report_max_tokens == 0
            || self.checker_max_tokens == 0
        {
            return Err(ResearchError::Config(
                "token limits must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for AgentConfig
#[derive(Debug, Default)]
pub struct AgentConfigBuilder {
    model: Option<String>,
    temperature: Option<f32>,
    analysis_max_tokens: Option<usize>,
    report_max_tokens: Option<usize>,
    summary_chars: Option<usize>,
}

impl AgentConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn analysis_max_tokens(mut self, max_tokens: usize) -> Self {
        self.analysis_max_tokens = Some(max_tokens);
        self
    }

    pub fn report_max_tokens(mut self, max_tokens: usize) -> Self {
        self.report_max_tokens = Some(max_tokens);
        self
    }

    pub fn summary_chars(mut self, chars: usize) -> Self {
        self.summary_chars = Some(chars);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AgentConfig> {
        let defaults = AgentConfig::default();

        let config = AgentConfig {
            model: self.model.unwrap_or(defaults.model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            analysis_max_tokens: self
                .analysis_max_tokens
                .unwrap_or(defaults.analysis_max_tokens),
            report_max_tokens: self.report_max_tokens.unwrap_or(defaults.report_max_tokens),
            summary_chars: self.summary_chars.unwrap_or(defaults.summary_chars),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}
