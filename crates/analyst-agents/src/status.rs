//! Setup report: which backends a research run would use

use crate::config::AgentConfig;
use analyst_core::DataKind;
use analyst_data::{provider_status, GatewayConfig, ProviderKeys, ProviderStatus};
use analyst_llm::providers::{AnthropicProvider, API_KEY_ENV};
use serde::Serialize;

/// Credentials and providers available to a research run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupStatus {
    pub model: String,
    /// Whether the LLM API key is set
    pub llm_key: bool,
    pub providers: Vec<ProviderStatus>,
}

impl SetupStatus {
    pub fn new(
        config: &AgentConfig,
        llm_key: bool,
        gateway: &GatewayConfig,
        keys: &ProviderKeys,
    ) -> Self {
        Self {
            model: config.model.clone(),
            llm_key,
            providers: provider_status(gateway, keys),
        }
    }

    /// Status of the credentials in the environment
    pub fn from_env(config: &AgentConfig, gateway: &GatewayConfig) -> Self {
        Self::new(
            config,
            AnthropicProvider::key_configured(),
            gateway,
            &ProviderKeys::from_env(),
        )
    }

    /// The model is reachable and company fundamentals can be fetched
    pub fn is_configured(&self) -> bool {
        self.llm_key
            && self
                .providers
                .iter()
                .any(|p| p.enabled && p.kinds.contains(&DataKind::Fundamentals))
    }

    /// Environment variables whose absence disables something
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let llm = (!self.llm_key).then_some(API_KEY_ENV);
        llm.into_iter()
            .chain(
                self.providers
                    .iter()
                    .filter(|p| !p.enabled)
                    .filter_map(|p| p.credential),
            )
            .collect()
    }
}
