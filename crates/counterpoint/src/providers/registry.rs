//! Alias → client resolution, built once at startup from [`AppConfig`].

use std::collections::HashMap;
use std::sync::Arc;

use experiment::{ConfigError, ConfigResult};

use super::{ModelClient, OpenAiCompatClient, SamplingParams};
use crate::config::{AppConfig, ProviderConfig};

/// Provider API keys, read from the environment exactly once.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: HashMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.keys.keys().collect();
        names.sort();
        f.debug_struct("Credentials").field("providers", &names).finish()
    }
}

impl Credentials {
    pub fn from_env(providers: &[ProviderConfig]) -> Self {
        let mut keys = HashMap::new();
        for provider in providers {
            match std::env::var(&provider.api_key_env) {
                Ok(key) if !key.is_empty() => {
                    keys.insert(provider.name.clone(), key);
                }
                _ => tracing::warn!(
                    provider = %provider.name,
                    env = %provider.api_key_env,
                    "API key not set; requests to this provider will be unauthenticated"
                ),
            }
        }
        Self { keys }
    }

    pub fn with_key(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(provider.into(), key.into());
        self
    }

    pub fn get(&self, provider: &str) -> Option<&str> {
        self.keys.get(provider).map(String::as_str)
    }
}

/// A model alias bound to its client and provider-side model id.
#[derive(Clone)]
pub struct ResolvedModel {
    pub alias: String,
    pub model: String,
    pub client: Arc<dyn ModelClient>,
}

impl ResolvedModel {
    pub fn params(&self, temperature: f32, max_tokens: u32) -> SamplingParams {
        SamplingParams::new(self.model.clone(), temperature, max_tokens)
    }
}

/// All usable model aliases.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    models: HashMap<String, ResolvedModel>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One adapter per alias, all sharing one HTTP connection pool.
    pub fn from_config(config: &AppConfig, credentials: &Credentials) -> ConfigResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::InvalidConfig(format!("failed to create HTTP client: {e}")))?;

        let mut registry = Self::new();
        for (alias, model) in &config.models {
            let provider = config.provider(&model.provider).ok_or_else(|| {
                ConfigError::InvalidConfig(format!(
                    "model '{alias}' references unknown provider '{}'",
                    model.provider
                ))
            })?;
            let client = OpenAiCompatClient::with_http(
                provider.name.clone(),
                provider.base_url.clone(),
                credentials.get(&provider.name).map(str::to_string),
                model.client_type,
                http.clone(),
            );
            registry.insert(alias.clone(), model.model.clone(), Arc::new(client));
        }
        Ok(registry)
    }

    /// Register (or replace) an alias.
    pub fn insert(
        &mut self,
        alias: impl Into<String>,
        model: impl Into<String>,
        client: Arc<dyn ModelClient>,
    ) {
        let alias = alias.into();
        self.models.insert(
            alias.clone(),
            ResolvedModel {
                alias,
                model: model.into(),
                client,
            },
        );
    }

    pub fn resolve(&self, alias: &str) -> ConfigResult<&ResolvedModel> {
        self.models
            .get(alias)
            .ok_or_else(|| ConfigError::UnknownModel(alias.to_string()))
    }
}
