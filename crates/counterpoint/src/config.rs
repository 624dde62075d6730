//! Runtime configuration: providers, model aliases, enabled conditions, file paths.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (`--prompts`, `--rubric`, `--evaluation-prompts`)
//! 2. Environment variables (`COUNTERPOINT_PROMPTS`, ...)
//! 3. The TOML file named by `--config` / `COUNTERPOINT_CONFIG`
//! 4. Built-in defaults
//!
//! API keys are never stored here; only the name of the environment variable
//! each provider reads its key from. See [`crate::providers::Credentials`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use experiment::{ConditionSpec, ConditionTable, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

use crate::providers::ClientType;

pub const ENV_CONFIG: &str = "COUNTERPOINT_CONFIG";
const ENV_PROMPTS: &str = "COUNTERPOINT_PROMPTS";
const ENV_RUBRIC: &str = "COUNTERPOINT_RUBRIC";
const ENV_EVAL_PROMPTS: &str = "COUNTERPOINT_EVAL_PROMPTS";

const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_EVALUATION_MODEL: &str = "gpt-4o-2024-08-06";

/// An OpenAI-compatible provider endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

/// A model alias usable on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name of an entry in `providers`.
    pub provider: String,
    /// Provider-side model id.
    pub model: String,
    #[serde(default)]
    pub client_type: ClientType,
}

/// Locations of the prompt / rubric data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub prompts: PathBuf,
    pub rubric: PathBuf,
    pub evaluation_prompts: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prompts: PathBuf::from("prompts/prompts.json"),
            rubric: PathBuf::from("prompts/evaluation_index.json"),
            evaluation_prompts: PathBuf::from("prompts/evaluation_prompts.json"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub providers: Vec<ProviderConfig>,
    /// alias → model
    pub models: BTreeMap<String, ModelConfig>,
    /// Condition ids that may be requested. Others are skipped with a warning.
    pub conditions: Vec<String>,
    /// Extra or overriding stage tables, keyed by condition id.
    pub condition_stages: BTreeMap<String, ConditionSpec>,
    pub paths: PathsConfig,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let providers = vec![
            ProviderConfig {
                name: "openai".into(),
                base_url: "https://api.openai.com/v1".into(),
                api_key_env: "OPENAI_API_KEY".into(),
            },
            ProviderConfig {
                name: "groq".into(),
                base_url: "https://api.groq.com/openai/v1".into(),
                api_key_env: "GROQ_API_KEY".into(),
            },
        ];

        let model = |provider: &str, model: &str| ModelConfig {
            provider: provider.into(),
            model: model.into(),
            client_type: ClientType::Chat,
        };
        let mut models = BTreeMap::new();
        models.insert("gpt-3.5-turbo".into(), model("openai", "gpt-3.5-turbo"));
        models.insert("gpt-4".into(), model("openai", "gpt-4"));
        models.insert(
            DEFAULT_EVALUATION_MODEL.into(),
            model("openai", DEFAULT_EVALUATION_MODEL),
        );
        models.insert("llama3-70b".into(), model("groq", "llama3-70b-8192"));

        Self {
            providers,
            models,
            conditions: ConditionTable::default().ids().map(str::to_string).collect(),
            condition_stages: BTreeMap::new(),
            paths: PathsConfig::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    pub fn from_toml(raw: &str) -> ConfigResult<Self> {
        toml::from_str(raw).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    /// Load from `path`, else from `$COUNTERPOINT_CONFIG`, else defaults.
    /// Environment path overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let env_path = std::env::var_os(ENV_CONFIG).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
                let config = Self::from_toml(&raw)?;
                tracing::debug!(path = %path.display(), "loaded config file");
                config
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(p) = std::env::var_os(ENV_PROMPTS) {
            self.paths.prompts = PathBuf::from(p);
        }
        if let Some(p) = std::env::var_os(ENV_RUBRIC) {
            self.paths.rubric = PathBuf::from(p);
        }
        if let Some(p) = std::env::var_os(ENV_EVAL_PROMPTS) {
            self.paths.evaluation_prompts = PathBuf::from(p);
        }
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn model(&self, alias: &str) -> ConfigResult<&ModelConfig> {
        self.models
            .get(alias)
            .ok_or_else(|| ConfigError::UnknownModel(alias.to_string()))
    }

    /// Fail on the first alias that is not configured.
    pub fn check_models<'a>(&self, aliases: impl IntoIterator<Item = &'a String>) -> ConfigResult<()> {
        for alias in aliases {
            self.model(alias)?;
        }
        Ok(())
    }

    /// Built-in table plus `condition_stages`, restricted to `conditions`.
    pub fn condition_table(&self) -> ConditionTable {
        let mut table = ConditionTable::default();
        for (id, spec) in &self.condition_stages {
            table.insert(id.clone(), spec.clone());
        }
        let unknown = table.restrict_to(&self.conditions);
        for id in unknown {
            tracing::warn!(condition = %id, "enabled condition has no stage table; ignoring");
        }
        table
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |msg: String| Err(ConfigError::InvalidConfig(msg));

        if self.request_timeout_secs == 0 {
            return invalid("request_timeout_secs must be > 0".into());
        }
        for (alias, model) in &self.models {
            if self.provider(&model.provider).is_none() {
                return invalid(format!(
                    "model '{alias}' references unknown provider '{}'",
                    model.provider
                ));
            }
        }
        for (id, spec) in &self.condition_stages {
            if !spec.is_well_formed() {
                return invalid(format!(
                    "condition '{id}' must end with a counterargument_generation stage"
                ));
            }
        }
        let table = ConditionTable::default();
        for id in &self.conditions {
            if !table.contains(id) && !self.condition_stages.contains_key(id) {
                return invalid(format!("condition '{id}' is enabled but has no stage table"));
            }
        }
        Ok(())
    }

    /// Apply CLI path overrides.
    pub fn with_paths(
        mut self,
        prompts: Option<PathBuf>,
        rubric: Option<PathBuf>,
        evaluation_prompts: Option<PathBuf>,
    ) -> Self {
        if let Some(p) = prompts {
            self.paths.prompts = p;
        }
        if let Some(p) = rubric {
            self.paths.rubric = p;
        }
        if let Some(p) = evaluation_prompts {
            self.paths.evaluation_prompts = p;
        }
        self
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
