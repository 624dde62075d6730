//! Prompt store and placeholder substitution.
//!
//! Generation prompts use hash-delimited markers (`#topic#`, `#argument#`,
//! `###premise_list###`); evaluation prompts use brace markers
//! (`{topic}`, `{criteria_description}`, ...). Both are literal
//! find-and-replace. A template that omits a marker is left untouched.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::condition::Placeholders;
use crate::error::{ConfigError, ConfigResult};

pub const TOPIC_MARKER: &str = "#topic#";
pub const ARGUMENT_MARKER: &str = "#argument#";
pub const PREMISE_LIST_MARKER: &str = "###premise_list###";

/// Template key names used inside each condition's prompt block.
pub mod keys {
    pub const PREMISE_GENERATION: &str = "premise_generation_prompt";
    pub const PREMISE_DECISION: &str = "premise_decision_prompt";
    pub const COUNTERARGUMENT_GENERATION: &str = "counter-argument_generation_prompt";
}

/// Values available for substitution into a generation template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub topic: &'a str,
    pub argument: &'a str,
    pub premise_list: &'a str,
}

/// Substitute only the markers enabled in `fill`.
pub fn fill_template(template: &str, fill: Placeholders, values: &TemplateValues<'_>) -> String {
    let mut out = template.to_string();
    if fill.topic {
        out = out.replace(TOPIC_MARKER, values.topic);
    }
    if fill.argument {
        out = out.replace(ARGUMENT_MARKER, values.argument);
    }
    if fill.premise_list {
        out = out.replace(PREMISE_LIST_MARKER, values.premise_list);
    }
    out
}

/// Replace `{name}` markers with values in one left-to-right pass.
///
/// Substituted text is never rescanned, so a value that itself contains
/// `{topic}` comes through verbatim. Braces that do not wrap a known name
/// are copied as-is.
pub fn render_braced(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let marker = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, value)| (close, *value))
        });
        match marker {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Condition-keyed generation templates plus the shared system prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptStore {
    system_prompt: String,
    templates: HashMap<String, BTreeMap<String, String>>,
}

#[derive(Deserialize)]
struct RawPromptFile {
    system_prompt: String,
    #[serde(flatten)]
    rest: HashMap<String, serde_json::Value>,
}

impl PromptStore {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            templates: HashMap::new(),
        }
    }

    /// Builder-style insert, mostly for tests and programmatic setups.
    pub fn with_template(
        mut self,
        condition: impl Into<String>,
        key: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.templates
            .entry(condition.into())
            .or_default()
            .insert(key.into(), template.into());
        self
    }

    pub fn from_json(json: &str, path: &Path) -> ConfigResult<Self> {
        let raw: RawPromptFile = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut templates = HashMap::new();
        for (condition, value) in raw.rest {
            match serde_json::from_value::<BTreeMap<String, String>>(value) {
                Ok(block) => {
                    templates.insert(condition, block);
                }
                Err(e) => {
                    tracing::warn!(key = %condition, error = %e, "ignoring non-template entry in prompt file");
                }
            }
        }

        Ok(Self {
            system_prompt: raw.system_prompt,
            templates,
        })
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_json(&json, path)?;
        tracing::debug!(
            path = %path.display(),
            conditions = store.templates.len(),
            "loaded prompt store"
        );
        Ok(store)
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn template(&self, condition: &str, key: &str) -> Option<&str> {
        self.templates
            .get(condition)
            .and_then(|block| block.get(key))
            .map(String::as_str)
    }
}

/// Templates driving the rubric evaluator.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationPrompts {
    /// `{topic}`, `{affirmative_argument}`, `{counter_arguments}`.
    pub system_prompt_template: String,
    pub analysis_user_prompt: String,
    /// `{selection_criteria}`, `{criteria_description}`.
    pub selection_user_prompt_template: String,
    /// `{ranking_criteria}`, `{criteria_description}`.
    pub ranking_user_prompt_template: String,
}

impl EvaluationPrompts {
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn system_prompt(&self, topic: &str, argument: &str, counterarguments: &str) -> String {
        render_braced(
            &self.system_prompt_template,
            &[
                ("topic", topic),
                ("affirmative_argument", argument),
                ("counter_arguments", counterarguments),
            ],
        )
    }

    pub fn selection_prompt(&self, name: &str, description: &str) -> String {
        render_braced(
            &self.selection_user_prompt_template,
            &[
                ("selection_criteria", name),
                ("criteria_description", description),
            ],
        )
    }

    pub fn ranking_prompt(&self, name: &str, description: &str) -> String {
        render_braced(
            &self.ranking_user_prompt_template,
            &[
                ("ranking_criteria", name),
                ("criteria_description", description),
            ],
        )
    }
}
