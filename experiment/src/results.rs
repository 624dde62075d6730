//! Result records and the single end-of-run JSON write.
//!
//! Maps are insertion-ordered (`IndexMap`) so the output file lists models
//! and conditions in the order they were requested.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::input::InputItem;

/// One provider call made while generating a counterargument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTrace {
    pub step: String,
    pub input: String,
    pub output: String,
}

/// Final text for one (item, model, condition) plus the optional per-stage trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterargumentResult {
    pub counterargument: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StageTrace>>,
}

impl CounterargumentResult {
    pub fn new(counterargument: impl Into<String>) -> Self {
        Self {
            counterargument: counterargument.into(),
            steps: None,
        }
    }
}

// Older generated files stored the bare counterargument string per condition.
impl<'de> Deserialize<'de> for CounterargumentResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Full {
                counterargument: String,
                #[serde(default)]
                steps: Option<Vec<StageTrace>>,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(counterargument) => Self {
                counterargument,
                steps: None,
            },
            Repr::Full {
                counterargument,
                steps,
            } => Self {
                counterargument,
                steps,
            },
        })
    }
}

/// Rubric outcome for one criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub id: u32,
    pub name: String,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// condition id → result
pub type ConditionResults = IndexMap<String, CounterargumentResult>;

/// Everything produced for one input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub topic: String,
    pub affirmative_argument: String,
    /// model alias → condition id → result
    #[serde(default)]
    pub counterarguments: IndexMap<String, ConditionResults>,
    /// model alias → per-criterion results. Rebuilt on every evaluation pass.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub evaluation_results: Option<IndexMap<String, Vec<EvaluationResult>>>,
}

impl ItemResult {
    pub fn for_item(item: &InputItem) -> Self {
        Self {
            id: item.id,
            topic: item.topic.clone(),
            affirmative_argument: item.argument.clone(),
            counterarguments: IndexMap::new(),
            evaluation_results: None,
        }
    }

    /// Open the evaluation block so it appears in output even if every model is skipped.
    pub fn begin_evaluation(&mut self) -> &mut IndexMap<String, Vec<EvaluationResult>> {
        self.evaluation_results.get_or_insert_with(IndexMap::new)
    }
}

/// Number every condition's text for the evaluator: `"1. first\n2. second\n"`.
pub fn format_counterarguments(results: &ConditionResults) -> String {
    results
        .values()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n", i + 1, r.counterargument))
        .collect()
}

/// Serialize results as pretty UTF-8 JSON (non-ASCII kept as-is).
pub fn to_pretty_json(results: &[ItemResult]) -> ConfigResult<String> {
    encode_pretty(results)
}

fn encode_pretty<T: Serialize + ?Sized>(value: &T) -> ConfigResult<String> {
    serde_json::to_string_pretty(value).map_err(ConfigError::Encode)
}

/// Write the whole run in one go, creating parent directories.
pub fn write_results(path: &Path, results: &[ItemResult]) -> ConfigResult<()> {
    let json = to_pretty_json(results)?;
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, json).map_err(write_err)?;
    tracing::info!(path = %path.display(), items = results.len(), "results written");
    Ok(())
}

/// Read a previously generated results file (input of the evaluate pass).
pub fn load_results(path: &Path) -> ConfigResult<Vec<ItemResult>> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if !value.is_array() {
        return Err(ConfigError::NotAnArray {
            path: path.to_path_buf(),
        });
    }
    serde_json::from_value(value).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
