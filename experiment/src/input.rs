//! Input items and the optional ID filter.
//!
//! Items are loaded once, validated, and never mutated. The argument text is
//! read from `context`; the older `affirmative-argument` spelling is accepted
//! so that single-topic files keep working.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// One topic + affirmative argument pair to generate counterarguments for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub topic: String,
    #[serde(rename = "context")]
    pub argument: String,
}

/// Loose shape used only while validating; lets us report which key is missing.
#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default, alias = "affirmative-argument", alias = "affirmative_argument")]
    context: Option<String>,
}

impl RawItem {
    fn validate(self, index: usize) -> ConfigResult<InputItem> {
        let topic = self
            .topic
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingField {
                index,
                field: "topic",
            })?;
        let argument = self
            .context
            .filter(|a| !a.trim().is_empty())
            .ok_or(ConfigError::MissingField {
                index,
                field: "context",
            })?;
        Ok(InputItem {
            id: self.id,
            topic,
            argument,
        })
    }
}

/// Parse and validate input items from a JSON string.
///
/// Accepts an array of items or a single item object.
pub fn parse_input_items(json: &str, path: &Path) -> ConfigResult<Vec<InputItem>> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let raw_items: Vec<RawItem> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value),
        serde_json::Value::Object(_) => serde_json::from_value(value).map(|one| vec![one]),
        _ => {
            return Err(ConfigError::NotAnArray {
                path: path.to_path_buf(),
            })
        }
    }
    .map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    raw_items
        .into_iter()
        .enumerate()
        .map(|(index, raw)| raw.validate(index))
        .collect()
}

/// Read and validate the input file.
pub fn load_input_items(path: &Path) -> ConfigResult<Vec<InputItem>> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let items = parse_input_items(&json, path)?;
    tracing::debug!(path = %path.display(), count = items.len(), "loaded input items");
    Ok(items)
}

/// Restricts a run to a subset of item ids.
///
/// Parsed from `"N-M"` (inclusive range) or `"a,b,c"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdFilter {
    Range { start: u64, end: u64 },
    List(BTreeSet<u64>),
}

impl IdFilter {
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        let invalid = || ConfigError::InvalidIdFilter(raw.to_string());
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        if let Some((start, end)) = trimmed.split_once('-') {
            let start: u64 = start.trim().parse().map_err(|_| invalid())?;
            let end: u64 = end.trim().parse().map_err(|_| invalid())?;
            if start > end {
                return Err(invalid());
            }
            return Ok(Self::Range { start, end });
        }

        let ids = trimmed
            .split(',')
            .map(|part| part.trim().parse::<u64>().map_err(|_| invalid()))
            .collect::<ConfigResult<BTreeSet<_>>>()?;
        Ok(Self::List(ids))
    }

    pub fn contains(&self, id: u64) -> bool {
        match self {
            Self::Range { start, end } => (*start..=*end).contains(&id),
            Self::List(ids) => ids.contains(&id),
        }
    }

    /// Items without an id never match a filter.
    pub fn accepts(&self, item: &InputItem) -> bool {
        item.id.is_some_and(|id| self.contains(id))
    }
}

impl std::str::FromStr for IdFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
