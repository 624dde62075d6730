//! Declarative condition table.
//!
//! A condition is an experimental prompting strategy. Each one maps to an
//! ordered list of stages; every stage is one LLM call with its own template
//! and its own set of placeholder substitutions.
//!
//! ```text
//! x1      premise_generation → premise_decision → counterargument_generation
//! x2, x3  premise_decision(premise list) → counterargument_generation
//! x4, x7  counterargument_generation(topic, argument)
//! x5, x6  counterargument_generation(topic, argument, premise list)
//! ```
//!
//! Adding a condition is a data change: register another `ConditionSpec`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::prompts::keys;

/// Which markers a stage substitutes into its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Placeholders {
    pub topic: bool,
    pub argument: bool,
    pub premise_list: bool,
}

impl Placeholders {
    pub const NONE: Self = Self {
        topic: false,
        argument: false,
        premise_list: false,
    };
    pub const TOPIC_ARGUMENT: Self = Self {
        topic: true,
        argument: true,
        premise_list: false,
    };
    pub const ALL: Self = Self {
        topic: true,
        argument: true,
        premise_list: true,
    };
}

/// One LLM call in a generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Model enumerates the argument's premises itself.
    PremiseGeneration,
    /// Model chooses / weights premises to attack.
    PremiseDecision,
    /// Final call; its response is the counterargument.
    CounterargumentGeneration,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PremiseGeneration => "premise_generation",
            Self::PremiseDecision => "premise_decision",
            Self::CounterargumentGeneration => "counterargument_generation",
        }
    }

    /// Template key conventionally used for this stage.
    pub fn default_template_key(self) -> &'static str {
        match self {
            Self::PremiseGeneration => keys::PREMISE_GENERATION,
            Self::PremiseDecision => keys::PREMISE_DECISION,
            Self::CounterargumentGeneration => keys::COUNTERARGUMENT_GENERATION,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage descriptor: what to call it, which template to use, what to fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub stage: StageKind,
    /// Key inside the condition's prompt block. Defaults per stage kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_key: Option<String>,
    #[serde(default)]
    pub fill: Placeholders,
}

impl StageSpec {
    pub fn new(stage: StageKind, fill: Placeholders) -> Self {
        Self {
            stage,
            template_key: None,
            fill,
        }
    }

    pub fn template_key(&self) -> &str {
        self.template_key
            .as_deref()
            .unwrap_or_else(|| self.stage.default_template_key())
    }
}

/// Ordered stages for one condition id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub stages: Vec<StageSpec>,
}

impl ConditionSpec {
    pub fn new(stages: Vec<StageSpec>) -> Self {
        Self { stages }
    }

    /// Number of provider calls this condition issues.
    pub fn call_count(&self) -> usize {
        self.stages.len()
    }

    /// Whether the final stage is the counterargument stage and stages are non-empty.
    pub fn is_well_formed(&self) -> bool {
        matches!(
            self.stages.last(),
            Some(StageSpec {
                stage: StageKind::CounterargumentGeneration,
                ..
            })
        )
    }
}

/// Condition id → stage pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionTable {
    specs: BTreeMap<String, ConditionSpec>,
}

impl Default for ConditionTable {
    fn default() -> Self {
        use StageKind::*;

        let x1 = ConditionSpec::new(vec![
            StageSpec::new(PremiseGeneration, Placeholders::TOPIC_ARGUMENT),
            StageSpec::new(PremiseDecision, Placeholders::NONE),
            StageSpec::new(CounterargumentGeneration, Placeholders::NONE),
        ]);
        let premise_decision = ConditionSpec::new(vec![
            StageSpec::new(PremiseDecision, Placeholders::ALL),
            StageSpec::new(CounterargumentGeneration, Placeholders::NONE),
        ]);
        let direct = ConditionSpec::new(vec![StageSpec::new(
            CounterargumentGeneration,
            Placeholders::TOPIC_ARGUMENT,
        )]);
        let direct_with_premises = ConditionSpec::new(vec![StageSpec::new(
            CounterargumentGeneration,
            Placeholders::ALL,
        )]);

        let mut specs = BTreeMap::new();
        specs.insert("x1".to_string(), x1);
        specs.insert("x2".to_string(), premise_decision.clone());
        specs.insert("x3".to_string(), premise_decision);
        specs.insert("x4".to_string(), direct.clone());
        specs.insert("x5".to_string(), direct_with_premises.clone());
        specs.insert("x6".to_string(), direct_with_premises);
        specs.insert("x7".to_string(), direct);
        Self { specs }
    }
}

impl ConditionTable {
    pub fn empty() -> Self {
        Self {
            specs: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, id: impl Into<String>, spec: ConditionSpec) {
        self.specs.insert(id.into(), spec);
    }

    pub fn get(&self, id: &str) -> Option<&ConditionSpec> {
        self.specs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.specs.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Keep only the listed ids; unknown ids are returned for reporting.
    pub fn restrict_to<'a>(&mut self, enabled: &'a [String]) -> Vec<&'a str> {
        let unknown = enabled
            .iter()
            .filter(|id| !self.specs.contains_key(id.as_str()))
            .map(String::as_str)
            .collect();
        self.specs.retain(|id, _| enabled.iter().any(|e| e == id));
        unknown
    }
}
