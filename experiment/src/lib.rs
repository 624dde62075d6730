//! Deterministic core of the counterargument experiments.
//!
//! Nothing in this crate talks to a model provider. It owns:
//! - input items and ID filtering
//! - the prompt store and placeholder substitution
//! - the declarative condition → stage table
//! - premise splitting
//! - the evaluation rubric
//! - result records and the output file
//!
//! The async runner in `counterpoint` drives these against LLM backends.

pub mod condition;
pub mod error;
pub mod input;
pub mod premise;
pub mod prompts;
pub mod results;
pub mod rubric;

pub use condition::{ConditionSpec, ConditionTable, Placeholders, StageKind, StageSpec};
pub use error::{ConfigError, ConfigResult};
pub use input::{load_input_items, parse_input_items, IdFilter, InputItem};
pub use premise::{format_premise_list, split_premises};
pub use prompts::{fill_template, EvaluationPrompts, PromptStore, TemplateValues};
pub use results::{
    format_counterarguments, load_results, write_results, ConditionResults,
    CounterargumentResult, EvaluationResult, ItemResult, StageTrace,
};
pub use rubric::{CriterionKind, EvaluationCriterion, MissingCriteria, Rubric};
