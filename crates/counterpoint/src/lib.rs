//! Counterpoint: LLM-backed counterargument experiments.
//!
//! This library provides:
//! - OpenAI-compatible chat/completion adapters behind the [`ModelClient`] trait
//! - A counterargument generator that runs one condition's 1–3 stage prompt pipeline
//! - A rubric evaluator (one analysis call, then one call per criterion)
//! - The sequential runner that walks items → models → conditions
//!
//! # Subcommands
//!
//! - `generate`: counterarguments only
//! - `evaluate`: score an existing generated file
//! - `run`: generate and evaluate in one pass
//!
//! Deterministic pieces (prompt store, condition table, rubric, result
//! records) live in the `experiment` crate.

pub mod app;
pub mod cli;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod generator;
pub mod providers;
pub mod runner;
pub mod transcript;

pub use config::AppConfig;
pub use errors::{EvaluationError, GenerationError};
pub use evaluator::{ArgumentEvaluator, EvaluationRequest};
pub use generator::{CounterargumentGenerator, DebateInput};
pub use providers::{
    ChatMessage, ClientRegistry, ClientType, Credentials, ModelClient, OpenAiCompatClient,
    ProviderError, Role, SamplingParams,
};
pub use runner::{
    EvaluationPlan, EvaluationSuite, ExperimentRunner, GenerationPlan, RunOutcome, RunStats,
};
