//! Command-line surface of the `counterpoint` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use experiment::IdFilter;

use crate::config::DEFAULT_EVALUATION_MODEL;

/// Generate and evaluate debate counterarguments with LLMs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML config file (providers, model aliases, enabled conditions, paths).
    /// Falls back to COUNTERPOINT_CONFIG, then built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Prompt templates file (overrides config and COUNTERPOINT_PROMPTS)
    #[arg(long, global = true)]
    pub prompts: Option<PathBuf>,

    /// Evaluation criteria file (overrides config and COUNTERPOINT_RUBRIC)
    #[arg(long, global = true)]
    pub rubric: Option<PathBuf>,

    /// Evaluation prompt templates (overrides config and COUNTERPOINT_EVAL_PROMPTS)
    #[arg(long, global = true)]
    pub evaluation_prompts: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate counterarguments only
    Generate {
        #[command(flatten)]
        generation: GenerationArgs,
        #[command(flatten)]
        sampling: SamplingArgs,
        /// Path to output JSON file
        #[arg(long, default_value = "generated_counterarguments.json")]
        output: PathBuf,
    },
    /// Evaluate a previously generated counterarguments file
    Evaluate {
        /// Path to generated counterarguments JSON file
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        criteria: CriteriaArgs,
        #[command(flatten)]
        sampling: SamplingArgs,
        /// Path to output JSON file
        #[arg(long, default_value = "evaluation_results.json")]
        output: PathBuf,
    },
    /// Generate and evaluate in one pass
    Run {
        #[command(flatten)]
        generation: GenerationArgs,
        #[command(flatten)]
        criteria: CriteriaArgs,
        #[command(flatten)]
        sampling: SamplingArgs,
        /// Path to output JSON file
        #[arg(long, default_value = "output.json")]
        output: PathBuf,
    },
}

impl Command {
    /// Every model alias this command will call.
    pub fn model_aliases(&self) -> Vec<&String> {
        match self {
            Self::Generate { generation, .. } => generation.models.iter().collect(),
            Self::Evaluate { criteria, .. } => vec![&criteria.evaluation_model],
            Self::Run {
                generation,
                criteria,
                ..
            } => generation
                .models
                .iter()
                .chain(std::iter::once(&criteria.evaluation_model))
                .collect(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerationArgs {
    /// Model aliases to generate with
    #[arg(long, num_args = 1.., required = true)]
    pub models: Vec<String>,

    /// Conditions to run (x1 .. x7, or any configured id)
    #[arg(long, num_args = 1.., required = true)]
    pub conditions: Vec<String>,

    /// Path to input JSON file
    #[arg(long)]
    pub input: PathBuf,

    /// ID range to process (e.g. '1-3' or '2,4,6')
    #[arg(long)]
    pub id_range: Option<IdFilter>,

    /// Omit the per-stage prompt/response trace from the output
    #[arg(long, default_value_t = false)]
    pub no_steps: bool,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct SamplingArgs {
    /// Sampling temperature
    #[arg(long)]
    pub temperature: f32,

    /// Max tokens per response
    #[arg(long)]
    pub max_tokens: u32,
}

#[derive(Args, Debug, Clone)]
pub struct CriteriaArgs {
    /// Model alias used for evaluation
    #[arg(long, default_value = DEFAULT_EVALUATION_MODEL)]
    pub evaluation_model: String,

    /// IDs of evaluation criteria to use
    #[arg(long, num_args = 1.., required = true)]
    pub criteria_ids: Vec<u32>,
}
