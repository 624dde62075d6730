//! Subcommand wiring: load files, build the runner, write the output once.

use std::path::Path;

use anyhow::{Context, Result};
use experiment::{
    load_input_items, load_results, write_results, EvaluationPrompts, PromptStore, Rubric,
};
use tracing::info;

use crate::cli::{Cli, Command, CriteriaArgs, GenerationArgs, SamplingArgs};
use crate::config::{AppConfig, PathsConfig};
use crate::providers::{ClientRegistry, Credentials};
use crate::runner::{EvaluationPlan, EvaluationSuite, ExperimentRunner, GenerationPlan, RunStats};

/// Resolve configuration and credentials, then run the chosen subcommand.
pub async fn execute(cli: Cli) -> Result<RunStats> {
    let config = AppConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_paths(cli.prompts, cli.rubric, cli.evaluation_prompts);
    config.validate().context("invalid configuration")?;
    config.check_models(cli.command.model_aliases())?;

    let credentials = Credentials::from_env(&config.providers);
    let registry = ClientRegistry::from_config(&config, &credentials)?;
    dispatch(cli.command, &config, registry).await
}

/// Run a subcommand against an already-built client registry.
pub async fn dispatch(
    command: Command,
    config: &AppConfig,
    registry: ClientRegistry,
) -> Result<RunStats> {
    match command {
        Command::Generate {
            generation,
            sampling,
            output,
        } => {
            let items = load_input_items(&generation.input)?;
            let runner = ExperimentRunner::new(
                registry,
                PromptStore::load(&config.paths.prompts)?,
                config.condition_table(),
            );
            let outcome = runner
                .run(&items, &generation_plan(generation, sampling), None)
                .await?;
            finish(&output, &outcome.results)?;
            Ok(outcome.stats)
        }

        Command::Evaluate {
            input,
            criteria,
            sampling,
            output,
        } => {
            let mut results = load_results(&input)?;
            info!(path = %input.display(), items = results.len(), "loaded generated counterarguments");
            let runner = ExperimentRunner::new(
                registry,
                PromptStore::default(),
                config.condition_table(),
            )
            .with_evaluation(load_suite(&config.paths)?);
            let stats = runner
                .evaluate_existing(&mut results, &evaluation_plan(criteria, sampling))
                .await?;
            finish(&output, &results)?;
            Ok(stats)
        }

        Command::Run {
            generation,
            criteria,
            sampling,
            output,
        } => {
            let items = load_input_items(&generation.input)?;
            let runner = ExperimentRunner::new(
                registry,
                PromptStore::load(&config.paths.prompts)?,
                config.condition_table(),
            )
            .with_evaluation(load_suite(&config.paths)?);
            let eval = evaluation_plan(criteria, sampling);
            let outcome = runner
                .run(&items, &generation_plan(generation, sampling), Some(&eval))
                .await?;
            finish(&output, &outcome.results)?;
            Ok(outcome.stats)
        }
    }
}

fn load_suite(paths: &PathsConfig) -> Result<EvaluationSuite> {
    Ok(EvaluationSuite {
        rubric: Rubric::load(&paths.rubric)?,
        prompts: EvaluationPrompts::load(&paths.evaluation_prompts)?,
    })
}

fn generation_plan(args: GenerationArgs, sampling: SamplingArgs) -> GenerationPlan {
    GenerationPlan {
        models: args.models,
        conditions: args.conditions,
        temperature: sampling.temperature,
        max_tokens: sampling.max_tokens,
        id_filter: args.id_range,
        record_steps: !args.no_steps,
    }
}

fn evaluation_plan(args: CriteriaArgs, sampling: SamplingArgs) -> EvaluationPlan {
    EvaluationPlan {
        model: args.evaluation_model,
        criteria_ids: args.criteria_ids,
        temperature: sampling.temperature,
        max_tokens: sampling.max_tokens,
    }
}

fn finish(output: &Path, results: &[experiment::ItemResult]) -> Result<()> {
    write_results(output, results)
        .with_context(|| format!("failed to write results to {}", output.display()))
}
