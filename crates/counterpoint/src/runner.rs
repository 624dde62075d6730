//! Experiment orchestration: items → models → conditions, then evaluation.
//!
//! ## Loop
//!
//! ```text
//! for item in items (input order, id filter applied):
//!     for model in plan.models:
//!         for condition in plan.conditions:
//!             generate → counterarguments[model][condition]   (failures skipped)
//!         if evaluating and any counterargument exists:
//!             evaluate → evaluation_results[model]
//! ```
//!
//! Everything stays in memory; the caller writes the output file once.
//! Unit failures are logged and counted in [`RunStats`], never propagated.
//! Only configuration problems (unknown model alias, missing evaluation
//! data) abort the run, and they are detected before the first call.

use experiment::{
    format_counterarguments, ConditionResults, ConditionTable, ConfigError, ConfigResult,
    EvaluationCriterion, EvaluationPrompts, EvaluationResult, IdFilter, InputItem, ItemResult,
    PromptStore, Rubric,
};
use indexmap::IndexMap;
use tracing::{error, info, warn};

use crate::errors::EvaluationError;
use crate::evaluator::{ArgumentEvaluator, EvaluationRequest};
use crate::generator::{CounterargumentGenerator, DebateInput};
use crate::providers::{ClientRegistry, ResolvedModel};

// ── Plans ────────────────────────────────────────────────────────────────────

/// What to generate.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub models: Vec<String>,
    pub conditions: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub id_filter: Option<IdFilter>,
    /// Keep the per-stage trace in each result.
    pub record_steps: bool,
}

/// How to evaluate.
#[derive(Debug, Clone)]
pub struct EvaluationPlan {
    /// Alias of the judging model.
    pub model: String,
    pub criteria_ids: Vec<u32>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Rubric plus evaluation prompt templates.
#[derive(Debug, Clone)]
pub struct EvaluationSuite {
    pub rubric: Rubric,
    pub prompts: EvaluationPrompts,
}

// ── Stats ────────────────────────────────────────────────────────────────────

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub items: usize,
    pub items_filtered: usize,
    pub generated: usize,
    pub generation_failed: usize,
    pub generation_skipped: usize,
    pub evaluations_completed: usize,
    pub evaluations_failed: usize,
    pub evaluations_skipped: usize,
    /// Criteria whose scoring call failed inside otherwise completed evaluations.
    pub criteria_failed: usize,
}

impl RunStats {
    pub fn log_summary(&self) {
        info!(
            items = self.items,
            items_filtered = self.items_filtered,
            generated = self.generated,
            generation_failed = self.generation_failed,
            generation_skipped = self.generation_skipped,
            evaluations_completed = self.evaluations_completed,
            evaluations_failed = self.evaluations_failed,
            evaluations_skipped = self.evaluations_skipped,
            criteria_failed = self.criteria_failed,
            "run complete"
        );
    }
}

/// Results plus the counters that describe how they were produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub results: Vec<ItemResult>,
    pub stats: RunStats,
}

// ── Runner ───────────────────────────────────────────────────────────────────

pub struct ExperimentRunner {
    registry: ClientRegistry,
    prompts: PromptStore,
    table: ConditionTable,
    evaluation: Option<EvaluationSuite>,
}

impl ExperimentRunner {
    pub fn new(registry: ClientRegistry, prompts: PromptStore, table: ConditionTable) -> Self {
        Self {
            registry,
            prompts,
            table,
            evaluation: None,
        }
    }

    pub fn with_evaluation(mut self, suite: EvaluationSuite) -> Self {
        self.evaluation = Some(suite);
        self
    }

    fn resolve_all(&self, aliases: &[String]) -> ConfigResult<Vec<&ResolvedModel>> {
        aliases.iter().map(|alias| self.registry.resolve(alias)).collect()
    }

    fn suite(&self) -> ConfigResult<&EvaluationSuite> {
        self.evaluation.as_ref().ok_or_else(|| {
            ConfigError::InvalidConfig("evaluation requested without rubric and prompts".into())
        })
    }

    /// Generate for every item, optionally evaluating each model's output.
    pub async fn run(
        &self,
        items: &[InputItem],
        plan: &GenerationPlan,
        evaluation: Option<&EvaluationPlan>,
    ) -> ConfigResult<RunOutcome> {
        let models = self.resolve_all(&plan.models)?;
        let judge = match evaluation {
            Some(eval) => Some((self.suite()?, self.registry.resolve(&eval.model)?, eval)),
            None => None,
        };

        let generator =
            CounterargumentGenerator::new(&self.prompts, &self.table).record_steps(plan.record_steps);
        let mut stats = RunStats {
            items: items.len(),
            ..RunStats::default()
        };
        let mut results = Vec::new();

        for item in items {
            if let Some(filter) = &plan.id_filter {
                if !filter.accepts(item) {
                    stats.items_filtered += 1;
                    continue;
                }
            }
            info!(item_id = ?item.id, topic = %item.topic, "processing item");

            let mut record = ItemResult::for_item(item);
            if judge.is_some() {
                record.begin_evaluation();
            }
            let input = DebateInput {
                topic: &item.topic,
                argument: &item.argument,
            };

            for model in &models {
                let params = model.params(plan.temperature, plan.max_tokens);
                let mut collected = ConditionResults::new();

                for condition in &plan.conditions {
                    match generator
                        .generate(model.client.as_ref(), &params, input, condition)
                        .await
                    {
                        Ok(result) => {
                            info!(item_id = ?item.id, model = %model.alias, condition = %condition, "counterargument generated");
                            collected.insert(condition.clone(), result);
                            stats.generated += 1;
                        }
                        Err(e) if e.is_skip() => {
                            warn!(item_id = ?item.id, model = %model.alias, condition = %condition, error = %e, "skipping condition");
                            stats.generation_skipped += 1;
                        }
                        Err(e) => {
                            error!(item_id = ?item.id, model = %model.alias, condition = %condition, error = %e, "generation failed");
                            stats.generation_failed += 1;
                        }
                    }
                }

                if let Some((suite, judge_model, eval)) = &judge {
                    let outcome = match suite.rubric.select(&eval.criteria_ids) {
                        Ok(criteria) => {
                            self.evaluate_unit(suite, judge_model, eval, &record, &collected, &criteria)
                                .await
                        }
                        Err(missing) => Err(EvaluationError::from(missing)),
                    };
                    if let Some(scores) = tally(&mut stats, outcome, item.id, &model.alias) {
                        record.begin_evaluation().insert(model.alias.clone(), scores);
                    }
                }

                record.counterarguments.insert(model.alias.clone(), collected);
            }

            results.push(record);
        }

        stats.log_summary();
        Ok(RunOutcome { results, stats })
    }

    /// Evaluate a previously generated result set in place.
    ///
    /// Criteria are matched leniently against the rubric, but if none of the
    /// requested ids exist the whole pass is rejected. Any earlier
    /// `evaluation_results` are replaced.
    pub async fn evaluate_existing(
        &self,
        results: &mut [ItemResult],
        plan: &EvaluationPlan,
    ) -> ConfigResult<RunStats> {
        let suite = self.suite()?;
        let judge_model = self.registry.resolve(&plan.model)?;
        let criteria = suite.rubric.matching(&plan.criteria_ids);
        if criteria.is_empty() {
            return Err(ConfigError::NoMatchingCriteria(plan.criteria_ids.clone()));
        }
        info!(
            model = %judge_model.alias,
            criteria = criteria.len(),
            items = results.len(),
            "evaluating existing results"
        );

        let mut stats = RunStats {
            items: results.len(),
            ..RunStats::default()
        };

        for record in results.iter_mut() {
            record.evaluation_results = None;
            let mut scored = IndexMap::new();

            for (model, collected) in &record.counterarguments {
                let outcome = self
                    .evaluate_unit(suite, judge_model, plan, record, collected, &criteria)
                    .await;
                if let Some(scores) = tally(&mut stats, outcome, record.id, model) {
                    scored.insert(model.clone(), scores);
                }
            }

            *record.begin_evaluation() = scored;
        }

        stats.log_summary();
        Ok(stats)
    }

    async fn evaluate_unit(
        &self,
        suite: &EvaluationSuite,
        judge_model: &ResolvedModel,
        plan: &EvaluationPlan,
        record: &ItemResult,
        collected: &ConditionResults,
        criteria: &[EvaluationCriterion],
    ) -> Result<Vec<EvaluationResult>, EvaluationError> {
        let block = format_counterarguments(collected);
        let request = EvaluationRequest {
            topic: &record.topic,
            argument: &record.affirmative_argument,
            counterarguments: &block,
            criteria,
        };
        let params = judge_model.params(plan.temperature, plan.max_tokens);
        ArgumentEvaluator::new(&suite.prompts)
            .evaluate(judge_model.client.as_ref(), &params, &request)
            .await
    }
}

/// Log one evaluation outcome, update counters, and hand back scores to keep.
fn tally(
    stats: &mut RunStats,
    outcome: Result<Vec<EvaluationResult>, EvaluationError>,
    item_id: Option<u64>,
    model: &str,
) -> Option<Vec<EvaluationResult>> {
    match outcome {
        Ok(scores) => {
            let failed = scores.iter().filter(|s| s.error.is_some()).count();
            stats.criteria_failed += failed;
            stats.evaluations_completed += 1;
            info!(item_id = ?item_id, model, criteria = scores.len(), failed, "evaluation complete");
            Some(scores)
        }
        Err(e) if e.is_skip() => {
            warn!(item_id = ?item_id, model, error = %e, "skipping evaluation");
            stats.evaluations_skipped += 1;
            None
        }
        Err(e) => {
            error!(item_id = ?item_id, model, error = %e, "evaluation failed");
            stats.evaluations_failed += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use experiment::prompts::keys;

    use super::*;
    use crate::providers::{ChatMessage, ModelClient, ProviderError, SamplingParams};

    /// Echoes the model id and call number; fails when the prompt contains "FAIL".
    struct Echo {
        calls: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl ModelClient for Echo {
        async fn send(
            &self,
            messages: &[ChatMessage],
            params: &SamplingParams,
        ) -> Result<String, ProviderError> {
            let mut n = self.calls.lock().unwrap();
            *n += 1;
            if messages.iter().any(|m| m.content.contains("FAIL")) {
                return Err(ProviderError::Status {
                    backend: "echo".into(),
                    status: 500,
                    body: "refused".into(),
                });
            }
            Ok(format!("{}#{}", params.model, *n))
        }
    }

    fn runner(calls: Arc<Mutex<usize>>) -> ExperimentRunner {
        let mut registry = ClientRegistry::new();
        registry.insert("alpha", "alpha-v1", Arc::new(Echo { calls: calls.clone() }));
        registry.insert("judge", "judge-v1", Arc::new(Echo { calls }));
        let prompts = PromptStore::new("sys")
            .with_template("x4", keys::COUNTERARGUMENT_GENERATION, "refute #argument#")
            .with_template("x7", keys::COUNTERARGUMENT_GENERATION, "FAIL #topic#");
        ExperimentRunner::new(registry, prompts, ConditionTable::default())
    }

    fn items() -> Vec<InputItem> {
        vec![
            InputItem {
                id: Some(1),
                topic: "T1".into(),
                argument: "A. B.".into(),
            },
            InputItem {
                id: Some(2),
                topic: "T2".into(),
                argument: "C.".into(),
            },
        ]
    }

    fn plan(conditions: &[&str]) -> GenerationPlan {
        GenerationPlan {
            models: vec!["alpha".into()],
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
            temperature: 0.7,
            max_tokens: 64,
            id_filter: None,
            record_steps: false,
        }
    }

    fn suite() -> EvaluationSuite {
        EvaluationSuite {
            rubric: Rubric::from_json(
                r#"{"evaluation_criteria":[
                    {"id":1,"name":"(Multiple Choice) Best","description":"d1"},
                    {"id":2,"name":"(Ranking) Order","description":"d2"}]}"#,
                std::path::Path::new("rubric.json"),
            )
            .unwrap(),
            prompts: EvaluationPrompts {
                system_prompt_template: "{topic}|{counter_arguments}".into(),
                analysis_user_prompt: "analyze".into(),
                selection_user_prompt_template: "pick {selection_criteria}".into(),
                ranking_user_prompt_template: "rank {ranking_criteria}".into(),
            },
        }
    }

    fn eval_plan(ids: &[u32]) -> EvaluationPlan {
        EvaluationPlan {
            model: "judge".into(),
            criteria_ids: ids.to_vec(),
            temperature: 0.0,
            max_tokens: 128,
        }
    }

    #[tokio::test]
    async fn unknown_and_failing_conditions_do_not_abort_siblings() {
        let calls = Arc::new(Mutex::new(0));
        let outcome = runner(calls)
            .run(&items(), &plan(&["x99", "x7", "x4"]), None)
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 2);
        let alpha = &outcome.results[0].counterarguments["alpha"];
        assert_eq!(alpha.keys().collect::<Vec<_>>(), vec!["x4"]);
        assert!(outcome.results[0].evaluation_results.is_none());
        assert_eq!(outcome.stats.generated, 2);
        assert_eq!(outcome.stats.generation_skipped, 2);
        assert_eq!(outcome.stats.generation_failed, 2);
    }

    #[tokio::test]
    async fn id_filter_drops_items() {
        let calls = Arc::new(Mutex::new(0));
        let mut plan = plan(&["x4"]);
        plan.id_filter = Some(IdFilter::parse("2").unwrap());
        let outcome = runner(calls.clone()).run(&items(), &plan, None).await.unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].id, Some(2));
        assert_eq!(outcome.stats.items_filtered, 1);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_model_is_fatal_before_any_call() {
        let calls = Arc::new(Mutex::new(0));
        let mut plan = plan(&["x4"]);
        plan.models.push("ghost".into());
        let err = runner(calls.clone()).run(&items(), &plan, None).await.unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModel(ref m) if m == "ghost"));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn run_with_evaluation_scores_each_model() {
        let calls = Arc::new(Mutex::new(0));
        let outcome = runner(calls)
            .with_evaluation(suite())
            .run(&items()[..1], &plan(&["x4"]), Some(&eval_plan(&[2, 1])))
            .await
            .unwrap();

        let evals = outcome.results[0].evaluation_results.as_ref().unwrap();
        let ids: Vec<u32> = evals["alpha"].iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(outcome.stats.evaluations_completed, 1);
    }

    #[tokio::test]
    async fn models_keep_plan_order_and_their_own_clients() {
        let beta_calls = Arc::new(Mutex::new(0));
        let alpha_calls = Arc::new(Mutex::new(0));
        let judge_calls = Arc::new(Mutex::new(0));
        let mut registry = ClientRegistry::new();
        registry.insert("beta", "beta-v1", Arc::new(Echo { calls: beta_calls.clone() }));
        registry.insert("alpha", "alpha-v1", Arc::new(Echo { calls: alpha_calls.clone() }));
        registry.insert("judge", "judge-v1", Arc::new(Echo { calls: judge_calls.clone() }));
        let prompts = PromptStore::new("sys")
            .with_template("x4", keys::COUNTERARGUMENT_GENERATION, "refute #argument#");
        let runner = ExperimentRunner::new(registry, prompts, ConditionTable::default())
            .with_evaluation(suite());

        let mut plan = plan(&["x4"]);
        plan.models = vec!["beta".into(), "alpha".into()];
        let outcome = runner
            .run(&items(), &plan, Some(&eval_plan(&[1, 2])))
            .await
            .unwrap();

        for result in &outcome.results {
            let models: Vec<&String> = result.counterarguments.keys().collect();
            assert_eq!(models, vec!["beta", "alpha"]);
            assert!(result.counterarguments["beta"]["x4"]
                .counterargument
                .starts_with("beta-v1#"));
            assert!(result.counterarguments["alpha"]["x4"]
                .counterargument
                .starts_with("alpha-v1#"));

            let evals = result.evaluation_results.as_ref().unwrap();
            assert_eq!(evals.keys().collect::<Vec<_>>(), vec!["beta", "alpha"]);
            assert!(evals.values().all(|scores| scores.len() == 2));
        }
        // one x4 call per item for each generation model
        assert_eq!(*beta_calls.lock().unwrap(), 2);
        assert_eq!(*alpha_calls.lock().unwrap(), 2);
        // analysis + two criteria, per (item, model)
        assert_eq!(*judge_calls.lock().unwrap(), 12);
        assert_eq!(outcome.stats.generated, 4);
        assert_eq!(outcome.stats.evaluations_completed, 4);
    }

    #[tokio::test]
    async fn strict_criteria_skip_unit_evaluation() {
        let calls = Arc::new(Mutex::new(0));
        let outcome = runner(calls)
            .with_evaluation(suite())
            .run(&items()[..1], &plan(&["x4"]), Some(&eval_plan(&[1, 9])))
            .await
            .unwrap();

        let evals = outcome.results[0].evaluation_results.as_ref().unwrap();
        assert!(evals.is_empty());
        assert_eq!(outcome.stats.evaluations_skipped, 1);
        assert_eq!(outcome.results[0].counterarguments["alpha"].len(), 1);
    }

    #[tokio::test]
    async fn empty_model_output_skips_evaluation() {
        let calls = Arc::new(Mutex::new(0));
        let outcome = runner(calls)
            .with_evaluation(suite())
            .run(&items()[..1], &plan(&["x7"]), Some(&eval_plan(&[1])))
            .await
            .unwrap();
        assert_eq!(outcome.stats.evaluations_skipped, 1);
        assert!(outcome.results[0].counterarguments["alpha"].is_empty());
    }

    #[tokio::test]
    async fn evaluate_existing_replaces_previous_block() {
        let calls = Arc::new(Mutex::new(0));
        let runner = runner(calls).with_evaluation(suite());
        let mut results = runner
            .run(&items(), &plan(&["x4"]), None)
            .await
            .unwrap()
            .results;
        results[0]
            .begin_evaluation()
            .insert("stale".into(), Vec::new());

        let stats = runner
            .evaluate_existing(&mut results, &eval_plan(&[2, 42]))
            .await
            .unwrap();

        assert_eq!(stats.evaluations_completed, 2);
        let evals = results[0].evaluation_results.as_ref().unwrap();
        assert!(!evals.contains_key("stale"));
        assert_eq!(evals["alpha"].len(), 1);
        assert_eq!(evals["alpha"][0].id, 2);
    }

    #[tokio::test]
    async fn evaluate_existing_rejects_when_nothing_matches() {
        let calls = Arc::new(Mutex::new(0));
        let runner = runner(calls).with_evaluation(suite());
        let mut results = Vec::new();
        let err = runner
            .evaluate_existing(&mut results, &eval_plan(&[7, 8]))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoMatchingCriteria(ref ids) if ids == &vec![7, 8]));
    }

    #[tokio::test]
    async fn evaluation_without_suite_is_config_error() {
        let calls = Arc::new(Mutex::new(0));
        let err = runner(calls)
            .run(&items(), &plan(&["x4"]), Some(&eval_plan(&[1])))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(_)));
    }
}
