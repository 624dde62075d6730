//! Argument evaluator: one analysis call, then one scoring call per criterion.
//!
//! ```text
//! analysis = send([system(template(topic, argument, counterarguments)),
//!                  user(analysis_user_prompt)])
//! for criterion in criteria:
//!     MultipleChoice → send([assistant(analysis), user(selection prompt)])
//!     Ranking        → send([assistant(analysis), user(ranking prompt)])
//!     Unknown        → "" (warn, no call)
//! ```
//!
//! Criterion failures are contained: the failed criterion keeps an empty
//! result with `error` set and the remaining criteria still run.

use experiment::{CriterionKind, EvaluationCriterion, EvaluationPrompts, EvaluationResult};
use tracing::{error, info, warn};

use crate::errors::EvaluationError;
use crate::providers::{ChatMessage, ModelClient, ProviderError, SamplingParams};

/// Everything the evaluator needs about one (item, model).
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub topic: &'a str,
    pub argument: &'a str,
    /// Pre-formatted numbered block, one line per condition.
    pub counterarguments: &'a str,
    pub criteria: &'a [EvaluationCriterion],
}

pub struct ArgumentEvaluator<'a> {
    prompts: &'a EvaluationPrompts,
}

impl<'a> ArgumentEvaluator<'a> {
    pub fn new(prompts: &'a EvaluationPrompts) -> Self {
        Self { prompts }
    }

    /// Stage 1: free-form analysis reused by every criterion.
    pub async fn analyze(
        &self,
        client: &dyn ModelClient,
        params: &SamplingParams,
        request: &EvaluationRequest<'_>,
    ) -> Result<String, ProviderError> {
        let system = self.prompts.system_prompt(
            request.topic,
            request.argument,
            request.counterarguments,
        );
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(self.prompts.analysis_user_prompt.clone()),
        ];
        client.send(&messages, params).await
    }

    fn criterion_prompt(&self, criterion: &EvaluationCriterion) -> Option<String> {
        match criterion.kind() {
            CriterionKind::MultipleChoice => Some(
                self.prompts
                    .selection_prompt(&criterion.name, &criterion.description),
            ),
            CriterionKind::Ranking => Some(
                self.prompts
                    .ranking_prompt(&criterion.name, &criterion.description),
            ),
            CriterionKind::Unknown => None,
        }
    }

    /// Stage 2 for a single criterion. Never fails; failures land in `error`.
    async fn score(
        &self,
        client: &dyn ModelClient,
        params: &SamplingParams,
        analysis: &str,
        criterion: &EvaluationCriterion,
    ) -> EvaluationResult {
        let mut result = EvaluationResult {
            id: criterion.id,
            name: criterion.name.clone(),
            result: String::new(),
            error: None,
        };

        let Some(prompt) = self.criterion_prompt(criterion) else {
            warn!(
                criterion_id = criterion.id,
                name = %criterion.name,
                "unknown evaluation type; leaving result empty"
            );
            return result;
        };

        let messages = [ChatMessage::assistant(analysis), ChatMessage::user(prompt)];
        match client.send(&messages, params).await {
            Ok(text) => {
                info!(criterion_id = criterion.id, "criterion scored");
                result.result = text;
            }
            Err(e) => {
                error!(criterion_id = criterion.id, error = %e, "criterion scoring failed");
                result.error = Some(e.to_string());
            }
        }
        result
    }

    /// Analysis followed by every criterion, results in `criteria` order.
    pub async fn evaluate(
        &self,
        client: &dyn ModelClient,
        params: &SamplingParams,
        request: &EvaluationRequest<'_>,
    ) -> Result<Vec<EvaluationResult>, EvaluationError> {
        if request.counterarguments.trim().is_empty() {
            return Err(EvaluationError::EmptyCounterarguments);
        }

        let analysis = self
            .analyze(client, params, request)
            .await
            .map_err(EvaluationError::Analysis)?;

        let mut results = Vec::with_capacity(request.criteria.len());
        for criterion in request.criteria {
            results.push(self.score(client, params, &analysis, criterion).await);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::providers::Role;

    /// Answers by inspecting the last user message; fails on request.
    struct RubricJudge {
        calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl ModelClient for RubricJudge {
        async fn send(
            &self,
            messages: &[ChatMessage],
            _params: &SamplingParams,
        ) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            let last = &messages[messages.len() - 1].content;
            if let Some(marker) = self.fail_on {
                if last.contains(marker) {
                    return Err(ProviderError::Status {
                        backend: "judge".into(),
                        status: 500,
                        body: "boom".into(),
                    });
                }
            }
            Ok(if last == "Analyze." {
                "ANALYSIS".to_string()
            } else {
                format!("scored: {last}")
            })
        }
    }

    fn prompts() -> EvaluationPrompts {
        EvaluationPrompts {
            system_prompt_template: "Topic {topic}\nArg {affirmative_argument}\n{counter_arguments}"
                .into(),
            analysis_user_prompt: "Analyze.".into(),
            selection_user_prompt_template: "MC {selection_criteria}: {criteria_description}"
                .into(),
            ranking_user_prompt_template: "RANK {ranking_criteria}: {criteria_description}".into(),
        }
    }

    fn criterion(id: u32, name: &str) -> EvaluationCriterion {
        EvaluationCriterion {
            id,
            name: name.into(),
            description: format!("desc{id}"),
        }
    }

    fn judge(fail_on: Option<&'static str>) -> (RubricJudge, Arc<Mutex<Vec<Vec<ChatMessage>>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            RubricJudge {
                calls: calls.clone(),
                fail_on,
            },
            calls,
        )
    }

    fn params() -> SamplingParams {
        SamplingParams::new("judge-model", 0.0, 1000)
    }

    #[tokio::test]
    async fn results_follow_criteria_order_across_kinds() {
        let criteria = vec![
            criterion(5, "(Ranking) Strength"),
            criterion(2, "(Multiple Choice) Best"),
            criterion(9, "(Ranking) Clarity"),
        ];
        let prompts = prompts();
        let (client, calls) = judge(None);
        let request = EvaluationRequest {
            topic: "T",
            argument: "A",
            counterarguments: "1. c1\n2. c2\n",
            criteria: &criteria,
        };

        let results = ArgumentEvaluator::new(&prompts)
            .evaluate(&client, &params(), &request)
            .await
            .unwrap();

        let ids: Vec<u32> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 2, 9]);
        assert_eq!(results[0].result, "scored: RANK (Ranking) Strength: desc5");
        assert_eq!(results[1].result, "scored: MC (Multiple Choice) Best: desc2");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0][0].role, Role::System);
        assert_eq!(calls[0][0].content, "Topic T\nArg A\n1. c1\n2. c2\n");
        for call in &calls[1..] {
            assert_eq!(call[0], ChatMessage::assistant("ANALYSIS"));
            assert_eq!(call.len(), 2);
        }
    }

    #[tokio::test]
    async fn unknown_kind_yields_empty_result_without_call() {
        let criteria = vec![criterion(1, "Tone"), criterion(2, "(Ranking) R")];
        let prompts = prompts();
        let (client, calls) = judge(None);
        let request = EvaluationRequest {
            topic: "T",
            argument: "A",
            counterarguments: "1. c\n",
            criteria: &criteria,
        };

        let results = ArgumentEvaluator::new(&prompts)
            .evaluate(&client, &params(), &request)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].result, "");
        assert!(results[0].error.is_none());
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn one_failing_criterion_does_not_stop_the_rest() {
        let criteria = vec![
            criterion(1, "(Multiple Choice) A"),
            criterion(2, "(Ranking) B"),
            criterion(3, "(Multiple Choice) C"),
        ];
        let prompts = prompts();
        let (client, _) = judge(Some("RANK"));
        let request = EvaluationRequest {
            topic: "T",
            argument: "A",
            counterarguments: "1. c\n",
            criteria: &criteria,
        };

        let results = ArgumentEvaluator::new(&prompts)
            .evaluate(&client, &params(), &request)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[1].error.as_deref().unwrap().contains("boom"));
        assert_eq!(results[1].result, "");
        assert_eq!(results[2].result, "scored: MC (Multiple Choice) C: desc3");
    }

    #[tokio::test]
    async fn analysis_failure_fails_the_evaluation() {
        let criteria = vec![criterion(1, "(Multiple Choice) A")];
        let prompts = prompts();
        let (client, calls) = judge(Some("Analyze."));
        let request = EvaluationRequest {
            topic: "T",
            argument: "A",
            counterarguments: "1. c\n",
            criteria: &criteria,
        };

        let err = ArgumentEvaluator::new(&prompts)
            .evaluate(&client, &params(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Analysis(_)));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_block_is_skipped() {
        let prompts = prompts();
        let (client, calls) = judge(None);
        let request = EvaluationRequest {
            topic: "T",
            argument: "A",
            counterarguments: "  \n",
            criteria: &[],
        };
        let err = ArgumentEvaluator::new(&prompts)
            .evaluate(&client, &params(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::EmptyCounterarguments));
        assert!(calls.lock().unwrap().is_empty());
    }
}
