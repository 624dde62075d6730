//! Counterargument generator. Runs one condition's stage pipeline.
//!
//! ```text
//! transcript = [system]
//! for stage in table[condition]:
//!     transcript += user(render(stage.template, stage.fill))
//!     reply = client.send(transcript)
//!     transcript += assistant(reply)
//! counterargument = reply of the last stage
//! ```
//!
//! Templates for every stage are resolved before the first call, so a
//! missing template never costs a provider request.

use experiment::{
    fill_template, format_premise_list, ConditionTable, CounterargumentResult, PromptStore,
    StageSpec, StageTrace, TemplateValues,
};
use tracing::debug;

use crate::errors::GenerationError;
use crate::providers::{ModelClient, SamplingParams};
use crate::transcript::Transcript;

/// Topic + argument pair a generation works on.
#[derive(Debug, Clone, Copy)]
pub struct DebateInput<'a> {
    pub topic: &'a str,
    pub argument: &'a str,
}

pub struct CounterargumentGenerator<'a> {
    prompts: &'a PromptStore,
    table: &'a ConditionTable,
    record_steps: bool,
}

impl<'a> CounterargumentGenerator<'a> {
    pub fn new(prompts: &'a PromptStore, table: &'a ConditionTable) -> Self {
        Self {
            prompts,
            table,
            record_steps: true,
        }
    }

    /// Keep (default) or drop the per-stage trace in results.
    pub fn record_steps(mut self, enabled: bool) -> Self {
        self.record_steps = enabled;
        self
    }

    fn resolve_templates(
        &self,
        condition: &str,
    ) -> Result<Vec<(&'a StageSpec, &'a str)>, GenerationError> {
        let spec = self
            .table
            .get(condition)
            .ok_or_else(|| GenerationError::InvalidCondition(condition.to_string()))?;

        spec.stages
            .iter()
            .map(|stage| {
                self.prompts
                    .template(condition, stage.template_key())
                    .map(|template| (stage, template))
                    .ok_or_else(|| GenerationError::MissingTemplate {
                        condition: condition.to_string(),
                        key: stage.template_key().to_string(),
                    })
            })
            .collect()
    }

    /// Run every stage of `condition` against `client`.
    pub async fn generate(
        &self,
        client: &dyn ModelClient,
        params: &SamplingParams,
        input: DebateInput<'_>,
        condition: &str,
    ) -> Result<CounterargumentResult, GenerationError> {
        let stages = self.resolve_templates(condition)?;

        let premise_list = format_premise_list(input.argument);
        let values = TemplateValues {
            topic: input.topic,
            argument: input.argument,
            premise_list: &premise_list,
        };

        let mut transcript = Transcript::with_system(self.prompts.system_prompt());
        let mut steps = Vec::with_capacity(stages.len());
        let mut last_output = String::new();

        for (stage, template) in stages {
            let prompt = fill_template(template, stage.fill, &values);
            transcript.push_user(prompt.clone());

            debug!(
                condition,
                stage = %stage.stage,
                turns = transcript.messages().len(),
                "sending stage prompt"
            );
            let output = client.send(transcript.messages(), params).await?;

            transcript.push_assistant(output.clone());
            steps.push(StageTrace {
                step: stage.stage.as_str().to_string(),
                input: prompt,
                output: output.clone(),
            });
            last_output = output;
        }

        Ok(CounterargumentResult {
            counterargument: last_output,
            steps: self.record_steps.then_some(steps),
        })
    }
}
