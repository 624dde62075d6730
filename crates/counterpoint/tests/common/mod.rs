//! Shared fixtures for counterpoint integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use counterpoint::{ChatMessage, ModelClient, ProviderError, SamplingParams};

/// Replays canned replies in order and records every transcript it was sent.
/// Once the script runs out it answers with `fallback`.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: String,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedClient {
    pub fn new(fallback: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_replies<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new("unscripted");
        {
            let mut queue = client.replies.lock().unwrap();
            queue.extend(replies.into_iter().map(|r| Ok(r.into())));
        }
        client
    }

    pub fn push_error(&self, err: ProviderError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn send(
        &self,
        messages: &[ChatMessage],
        _params: &SamplingParams,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

pub const PROMPTS_JSON: &str = r#"{
    "system_prompt": "You argue the negative side of debates.",
    "x1": {
        "premise_generation_prompt": "List the premises of: #argument# (topic: #topic#)",
        "premise_decision_prompt": "Which premise is weakest?",
        "counter-argument_generation_prompt": "Write the counterargument."
    },
    "x4": {
        "counter-argument_generation_prompt": "Counter this argument on #topic#: #argument#"
    },
    "x5": {
        "counter-argument_generation_prompt": "Topic: #topic#\nPremises:\n###premise_list###"
    },
    "notes": "free text entries are ignored"
}"#;

pub const RUBRIC_JSON: &str = r#"{
    "evaluation_criteria": [
        {"id": 1, "name": "(Multiple Choice) Most convincing", "description": "Pick the strongest counterargument."},
        {"id": 2, "name": "(Ranking) Relevance", "description": "Rank by relevance to the topic."},
        {"id": 3, "name": "Free commentary", "description": "Anything else."}
    ]
}"#;

pub const EVAL_PROMPTS_JSON: &str = r#"{
    "system_prompt_template": "Topic: {topic}\nArgument: {affirmative_argument}\nCounterarguments:\n{counter_arguments}",
    "analysis_user_prompt": "Analyze each counterargument.",
    "selection_user_prompt_template": "Criterion {selection_criteria}: {criteria_description}",
    "ranking_user_prompt_template": "Rank by {ranking_criteria}: {criteria_description}"
}"#;

/// Data files laid out in a temp dir, as the binary would find them.
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("prompts.json"), PROMPTS_JSON).unwrap();
        std::fs::write(dir.path().join("rubric.json"), RUBRIC_JSON).unwrap();
        std::fs::write(dir.path().join("eval_prompts.json"), EVAL_PROMPTS_JSON).unwrap();
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn config(&self) -> counterpoint::AppConfig {
        counterpoint::AppConfig::default().with_paths(
            Some(self.path("prompts.json")),
            Some(self.path("rubric.json")),
            Some(self.path("eval_prompts.json")),
        )
    }
}

pub fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
