use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::config::{get_f64, get_str, get_u64, lookup};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Pipeline step that issued a completion. Used to pick the model profile
/// and to label logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmTask {
    Expansion,
    Strategy,
    Relevance,
    Reasoning,
    Sufficiency,
    SubQueries,
    Synthesis,
    Validation,
    Scoring,
    Refinement,
}

impl LlmTask {
    pub const ALL: [LlmTask; 10] = [
        LlmTask::Expansion,
        LlmTask::Strategy,
        LlmTask::Relevance,
        LlmTask::Reasoning,
        LlmTask::Sufficiency,
        LlmTask::SubQueries,
        LlmTask::Synthesis,
        LlmTask::Validation,
        LlmTask::Scoring,
        LlmTask::Refinement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmTask::Expansion => "expansion",
            LlmTask::Strategy => "strategy",
            LlmTask::Relevance => "relevance",
            LlmTask::Reasoning => "reasoning",
            LlmTask::Sufficiency => "sufficiency",
            LlmTask::SubQueries => "sub_queries",
            LlmTask::Synthesis => "synthesis",
            LlmTask::Validation => "validation",
            LlmTask::Scoring => "scoring",
            LlmTask::Refinement => "refinement",
        }
    }

    /// Built-in profile: single-token verdicts run cold on a small model,
    /// free-text generation on a larger one.
    pub fn default_profile(&self) -> TaskProfile {
        let (model, temperature, max_tokens) = match self {
            LlmTask::Expansion => (LARGE_MODEL, Some(0.7), Some(200)),
            LlmTask::Strategy => (SMALL_MODEL, Some(0.1), Some(10)),
            LlmTask::Relevance => (SMALL_MODEL, Some(0.0), Some(3)),
            LlmTask::Reasoning => (LARGE_MODEL, Some(0.3), Some(600)),
            LlmTask::Sufficiency => (SMALL_MODEL, Some(0.1), Some(3)),
            LlmTask::SubQueries => (LARGE_MODEL, Some(0.7), Some(200)),
            LlmTask::Synthesis => (LARGE_MODEL, None, Some(500)),
            LlmTask::Validation => (LARGE_MODEL, Some(0.0), Some(3)),
            LlmTask::Scoring => (SMALL_MODEL, Some(0.1), Some(3)),
            LlmTask::Refinement => (LARGE_MODEL, Some(0.7), Some(600)),
        };
        TaskProfile {
            model: model.to_string(),
            temperature,
            max_tokens,
        }
    }
}

impl fmt::Display for LlmTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SMALL_MODEL: &str = "gpt-4o-mini";
const LARGE_MODEL: &str = "gpt-4-turbo";

/// Generation parameters applied to every request of one [`LlmTask`].
#[derive(Debug, Clone, PartialEq)]
pub struct TaskProfile {
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub task: LlmTask,
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(task: LlmTask, messages: Vec<ChatMessage>) -> Self {
        Self {
            task,
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Fill unset generation parameters from a task profile.
    pub fn with_profile(mut self, profile: &TaskProfile) -> Self {
        self.model = self.model.or_else(|| Some(profile.model.clone()));
        self.temperature = self.temperature.or(profile.temperature);
        self.max_tokens = self.max_tokens.or(profile.max_tokens);
        self
    }
}

/// Connection and per-task settings for the chat-completion provider.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    profiles: HashMap<LlmTask, TaskProfile>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
            profiles: LlmTask::ALL
                .iter()
                .map(|task| (*task, task.default_profile()))
                .collect(),
        }
    }
}

impl LlmSettings {
    pub fn from_config(config: &Value) -> Self {
        let mut settings = Self::default();

        if let Some(url) = get_str(config, "llm.base_url") {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        settings.api_key = get_str(config, "llm.api_key")
            .map(str::to_string)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty());
        if let Some(secs) = get_u64(config, "llm.timeout_secs") {
            settings.timeout = Duration::from_secs(secs);
        }

        for task in LlmTask::ALL {
            let Some(task_cfg) = lookup(config, &format!("llm.tasks.{}", task.as_str())) else {
                continue;
            };
            let profile = settings
                .profiles
                .entry(task)
                .or_insert_with(|| task.default_profile());
            if let Some(model) = task_cfg.get("model").and_then(|v| v.as_str()) {
                profile.model = model.to_string();
            }
            if let Some(temperature) = get_f64(task_cfg, "temperature") {
                profile.temperature = Some(temperature);
            }
            if let Some(max_tokens) = get_u64(task_cfg, "max_tokens") {
                profile.max_tokens = Some(max_tokens as u32);
            }
        }

        settings
    }

    pub fn profile(&self, task: LlmTask) -> TaskProfile {
        self.profiles
            .get(&task)
            .cloned()
            .unwrap_or_else(|| task.default_profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn with_profile_keeps_explicit_values() {
        let request = ChatRequest {
            max_tokens: Some(42),
            ..ChatRequest::new(LlmTask::Synthesis, vec![ChatMessage::user("hi")])
        }
        .with_profile(&LlmTask::Synthesis.default_profile());

        assert_eq!(request.max_tokens, Some(42));
        assert_eq!(request.model.as_deref(), Some("gpt-4-turbo"));
        assert_eq!(request.temperature, None);
    }

    #[test]
    fn verdict_tasks_default_to_tiny_outputs() {
        for task in [LlmTask::Relevance, LlmTask::Sufficiency, LlmTask::Scoring] {
            assert_eq!(task.default_profile().max_tokens, Some(3));
        }
        assert_eq!(LlmTask::Relevance.default_profile().temperature, Some(0.0));
    }

    #[test]
    fn settings_override_task_profiles_from_config() {
        let config = json!({
            "llm": {
                "base_url": "http://localhost:1234/",
                "api_key": "sk-local",
                "timeout_secs": 5,
                "tasks": {
                    "synthesis": { "model": "local-model", "temperature": 0.2 }
                }
            }
        });

        let settings = LlmSettings::from_config(&config);

        assert_eq!(settings.base_url, "http://localhost:1234");
        assert_eq!(settings.api_key.as_deref(), Some("sk-local"));
        assert_eq!(settings.timeout, Duration::from_secs(5));
        let synthesis = settings.profile(LlmTask::Synthesis);
        assert_eq!(synthesis.model, "local-model");
        assert_eq!(synthesis.temperature, Some(0.2));
        assert_eq!(synthesis.max_tokens, Some(500));
        assert_eq!(settings.profile(LlmTask::Strategy).model, "gpt-4o-mini");
    }
}
