use std::fmt;

use serde::Serialize;

use super::parse::parse_strategy;
use super::prompts;
use crate::llm::{ChatRequest, LlmSession, LlmTask};

/// Where context is gathered from for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    LocalFirst,
    WebFirst,
    Hybrid,
}

impl Strategy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "local_first" => Some(Strategy::LocalFirst),
            "web_first" => Some(Strategy::WebFirst),
            "hybrid" => Some(Strategy::Hybrid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::LocalFirst => "local_first",
            Strategy::WebFirst => "web_first",
            Strategy::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the pipeline picks a [`Strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyMode {
    /// Ask the model to classify each question.
    Adaptive,
    Fixed(Strategy),
}

impl StrategyMode {
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "adaptive" {
            return Some(StrategyMode::Adaptive);
        }
        Strategy::from_name(name).map(StrategyMode::Fixed)
    }
}

/// Classify `question`. Unrecognised replies and failed calls fall back to
/// [`Strategy::Hybrid`].
pub async fn select_strategy(llm: &LlmSession<'_>, question: &str) -> Strategy {
    let request = ChatRequest::new(LlmTask::Strategy, prompts::strategy(question));
    match llm.complete(request).await {
        Ok(raw) => parse_strategy(&raw).unwrap_or_else(|| {
            tracing::warn!("Unrecognised strategy {:?}, defaulting to hybrid", raw.trim());
            Strategy::Hybrid
        }),
        Err(err) => {
            tracing::warn!("Strategy selection failed, defaulting to hybrid: {}", err);
            Strategy::Hybrid
        }
    }
}
