use super::parse::{parse_binary_verdict, parse_quality_score};
use super::prompts;
use crate::llm::{ChatRequest, LlmSession, LlmTask};

/// Score used when the model's rating cannot be read. Equal to the default
/// refinement threshold, so an unreadable score never triggers a rewrite.
pub const DEFAULT_QUALITY_SCORE: u8 = 7;

/// Post-synthesis check applied to every answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPolicy {
    /// Ask whether the answer is supported by the context; log the verdict.
    BinaryValidation,
    /// Rate the answer 1-10 and rewrite it once when below the threshold.
    ScoredRefinement,
}

impl QualityPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "binary_validation" => Some(QualityPolicy::BinaryValidation),
            "scored_refinement" => Some(QualityPolicy::ScoredRefinement),
            _ => None,
        }
    }
}

/// `Some(true)` when the model says the answer is fully supported, `None`
/// when the check could not be made.
pub async fn validate(llm: &LlmSession<'_>, answer: &str, context: &str) -> Option<bool> {
    let request = ChatRequest::new(LlmTask::Validation, prompts::validation(answer, context));
    match llm.complete(request).await {
        Ok(raw) => {
            let verdict = parse_binary_verdict(&raw);
            if verdict.is_none() {
                tracing::warn!("Validation verdict {:?} has no 0/1", raw);
            }
            verdict
        }
        Err(err) => {
            tracing::warn!("Validation call failed: {}", err);
            None
        }
    }
}

pub async fn score(llm: &LlmSession<'_>, answer: &str, context: &str, question: &str) -> u8 {
    let request = ChatRequest::new(LlmTask::Scoring, prompts::scoring(answer, context, question));
    match llm.complete(request).await {
        Ok(raw) => parse_quality_score(&raw).unwrap_or_else(|| {
            tracing::warn!("Quality score {:?} is not a number, using {}", raw, DEFAULT_QUALITY_SCORE);
            DEFAULT_QUALITY_SCORE
        }),
        Err(err) => {
            tracing::warn!("Quality scoring failed, using {}: {}", DEFAULT_QUALITY_SCORE, err);
            DEFAULT_QUALITY_SCORE
        }
    }
}

/// Rewritten answer, or `None` when refinement failed or came back empty.
pub async fn refine(
    llm: &LlmSession<'_>,
    answer: &str,
    context: &str,
    question: &str,
    reasoning: &str,
) -> Option<String> {
    let request = ChatRequest::new(
        LlmTask::Refinement,
        prompts::refinement(answer, context, question, reasoning),
    );
    match llm.complete(request).await {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => {
            tracing::warn!("Refinement returned nothing, keeping the original answer");
            None
        }
        Err(err) => {
            tracing::warn!("Refinement failed, keeping the original answer: {}", err);
            None
        }
    }
}
