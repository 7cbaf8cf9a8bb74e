use super::parse::{parse_binary_verdict, parse_sub_queries};
use super::prompts;
use crate::llm::{ChatRequest, LlmSession, LlmTask};

/// Step-by-step analysis of the question against the gathered context.
/// Kept for logging and as input to the sufficiency check.
pub async fn analyze(llm: &LlmSession<'_>, question: &str, context: &str) -> Option<String> {
    let request = ChatRequest::new(LlmTask::Reasoning, prompts::reasoning(question, context));
    match llm.complete(request).await {
        Ok(text) => {
            tracing::debug!("Reasoning: {}", text);
            Some(text)
        }
        Err(err) => {
            tracing::warn!("Reasoning step failed, continuing without it: {}", err);
            None
        }
    }
}

/// True when the model asks for more information. Failures and unreadable
/// replies count as "sufficient" so no extra retrieval round is started.
pub async fn needs_more_information(
    llm: &LlmSession<'_>,
    question: &str,
    context: &str,
    reasoning: &str,
) -> bool {
    let request = ChatRequest::new(
        LlmTask::Sufficiency,
        prompts::sufficiency(question, context, reasoning),
    );
    match llm.complete(request).await {
        Ok(raw) => parse_binary_verdict(&raw).unwrap_or_else(|| {
            tracing::warn!("Sufficiency verdict {:?} has no 0/1, treating as sufficient", raw);
            false
        }),
        Err(err) => {
            tracing::warn!("Sufficiency check failed, treating context as sufficient: {}", err);
            false
        }
    }
}

/// Two or three narrower queries aimed at the gaps named in `reasoning`.
pub async fn generate_sub_queries(llm: &LlmSession<'_>, question: &str, reasoning: &str) -> Vec<String> {
    let request = ChatRequest::new(LlmTask::SubQueries, prompts::sub_queries(question, reasoning));
    match llm.complete(request).await {
        Ok(raw) => parse_sub_queries(&raw),
        Err(err) => {
            tracing::warn!("Sub-query generation failed: {}", err);
            Vec::new()
        }
    }
}
