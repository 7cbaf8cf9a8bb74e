use super::parse::parse_binary_verdict;
use super::prompts;
use crate::llm::{ChatRequest, LlmSession, LlmTask};

/// Whether `context` suffices to answer `question`.
///
/// Empty input returns `false` without a model call. Unparsable replies and
/// failed calls also return `false`, so an uncertain verdict leads to a web
/// search rather than an answer from thin context.
pub async fn decide(llm: &LlmSession<'_>, context: &str, question: &str) -> bool {
    if context.trim().is_empty() || question.trim().is_empty() {
        tracing::info!("No usable context, skipping relevance check");
        return false;
    }

    let request = ChatRequest::new(LlmTask::Relevance, prompts::decision(context, question));
    match llm.complete(request).await {
        Ok(raw) => match parse_binary_verdict(&raw) {
            Some(verdict) => verdict,
            None => {
                tracing::warn!("Relevance verdict {:?} has no 0/1, treating as insufficient", raw);
                false
            }
        },
        Err(err) => {
            tracing::warn!("Relevance check failed, treating context as insufficient: {}", err);
            false
        }
    }
}
