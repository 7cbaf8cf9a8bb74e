use super::parse::parse_bullets;
use super::prompts;
use crate::llm::{ChatRequest, LlmSession, LlmTask};

/// Up to three paraphrases of `question`. Never fails: an error or a reply
/// without list items yields no variations.
pub async fn expand(llm: &LlmSession<'_>, question: &str) -> Vec<String> {
    let request = ChatRequest::new(LlmTask::Expansion, prompts::expansion(question));
    match llm.complete(request).await {
        Ok(raw) => {
            let variations = parse_bullets(&raw);
            if variations.is_empty() {
                tracing::debug!("Query expansion returned no list items");
            }
            variations
        }
        Err(err) => {
            tracing::warn!("Query expansion failed, using the question alone: {}", err);
            Vec::new()
        }
    }
}

/// The question followed by its variations, space separated; embedded as
/// one query.
pub fn expanded_query(question: &str, variations: &[String]) -> String {
    std::iter::once(question)
        .chain(variations.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
