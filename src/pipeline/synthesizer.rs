use super::prompts;
use crate::core::errors::ServiceError;
use crate::llm::{ChatRequest, LlmSession, LlmTask};

/// Generate the answer from the final context. This call has no fallback;
/// its error is the request's error.
pub async fn synthesize(llm: &LlmSession<'_>, context: &str, question: &str) -> Result<String, ServiceError> {
    let request = ChatRequest::new(LlmTask::Synthesis, prompts::synthesis(context, question));
    let answer = llm.complete(request).await?;
    Ok(answer.trim().to_string())
}
