pub mod openai;
pub mod provider;
pub mod service;
pub mod types;


pub use openai::OpenAiCompatibleProvider;
pub use provider::LlmProvider;
pub use service::{LlmService, LlmSession, MAX_LLM_CALLS};
pub use types::{ChatMessage, ChatRequest, LlmSettings, LlmTask, TaskProfile};
