//! Adaptive retrieval-and-answer pipeline.
//!
//! `AnswerPipeline` picks a context strategy (local store, web, or both),
//! gathers and optionally extends the context, synthesizes an answer,
//! checks its quality and stores the interaction for later retrieval.

pub mod controller;
pub mod decider;
pub mod expander;
pub mod interactions;
pub mod parse;
pub mod prompts;
pub mod quality;
pub mod reasoning;
pub mod retriever;
pub mod strategy;
pub mod synthesizer;


pub use controller::{
    compose_question, AnswerPipeline, AnswerRequest, AnswerResponse, Collaborators,
    PipelineOptions, PipelineStage, PipelineTrace,
};
pub use interactions::InteractionStore;
pub use quality::QualityPolicy;
pub use retriever::ContextRetriever;
pub use strategy::{Strategy, StrategyMode};
