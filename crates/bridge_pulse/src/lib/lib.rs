pub mod auth;
pub mod clock;
pub mod docs;
pub mod error;
mod llm;
pub mod parser;
mod processor;
pub mod retry;
pub mod tracing;
pub mod yt;

pub use llm::openai;
pub use llm::{
    prompt::{PromptTemplate, TRANSCRIPT_PLACEHOLDER},
    summarizer::{Summarizer, SummaryResponse},
};
pub use processor::{
    builder::BridgeProcessorBuilder, BridgeProcessor, CycleReport, ItemOutcome, ItemStage,
    DEFAULT_IDLE_INTERVAL, DEFAULT_PACING_INTERVAL,
};
