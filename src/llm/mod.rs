//! LLM provider clients and prompt machinery.

pub mod client;
pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod toolcall;

pub use client::{LlmClient, Provider};
pub use prompt::{ChatPrompt, PromptBuilder};
pub use toolcall::parse_tool_calls;
