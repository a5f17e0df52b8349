//! Chat turn orchestration.

pub mod service;

pub use service::{ChatRequest, ChatResponse, ChatService};
