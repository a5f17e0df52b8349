use serde::Deserialize;
use std::env;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer using the provided \
context when it is relevant, and cite sources using their [Source: name#index] references.";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub rag: RagConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Chat provider selection: "ollama" or "openai".
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub openai_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    /// Embedding provider selection: "ollama" or "openai".
    pub embedding_provider: String,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_context_chars: usize,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Number of most recent messages included in the prompt.
    pub history_window: usize,
    /// Per-turn tool invocation budget.
    pub max_tool_calls: usize,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            llm: LlmConfig {
                provider: env_or("TOME_LLM_PROVIDER", "ollama"),
                openai_api_key: env::var("OPENAI_API_KEY").ok(),
                openai_api_base: env_or("OPENAI_API_BASE", "https://api.openai.com/v1"),
                openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
                ollama_url: env_or("OLLAMA_URL", "http://localhost:11434"),
                ollama_model: env_or("OLLAMA_MODEL", "llama3.2"),
                temperature: env_or("TOME_TEMPERATURE", "0.7").parse()?,
                max_tokens: env_or("TOME_MAX_TOKENS", "2000").parse()?,
            },
            rag: RagConfig {
                embedding_provider: env_or("TOME_EMBEDDING_PROVIDER", "ollama"),
                embedding_model: env_or("TOME_EMBEDDING_MODEL", "nomic-embed-text"),
                chunk_size: env_or("TOME_CHUNK_SIZE", "3000").parse()?,
                chunk_overlap: env_or("TOME_CHUNK_OVERLAP", "200").parse()?,
                top_k: env_or("TOME_TOP_K", "6").parse()?,
                max_context_chars: env_or("TOME_MAX_CONTEXT_CHARS", "10000").parse()?,
                system_prompt: env_or("TOME_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            },
            chat: ChatConfig {
                history_window: env_or("TOME_HISTORY_WINDOW", "10").parse()?,
                max_tool_calls: env_or("TOME_MAX_TOOL_CALLS", "3").parse()?,
            },
        })
    }
}
