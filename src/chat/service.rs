//! Generation orchestrator.
//!
//! One chat turn runs: resolve session → retrieve context → persist the
//! user message → generate → detect tool calls → invoke tools and
//! continue → persist the assistant message. The tool loop is an
//! explicit bounded loop rather than recursion, so the per-turn
//! invocation budget is enforced in one place. Streaming and blocking
//! entry points share the turn logic and differ only in how output
//! reaches the caller.

use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::llm::client::LlmClient;
use crate::llm::prompt::{ChatPrompt, PromptBuilder};
use crate::llm::toolcall::parse_tool_calls;
use crate::rag::retriever::Retriever;
use crate::store::SessionStore;
use crate::tools::ToolRegistry;
use crate::types::{
    AppError, ChatMessage, ChatSession, ContextSnippet, MessageRole, Result, StreamEvent,
};
use crate::utils::config::{ChatConfig, RagConfig};

const SESSION_TITLE_CHARS: usize = 50;

/// One chat turn's input.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    /// Existing session to continue, or none to start a new one.
    pub session_id: Option<Uuid>,
    pub user_id: String,
    /// Whether to retrieve document context for this turn.
    pub use_rag: bool,
    /// Snippet count override; falls back to the configured default.
    pub top_k: Option<usize>,
    /// Tools offered to the model this turn. `None` offers every
    /// registered tool, `Some(vec![])` offers none.
    pub tools: Option<Vec<String>>,
}

impl ChatRequest {
    pub fn new(user_id: &str, message: &str) -> Self {
        Self {
            message: message.to_string(),
            session_id: None,
            user_id: user_id.to_string(),
            use_rag: true,
            top_k: None,
            tools: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub text: String,
    /// Context snippets used for this turn, for source attribution.
    pub sources: Vec<ContextSnippet>,
    pub tool_calls_made: usize,
}

pub struct ChatService {
    sessions: Arc<dyn SessionStore>,
    retriever: Arc<Retriever>,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    rag_config: RagConfig,
    chat_config: ChatConfig,
    temperature: f32,
    max_tokens: u32,
}

impl ChatService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        retriever: Arc<Retriever>,
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        rag_config: RagConfig,
        chat_config: ChatConfig,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            sessions,
            retriever,
            llm,
            tools,
            rag_config,
            chat_config,
            temperature,
            max_tokens,
        }
    }

    /// Run one turn and return the complete response.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.run_turn(request, None).await
    }

    /// Run one turn, delivering output incrementally. The returned
    /// receiver yields deltas and tool events, then exactly one terminal
    /// `done` or `error` event. Dropping the receiver cancels the turn.
    pub fn chat_stream(self: Arc<Self>, request: ChatRequest) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(64);
        let service = self;
        tokio::spawn(async move {
            match service.run_turn(request, Some(&tx)).await {
                Ok(response) => {
                    let _ = tx
                        .send(StreamEvent::Done {
                            text: response.text,
                            session_id: response.session_id,
                        })
                        .await;
                }
                Err(e) => {
                    error!(error = %e, "chat turn failed");
                    let _ = tx
                        .send(StreamEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        });
        rx
    }

    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>> {
        self.sessions.list_sessions(user_id).await
    }

    pub async fn session_history(
        &self,
        session_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ChatMessage>> {
        self.sessions.recent_messages(session_id, limit).await
    }

    async fn run_turn(
        &self,
        request: ChatRequest,
        events: Option<&mpsc::Sender<StreamEvent>>,
    ) -> Result<ChatResponse> {
        if request.message.trim().is_empty() {
            return Err(AppError::InvalidInput("empty message".to_string()));
        }

        let session = self.resolve_session(&request).await?;

        let snippets = if request.use_rag {
            let k = request.top_k.unwrap_or(self.rag_config.top_k);
            self.retriever.retrieve(&request.message, k).await?
        } else {
            Vec::new()
        };

        let history = self.prompt_history(session.id).await?;

        // The user turn is persisted before generation so a provider
        // failure cannot lose it.
        self.sessions
            .append_message(ChatMessage::new(
                session.id,
                MessageRole::User,
                &request.message,
                estimate_tokens(&request.message),
                0,
            ))
            .await?;

        let tool_definitions = match &request.tools {
            Some(names) => self.tools.definitions_for(names),
            None => self.tools.get_tool_definitions(),
        };

        let base = PromptBuilder::new(&self.rag_config.system_prompt)
            .context_snippets(&snippets)
            .history(history)
            .tools(tool_definitions)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        let prompt = base.clone().user_message(&request.message).build();

        let first = self.generate(&prompt, events).await?;
        let mut pending: VecDeque<_> = parse_tool_calls(&first).into();
        let mut segments = vec![first];
        let mut invoked = 0usize;

        while let Some(call) = pending.pop_front() {
            if invoked >= self.chat_config.max_tool_calls {
                debug!(
                    session_id = %session.id,
                    "tool-call budget exhausted, treating current text as final"
                );
                break;
            }
            invoked += 1;

            info!(session_id = %session.id, tool = %call.name, "invoking tool");
            self.emit(
                events,
                StreamEvent::ToolCall {
                    name: call.name.clone(),
                    args: call.args.clone(),
                },
            )
            .await?;

            let result = self.tools.invoke(&call.name, call.args.clone()).await;

            self.emit(
                events,
                StreamEvent::ToolResult {
                    name: call.name.clone(),
                    result: result.clone(),
                },
            )
            .await?;

            // Two tool-role records per invocation: the call and its result.
            let call_record = serde_json::json!({ "name": call.name, "args": call.args });
            self.sessions
                .append_message(ChatMessage::new(
                    session.id,
                    MessageRole::Tool,
                    &call_record.to_string(),
                    0,
                    0,
                ))
                .await?;
            self.sessions
                .append_message(ChatMessage::new(session.id, MessageRole::Tool, &result, 0, 0))
                .await?;

            let prior = segments.last().map(String::as_str).unwrap_or_default();
            let continuation = format!(
                "{}\n\nTool result: {}\n\nContinue the answer using this tool result. \
                 Do not repeat the tool call.",
                prior, result
            );
            let prompt = base.clone().user_message(continuation).build();
            let text = self.generate(&prompt, events).await?;

            // Newly requested calls are handled before any still-queued
            // ones, matching the order the model produced them.
            for call in parse_tool_calls(&text).into_iter().rev() {
                pending.push_front(call);
            }
            segments.push(text);
        }

        if !pending.is_empty() {
            warn!(
                session_id = %session.id,
                dropped = pending.len(),
                "unresolved tool calls left after budget"
            );
        }

        let text = segments.join("\n");
        let prompt_chars: usize = prompt.to_messages().iter().map(|(_, c)| c.len()).sum();
        self.sessions
            .append_message(ChatMessage::new(
                session.id,
                MessageRole::Assistant,
                &text,
                (prompt_chars / 4) as u32,
                estimate_tokens(&text),
            ))
            .await?;

        info!(
            session_id = %session.id,
            tool_calls = invoked,
            snippets = snippets.len(),
            "chat turn complete"
        );
        Ok(ChatResponse {
            session_id: session.id,
            text,
            sources: snippets,
            tool_calls_made: invoked,
        })
    }

    async fn resolve_session(&self, request: &ChatRequest) -> Result<ChatSession> {
        if let Some(id) = request.session_id {
            return self
                .sessions
                .find_session(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", id)));
        }
        let title = session_title(&request.message);
        self.sessions.create_session(&request.user_id, &title).await
    }

    /// History window for prompt inclusion: the most recent user and
    /// assistant turns, oldest first. Tool transcripts stay in the
    /// store but are not replayed into prompts.
    async fn prompt_history(&self, session_id: Uuid) -> Result<Vec<(MessageRole, String)>> {
        let messages = self
            .sessions
            .recent_messages(session_id, self.chat_config.history_window)
            .await?;
        Ok(messages
            .into_iter()
            .filter(|m| matches!(m.role, MessageRole::User | MessageRole::Assistant))
            .map(|m| (m.role, m.content))
            .collect())
    }

    /// Single generation request. With an event sender, deltas are
    /// forwarded as they arrive and the full text is accumulated;
    /// without one, the provider is called in blocking mode.
    async fn generate(
        &self,
        prompt: &ChatPrompt,
        events: Option<&mpsc::Sender<StreamEvent>>,
    ) -> Result<String> {
        match events {
            None => self.llm.chat(prompt).await,
            Some(tx) => {
                let mut stream = self.llm.chat_stream(prompt).await?;
                let mut text = String::new();
                while let Some(delta) = stream.next().await {
                    let delta = delta?;
                    text.push_str(&delta);
                    if tx.send(StreamEvent::Delta { text: delta }).await.is_err() {
                        return Err(AppError::Internal(
                            "stream receiver dropped, cancelling turn".to_string(),
                        ));
                    }
                }
                Ok(text)
            }
        }
    }

    async fn emit(
        &self,
        events: Option<&mpsc::Sender<StreamEvent>>,
        event: StreamEvent,
    ) -> Result<()> {
        if let Some(tx) = events {
            if tx.send(event).await.is_err() {
                return Err(AppError::Internal(
                    "stream receiver dropped, cancelling turn".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Rough token estimate for accounting; four characters per token.
fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() / 4) as u32
}

fn session_title(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() <= SESSION_TITLE_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(SESSION_TITLE_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}
