//! Prompt assembly.
//!
//! [`PromptBuilder`] deterministically combines the system prompt,
//! retrieved context, conversation history, the new user message, and
//! tool definitions into one provider-agnostic [`ChatPrompt`]. Pure
//! transformation; no network or storage access.

use crate::types::{ContextSnippet, MessageRole, ToolDefinition};

/// Provider-agnostic prompt for one generation request.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub system: String,
    /// Rendered context block, empty when retrieval was skipped or
    /// returned nothing.
    pub context: String,
    pub user: String,
    /// Prior turns, oldest first.
    pub history: Vec<(MessageRole, String)>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatPrompt {
    /// Flatten into ordered (role, content) pairs for providers that
    /// speak a message-list wire format. The context block and tool
    /// protocol are folded into the system message.
    pub fn to_messages(&self) -> Vec<(String, String)> {
        let mut system = self.system.clone();
        if !self.context.is_empty() {
            system.push_str("\n\nUse the following context to answer. Cite sources where relevant.\n\n");
            system.push_str(&self.context);
        }
        if !self.tools.is_empty() {
            system.push_str("\n\n");
            system.push_str(&render_tool_protocol(&self.tools));
        }

        let mut messages = vec![("system".to_string(), system)];
        for (role, content) in &self.history {
            messages.push((role.as_str().to_string(), content.clone()));
        }
        messages.push(("user".to_string(), self.user.clone()));
        messages
    }
}

fn render_tool_protocol(tools: &[ToolDefinition]) -> String {
    let mut out = String::from(
        "You have access to the following tools. To use one, emit exactly:\n\
         <tool_call>{\"name\": \"<tool-name>\", \"args\": {...}}</tool_call>\n\
         The result will be returned to you before you finish your answer.\n\nTools:\n",
    );
    for tool in tools {
        out.push_str(&format!(
            "- {}: {} (parameters: {})\n",
            tool.name, tool.description, tool.parameters
        ));
    }
    out
}

#[derive(Clone)]
pub struct PromptBuilder {
    system: String,
    context: String,
    user: String,
    history: Vec<(MessageRole, String)>,
    tools: Vec<ToolDefinition>,
    temperature: f32,
    max_tokens: u32,
}

impl PromptBuilder {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            context: String::new(),
            user: String::new(),
            history: Vec::new(),
            tools: Vec::new(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    /// Render retrieved snippets into the context block, each prefixed
    /// with its source citation.
    pub fn context_snippets(mut self, snippets: &[ContextSnippet]) -> Self {
        self.context = snippets
            .iter()
            .map(|s| format!("{}\n{}", s.source_reference(), s.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        self
    }

    /// Raw context text, for callers that assemble it themselves.
    pub fn context_text(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn user_message(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn history(mut self, history: Vec<(MessageRole, String)>) -> Self {
        self.history = history;
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn build(self) -> ChatPrompt {
        ChatPrompt {
            system: self.system,
            context: self.context,
            user: self.user,
            history: self.history,
            tools: self.tools,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn snippet(name: &str, index: usize, text: &str) -> ContextSnippet {
        ContextSnippet {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            document_name: name.to_string(),
            chunk_index: index,
            text: text.to_string(),
            metadata: json!({}),
            score: 0.8,
        }
    }

    #[test]
    fn test_context_snippets_carry_citations() {
        let prompt = PromptBuilder::new("You are helpful.")
            .context_snippets(&[
                snippet("guide.md", 0, "First fact."),
                snippet("guide.md", 3, "Second fact."),
            ])
            .user_message("What is the fact?")
            .build();

        assert!(prompt.context.contains("[Source: guide.md#0]\nFirst fact."));
        assert!(prompt.context.contains("[Source: guide.md#3]\nSecond fact."));
    }

    #[test]
    fn test_to_messages_ordering() {
        let prompt = PromptBuilder::new("System text.")
            .history(vec![
                (MessageRole::User, "earlier question".to_string()),
                (MessageRole::Assistant, "earlier answer".to_string()),
            ])
            .user_message("new question")
            .build();

        let messages = prompt.to_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].0, "system");
        assert_eq!(messages[1], ("user".to_string(), "earlier question".to_string()));
        assert_eq!(messages[2].0, "assistant");
        assert_eq!(messages[3], ("user".to_string(), "new question".to_string()));
    }

    #[test]
    fn test_tool_protocol_in_system_message() {
        let prompt = PromptBuilder::new("System.")
            .tools(vec![ToolDefinition {
                name: "calculator".to_string(),
                description: "Evaluate arithmetic".to_string(),
                parameters: json!({"type": "object"}),
            }])
            .user_message("2+2?")
            .build();

        let messages = prompt.to_messages();
        let system = &messages[0].1;
        assert!(system.contains("<tool_call>"));
        assert!(system.contains("calculator"));
    }

    #[test]
    fn test_no_context_no_tools_leaves_system_untouched() {
        let prompt = PromptBuilder::new("Just the system.").user_message("hi").build();
        let messages = prompt.to_messages();
        assert_eq!(messages[0].1, "Just the system.");
    }

    #[test]
    fn test_determinism() {
        let build = || {
            PromptBuilder::new("S")
                .context_snippets(&[snippet("a.txt", 1, "text")])
                .user_message("q")
                .build()
                .to_messages()
        };
        // Snippet ids differ but rendered output must not.
        let a: Vec<String> = build().into_iter().map(|(_, c)| c).collect();
        let b: Vec<String> = build().into_iter().map(|(_, c)| c).collect();
        assert_eq!(a, b);
    }
}
