use crate::llm::client::LlmClient;
use crate::llm::prompt::ChatPrompt;
use crate::types::{AppError, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use futures::StreamExt;

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Self {
            client: Client::with_config(config),
            model,
        }
    }

    fn build_request(&self, prompt: &ChatPrompt) -> Result<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = prompt
            .to_messages()
            .into_iter()
            .map(|(role, content)| match role.as_str() {
                "system" => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(content),
                ),
                "assistant" => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessage::from(content),
                ),
                // Tool transcripts ride along as user turns; the
                // continuation prompt carries the actual results.
                _ => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage::from(
                    content,
                )),
            })
            .collect();

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(prompt.temperature)
            .max_tokens(prompt.max_tokens)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build request: {}", e)))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, prompt: &ChatPrompt) -> Result<String> {
        let request = self.build_request(prompt)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::Llm(format!("OpenAI API error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::Llm("No response from OpenAI".to_string()))
    }

    async fn chat_stream(
        &self,
        prompt: &ChatPrompt,
    ) -> Result<Box<dyn futures::Stream<Item = Result<String>> + Send + Unpin>> {
        let request = self.build_request(prompt)?;

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| AppError::Llm(format!("OpenAI API error: {}", e)))?;

        let result_stream = async_stream::stream! {
            while let Some(result) = stream.next().await {
                match result {
                    Ok(response) => {
                        for choice in response.choices {
                            if let Some(content) = choice.delta.content {
                                yield Ok(content);
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(AppError::Llm(format!("Stream error: {}", e)));
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(result_stream)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
