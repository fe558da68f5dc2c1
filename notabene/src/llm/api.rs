use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolChoiceOption,
        ChatCompletionToolType, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FunctionCall, FunctionObjectArgs,
    },
    Client,
};
use async_trait::async_trait;

use crate::config::{default_base_url, parse_provider_model, provider_needs_api_key, ChatConfig};
use crate::error::{NotabeneError, Result};
use crate::llm::provider::{
    ChatModel, ChatReply, ChatRequest, PromptMessage, ReplyContent, ToolCall, ToolSpec,
};

const TITLE_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone)]
struct ApiConfig {
    model: String,
    title_model: String,
    max_retries: u32,
}

/// Chat-completion client for OpenAI-compatible APIs.
#[derive(Clone, Debug)]
pub struct ChatApiClient {
    client: Client<OpenAIConfig>,
    config: ApiConfig,
}

impl ChatApiClient {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let (provider, model) = parse_provider_model(&config.model);
        let (_, title_model) = parse_provider_model(&config.title_model);

        if provider_needs_api_key(provider) && config.api_key.is_none() {
            return Err(NotabeneError::Configuration(format!(
                "No API key configured for chat provider '{provider}'"
            )));
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());

        let openai_config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(config.api_key.clone().unwrap_or_default());

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| {
                NotabeneError::Llm(format!("Failed to create chat HTTP client: {error}"))
            })?;

        // Bound async-openai's internal backoff by the configured timeout;
        // its default max_elapsed_time retries 500s for up to 15 minutes.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(config.timeout_secs)),
            ..Default::default()
        };

        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(backoff);

        Ok(Self {
            client,
            config: ApiConfig {
                model: model.to_string(),
                title_model: title_model.to_string(),
                max_retries: config.max_retries,
            },
        })
    }

    async fn create_with_retries(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse> {
        let mut last_error: Option<NotabeneError> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay_ms = 100 * 2_u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.client.chat().create(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    if let Some(rate_limit_error) = Self::rate_limit_error(&error) {
                        return Err(rate_limit_error);
                    }

                    if let Some(auth_error) = Self::auth_error(&error) {
                        return Err(auth_error);
                    }

                    let retryable = Self::is_retryable(&error);
                    let mapped_error = Self::map_openai_error(error);

                    if retryable && attempt < self.config.max_retries {
                        last_error = Some(mapped_error);
                        continue;
                    }

                    return Err(mapped_error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| NotabeneError::Llm("Chat completion failed after retries".into())))
    }

    fn build_request(&self, request: &ChatRequest) -> Result<CreateChatCompletionRequest> {
        let messages = request
            .messages
            .iter()
            .map(Self::to_api_message)
            .collect::<Result<Vec<_>>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(self.config.model.clone())
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens);

        if !request.tools.is_empty() {
            let tools = request
                .tools
                .iter()
                .map(Self::to_api_tool)
                .collect::<Result<Vec<_>>>()?;
            builder
                .tools(tools)
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        builder
            .build()
            .map_err(|error| NotabeneError::Validation(format!("Invalid chat request: {error}")))
    }

    fn to_api_message(message: &PromptMessage) -> Result<ChatCompletionRequestMessage> {
        let built: ChatCompletionRequestMessage = match message {
            PromptMessage::System { content } => ChatCompletionRequestSystemMessageArgs::default()
                .content(content.clone())
                .build()
                .map_err(|error| {
                    NotabeneError::Validation(format!("Invalid system message: {error}"))
                })?
                .into(),
            PromptMessage::User { content } => ChatCompletionRequestUserMessageArgs::default()
                .content(content.clone())
                .build()
                .map_err(|error| {
                    NotabeneError::Validation(format!("Invalid user message: {error}"))
                })?
                .into(),
            PromptMessage::Assistant {
                content,
                tool_calls,
            } => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                if let Some(content) = content {
                    args.content(content.clone());
                }
                if !tool_calls.is_empty() {
                    let calls: Vec<ChatCompletionMessageToolCall> = tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect();
                    args.tool_calls(calls);
                }
                args.build()
                    .map_err(|error| {
                        NotabeneError::Validation(format!("Invalid assistant message: {error}"))
                    })?
                    .into()
            }
            PromptMessage::Tool {
                tool_call_id,
                content,
                ..
            } => ChatCompletionRequestToolMessageArgs::default()
                .content(content.clone())
                .tool_call_id(tool_call_id.clone())
                .build()
                .map_err(|error| {
                    NotabeneError::Validation(format!("Invalid tool message: {error}"))
                })?
                .into(),
        };

        Ok(built)
    }

    fn to_api_tool(spec: &ToolSpec) -> Result<ChatCompletionTool> {
        let function = FunctionObjectArgs::default()
            .name(spec.name.clone())
            .description(spec.description.clone())
            .parameters(spec.parameters.clone())
            .build()
            .map_err(|error| {
                NotabeneError::Validation(format!("Invalid tool declaration: {error}"))
            })?;

        ChatCompletionToolArgs::default()
            .r#type(ChatCompletionToolType::Function)
            .function(function)
            .build()
            .map_err(|error| {
                NotabeneError::Validation(format!("Invalid tool declaration: {error}"))
            })
    }

    fn is_retryable(error: &OpenAIError) -> bool {
        match error {
            OpenAIError::ApiError(api_error) => {
                api_error.r#type.is_none() && api_error.code.is_none()
            }
            OpenAIError::Reqwest(reqwest_error) => reqwest_error
                .status()
                .map(|status| status.is_server_error())
                .unwrap_or(true),
            _ => false,
        }
    }

    fn rate_limit_error(error: &OpenAIError) -> Option<NotabeneError> {
        match error {
            OpenAIError::Reqwest(reqwest_error)
                if reqwest_error.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) =>
            {
                Some(NotabeneError::ApiRateLimit { retry_after: None })
            }
            OpenAIError::ApiError(api_error) if Self::is_rate_limit_api_error(api_error) => {
                Some(NotabeneError::ApiRateLimit { retry_after: None })
            }
            _ => None,
        }
    }

    fn auth_error(error: &OpenAIError) -> Option<NotabeneError> {
        match error {
            OpenAIError::Reqwest(reqwest_error)
                if reqwest_error.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
                    || reqwest_error.status() == Some(reqwest::StatusCode::FORBIDDEN) =>
            {
                Some(NotabeneError::ApiAuth(format!(
                    "Chat provider rejected the credential: {reqwest_error}"
                )))
            }
            OpenAIError::ApiError(api_error) if Self::is_auth_api_error(api_error) => {
                Some(NotabeneError::ApiAuth(format!(
                    "Chat provider rejected the credential: {api_error}"
                )))
            }
            _ => None,
        }
    }

    fn is_rate_limit_api_error(api_error: &ApiError) -> bool {
        let message = api_error.message.to_lowercase();
        let error_type = api_error.r#type.clone().unwrap_or_default().to_lowercase();
        let code = api_error.code.clone().unwrap_or_default().to_lowercase();

        message.contains("rate limit")
            || message.contains("too many requests")
            || error_type.contains("rate_limit")
            || code.contains("rate_limit")
            || code == "insufficient_quota"
    }

    fn is_auth_api_error(api_error: &ApiError) -> bool {
        let message = api_error.message.to_lowercase();
        let error_type = api_error.r#type.clone().unwrap_or_default().to_lowercase();
        let code = api_error.code.clone().unwrap_or_default().to_lowercase();

        message.contains("unauthorized")
            || message.contains("forbidden")
            || message.contains("authentication")
            || message.contains("invalid api key")
            || code.contains("invalid_api_key")
            || code.contains("authentication")
            || error_type.contains("authentication")
    }

    fn map_openai_error(error: OpenAIError) -> NotabeneError {
        match error {
            OpenAIError::Reqwest(reqwest_error) => {
                NotabeneError::Llm(format!("Chat request failed: {reqwest_error}"))
            }
            OpenAIError::ApiError(api_error) => {
                NotabeneError::Llm(format!("Chat API error: {api_error}"))
            }
            OpenAIError::JSONDeserialize(err) => {
                NotabeneError::Llm(format!("Failed to parse chat response: {err}"))
            }
            OpenAIError::InvalidArgument(message) => NotabeneError::Validation(message),
            other => NotabeneError::Llm(other.to_string()),
        }
    }
}

#[async_trait]
impl ChatModel for ChatApiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply> {
        let api_request = self.build_request(&request)?;
        let response = self.create_with_retries(api_request).await?;

        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| NotabeneError::Llm("Chat response contained no choices".into()))?
            .message;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        let content = message
            .content
            .filter(|text| !text.is_empty())
            .map(ReplyContent::Text);

        Ok(ChatReply {
            content,
            tool_calls,
        })
    }

    async fn complete_brief(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(NotabeneError::Validation("Prompt cannot be empty".into()));
        }

        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|error| NotabeneError::Validation(format!("Invalid prompt: {error}")))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.config.title_model.clone())
            .messages(messages)
            .temperature(TITLE_TEMPERATURE)
            .max_tokens(max_tokens)
            .build()
            .map_err(|error| NotabeneError::Validation(format!("Invalid request: {error}")))?;

        let response = self.create_with_retries(request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(NotabeneError::Llm(
                "Chat response contained empty content".into(),
            ));
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_config(model: &str, api_key: Option<&str>) -> ChatConfig {
        ChatConfig {
            model: model.to_string(),
            title_model: "mistral/ministral-3b-latest".to_string(),
            api_key: api_key.map(str::to_string),
            base_url: None,
            temperature: 0.3,
            max_tokens: 800,
            timeout_secs: 5,
            max_retries: 0,
            history_window: 10,
            max_iterations: 3,
        }
    }

    #[test]
    fn test_missing_key_is_a_configuration_error() {
        let err = ChatApiClient::new(&chat_config("mistral/mistral-large-latest", None))
            .expect_err("key required");
        assert!(matches!(err, NotabeneError::Configuration(_)));
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        assert!(ChatApiClient::new(&chat_config("ollama/llama3", None)).is_ok());
    }

    #[test]
    fn test_model_names_are_stripped_of_provider() {
        let client =
            ChatApiClient::new(&chat_config("mistral/mistral-large-latest", Some("k"))).unwrap();
        assert_eq!(client.config.model, "mistral-large-latest");
        assert_eq!(client.config.title_model, "ministral-3b-latest");
    }
}
