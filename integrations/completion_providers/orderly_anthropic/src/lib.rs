use std::time::Duration;

use async_trait::async_trait;
use orderly::completion::{
    Client, CompletionError, CompletionModel, ExtractorSchema, Message, MessageHistory, TokenUsage,
    ToolCall,
};
use orderly::config::{ApiKey, ConfigurationError};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, instrument};

mod messages;

use messages::{convert_history, MessagesResponse};

pub const API_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";
pub const URL: &str = "https://api.anthropic.com/v1/messages";
pub const API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";
const DEFAULT_TEMP: f64 = 0.0;
const DEFAULT_TOKENS: usize = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelConfig {
    model: Option<String>,
    api_key_var: Option<String>,
    api_url: Option<String>,
    timeout_secs: Option<u64>,
}

/// `CompletionModel` for the [Anthropic](https://anthropic.com) Messages API.
///
/// Extraction is done by offering the schema as the only tool and forcing the
/// model to call it, so every answer arrives as a `tool_use` block.
///
/// Mostly built through the `#[client]` macro:
/// ```rust,ignore
/// use orderly::prelude::*;
///
/// #[client(
///     provider = "orderly_anthropic::AnthropicCompletionModel",
///     config = r#"{
///       "model": "claude-3-5-sonnet-20240620",
///       "api_key_var": "ANTHROPIC_API_KEY",
///       "api_url": "https://api.anthropic.com/v1/messages",
///       "timeout_secs": 60
///     }"#
/// )]
/// struct OrderClient;
/// ```
///
/// Every config key is optional. Unknown keys, a missing or empty API key and a
/// zero timeout are all reported as a [`ConfigurationError`] when the model is built.
#[derive(Debug)]
pub struct AnthropicCompletionModel {
    api_key: ApiKey,
    api_url: String,
    client: reqwest::Client,
    model: String,
}

impl AnthropicCompletionModel {
    /// Builds the model from an optional JSON config, reading the key from the environment.
    pub fn new(config_json: Option<&str>) -> Result<Self, ConfigurationError> {
        let config: ModelConfig = match config_json {
            Some(json) => serde_json::from_str(json)
                .map_err(|e| ConfigurationError::InvalidConfig(e.to_string()))?,
            None => ModelConfig::default(),
        };
        let api_key_var = config.api_key_var.as_deref().unwrap_or(API_KEY_ENV_VAR);
        let api_key = ApiKey::from_env(api_key_var)?;
        Self::build(
            api_key,
            config.api_url.unwrap_or_else(|| URL.to_string()),
            config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Builds the model with an explicit key and endpoint, using the default model and timeout.
    pub fn with_api_key(
        api_key: ApiKey,
        api_url: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        Self::build(
            api_key,
            api_url.into(),
            DEFAULT_MODEL.to_string(),
            DEFAULT_TIMEOUT_SECS,
        )
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build(
        api_key: ApiKey,
        api_url: String,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self, ConfigurationError> {
        if timeout_secs == 0 {
            return Err(ConfigurationError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ConfigurationError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            api_key,
            api_url,
            client,
            model,
        })
    }

    fn request_body(
        &self,
        schema: &ExtractorSchema,
        message: Message,
        history: &MessageHistory,
        temperature: f64,
        max_tokens: usize,
    ) -> serde_json::Value {
        let mut messages = history.clone();
        messages.push(message);
        let (system, messages) = convert_history(messages);

        let mut tool = json!({
            "name": schema.name,
            "input_schema": schema.schema,
        });
        if let (Some(description), Some(obj)) = (&schema.description, tool.as_object_mut()) {
            obj.insert("description".to_string(), json!(description));
        }

        let mut request_body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": messages,
            "tools": [tool],
            "tool_choice": {"type": "tool", "name": schema.name},
        });
        if let (Some(system), Some(obj)) = (system, request_body.as_object_mut()) {
            obj.insert("system".to_string(), serde_json::Value::String(system));
        }
        request_body
    }
}

fn transport_error(e: &reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(e.to_string())
    } else {
        CompletionError::RequestError(e.to_string())
    }
}

#[async_trait]
impl CompletionModel for AnthropicCompletionModel {
    fn from_json_config(config: Option<&str>) -> Result<Self, ConfigurationError> {
        Self::new(config)
    }

    fn build_client(self, preamble: impl AsRef<str>) -> Client<Self> {
        Client::new(self, preamble, DEFAULT_TEMP, DEFAULT_TOKENS)
    }

    #[instrument(
        skip(self, schema, message, history, temperature),
        fields(tool = %schema.name, history_len = history.len())
    )]
    async fn extract(
        &mut self,
        schema: &ExtractorSchema,
        message: Message,
        history: &MessageHistory,
        temperature: f64,
        max_tokens: usize,
    ) -> Result<(ToolCall, TokenUsage), CompletionError> {
        let request_body = self.request_body(schema, message, history, temperature, max_tokens);
        debug!(model = %self.model, "Sending extraction request");

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "Received response");
        if !status.is_success() {
            let error_msg = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error (failed to read response body)".to_string());
            error!(status = status.as_u16(), body = %error_msg, "Provider rejected the request");
            return Err(match status.as_u16() {
                401 | 403 => CompletionError::Authentication(error_msg),
                code => CompletionError::ProviderError(code, error_msg),
            });
        }

        let body = response.text().await.map_err(|e| transport_error(&e))?;
        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::ParseError(format!("unexpected response body: {e}")))?;

        let call = parsed.tool_call(&schema.name).ok_or_else(|| {
            let text = parsed.text();
            CompletionError::ParseError(format!(
                "no `{}` tool call in response (stop reason: {}){}",
                schema.name,
                parsed.stop_reason.as_deref().unwrap_or("unknown"),
                if text.is_empty() {
                    String::new()
                } else {
                    format!(", text: {text}")
                }
            ))
        })?;
        Ok((call, parsed.usage.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use orderly::order::TextExtraction;
    use orderly::prelude::*;

    const DUBAI_ARGS: &str = r#"{
        "chain_of_thought": "Dubai is in the UAE.",
        "name": "Aisha Al-Mansoori",
        "is_repeat_order": false,
        "order": {
            "delivery_date": "July 4th, 2024",
            "delivery_time": "4:00 PM",
            "order_list": [{"name": "Hawaiian", "size": "large", "quantity": 2}]
        },
        "address": {"street": "Al Wasl Road", "city": "Dubai", "country": "United Arab Emirates", "locator": 1234567890}
    }"#;

    fn model_for(server: &mockito::Server) -> AnthropicCompletionModel {
        AnthropicCompletionModel::with_api_key(ApiKey::new("test-key").unwrap(), server.url())
            .unwrap()
    }

    fn tool_use_body(arguments: &str) -> String {
        let input: serde_json::Value = serde_json::from_str(arguments).unwrap();
        json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": DEFAULT_MODEL,
            "content": [
                {"type": "tool_use", "id": "toolu_01", "name": "record_order", "input": input}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 120, "output_tokens": 80}
        })
        .to_string()
    }

    fn prompt() -> (ExtractorSchema, Message, MessageHistory) {
        (
            ExtractorSchema::for_type::<TextExtraction>().unwrap(),
            Message::User {
                content: "Two large Hawaiian pizzas to Al Wasl Road, Dubai".to_string(),
                tool_responses: None,
            },
            vec![Message::Preamble("Extract the order.".to_string())],
        )
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let err = AnthropicCompletionModel::new(Some(r#"{"modle": "claude"}"#)).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_credential_is_a_config_error() {
        let err = AnthropicCompletionModel::new(Some(
            r#"{"api_key_var": "ORDERLY_TEST_KEY_THAT_IS_NEVER_SET"}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingCredential(var) if var == "ORDERLY_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = AnthropicCompletionModel::build(
            ApiKey::new("test-key").unwrap(),
            URL.to_string(),
            DEFAULT_MODEL.to_string(),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidConfig(_)));
    }

    #[test]
    fn test_request_body_forces_the_schema_tool() {
        let model = AnthropicCompletionModel::with_api_key(ApiKey::new("k").unwrap(), URL)
            .unwrap()
            .with_model("claude-test");
        let (schema, message, history) = prompt();
        let body = model.request_body(&schema, message, &history, 0.0, 1024);

        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["system"], "Extract the order.");
        assert_eq!(body["tool_choice"], json!({"type": "tool", "name": "record_order"}));
        assert_eq!(body["tools"][0]["name"], "record_order");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_extract_returns_tool_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", API_VERSION)
            .match_body(Matcher::PartialJson(json!({
                "tool_choice": {"type": "tool", "name": "record_order"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(tool_use_body(DUBAI_ARGS))
            .create_async()
            .await;

        let mut model = model_for(&server);
        let (schema, message, history) = prompt();
        let (call, usage) = model
            .extract(&schema, message, &history, 0.0, 1024)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(call.id, "toolu_01");
        assert_eq!(call.name, "record_order");
        assert_eq!(usage.total_tokens, Some(200));
        let value: serde_json::Value = serde_json::from_str(&call.arguments).unwrap();
        assert_eq!(value["address"]["city"], "Dubai");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(401)
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let mut model = model_for(&server);
        let (schema, message, history) = prompt();
        let err = model
            .extract(&schema, message, &history, 0.0, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Authentication(ref body) if body.contains("invalid x-api-key")));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_overloaded_maps_to_transient_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(529)
            .with_body(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
            .create_async()
            .await;

        let mut model = model_for(&server);
        let (schema, message, history) = prompt();
        let err = model
            .extract(&schema, message, &history, 0.0, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::ProviderError(529, _)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_missing_tool_call_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                json!({
                    "content": [{"type": "text", "text": "I cannot help with that."}],
                    "stop_reason": "end_turn",
                    "usage": {"input_tokens": 10, "output_tokens": 7}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut model = model_for(&server);
        let (schema, message, history) = prompt();
        let err = model
            .extract(&schema, message, &history, 0.0, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::ParseError(ref msg) if msg.contains("end_turn")));
    }

    #[tokio::test]
    async fn test_client_decodes_mocked_answer() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(tool_use_body(DUBAI_ARGS))
            .create_async()
            .await;

        let mut client = model_for(&server).build_client("Extract the order.");
        let result: TextExtraction = client
            .prompt("Two large Hawaiian pizzas to Al Wasl Road, Dubai")
            .extract()
            .await
            .unwrap();
        assert_eq!(result.name, "Aisha Al-Mansoori");
        assert_eq!(result.order.total_quantity(), 2);
        assert_eq!(result.address.locator, Locator::Known(1_234_567_890));
        assert_eq!(client.token_usage().total_tokens, Some(200));
    }

    #[tokio::test]
    #[ignore = "needs ANTHROPIC_API_KEY and network access"]
    async fn test_live_extraction() {
        let mut client = AnthropicCompletionModel::new(None)
            .unwrap()
            .build_client(EXTRACTION_PREAMBLE);
        let result: TextExtraction = client
            .prompt("Hi, this is Jason. Five large pepperoni pizzas to 123 Main St, Apt 4B, New York, NY 10001 on July 4th, 2024 at 4:00 PM.")
            .extract()
            .await
            .unwrap();
        assert_eq!(result.order.total_quantity(), 5);
    }
}
