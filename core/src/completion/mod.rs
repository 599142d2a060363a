use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    config::{ConfigurationError, RetryPolicy},
    validation::ValidationError,
};

pub mod extractor;

pub use extractor::{decode, Extractor, ExtractorSchema};

const DEFAULT_REPAIR_ATTEMPTS: usize = 2;
const REPAIR_INSTRUCTION: &str =
    "The previous answer was rejected. Fix every listed error and call the tool again.";

/// Message that'll be sent in Completions
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// System prompt
    Preamble(String),
    /// Message sent by the user
    User {
        content: String,
        tool_responses: Option<Vec<ToolResponse>>,
    },
    /// Response from the assistant
    Assistant {
        content: String,
        tool_calls: Option<Vec<ToolCall>>,
    },
}

/// Represents a tool call requested by the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Answer to a [`ToolCall`], `is_error` marks a rejected call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

pub type MessageHistory = Vec<Message>;

#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("Provider error -> HTTP Status {0}: {1}")]
    ProviderError(u16, String),
    #[error("Authentication rejected: {0}")]
    Authentication(String),
    #[error("RequestError: {0}")]
    RequestError(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("ParseError: {0}")]
    ParseError(String),
    #[error(transparent)]
    ExtractorError(#[from] ExtractionError),
}

impl CompletionError {
    /// Whether retrying the same request may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProviderError(status, _) => {
                matches!(status, 408 | 409 | 429 | 529) || (500..600).contains(status)
            }
            Self::RequestError(_) | Self::Timeout(_) => true,
            Self::Authentication(_) | Self::ParseError(_) | Self::ExtractorError(_) => false,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Input text is empty")]
    EmptyInput,
    #[error("Failed to build the schema for {0}: {1}")]
    Schema(String, String),
}

#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Build the model from an optional JSON config
    fn from_json_config(config: Option<&str>) -> Result<Self, ConfigurationError>
    where
        Self: Sized;

    /// Wrap the model in a [`Client`] with the provider's default parameters
    fn build_client(self, preamble: impl AsRef<str>) -> Client<Self>
    where
        Self: Sized;

    /// Ask the model to answer by filling in `schema`, returning the raw tool call
    async fn extract(
        &mut self,
        schema: &ExtractorSchema,
        message: Message,
        history: &MessageHistory,
        temperature: f64,
        max_tokens: usize,
    ) -> Result<(ToolCall, TokenUsage), CompletionError>;
}

pub struct Client<M: CompletionModel> {
    completion_model: Arc<RwLock<M>>,
    history: MessageHistory,

    // common prompt parameters
    temperature: f64,
    max_tokens: usize,
    retry_policy: RetryPolicy,
    repair_attempts: usize,

    token_usage: TokenUsage,
}

pub struct PromptBuilder<'a, M: CompletionModel> {
    prompt: String,
    client: &'a mut Client<M>,
    one_shot: (bool, Option<MessageHistory>),
}

impl<'a, M: CompletionModel> PromptBuilder<'a, M> {
    fn new(client: &'a mut Client<M>, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            client,
            one_shot: (false, None),
        }
    }

    /// Prompt the LLM with a custom history, and get a response.
    /// Without a custom history only the client's preamble is sent.
    /// Neither the prompt nor the response get stored in the client's history.
    #[must_use]
    pub fn one_shot(mut self, one_shot: bool, history: Option<MessageHistory>) -> Self {
        self.one_shot = (one_shot, history);
        self
    }

    /// Sends the prompt and decodes the answer into `T`.
    ///
    /// Answers that fail to decode or break `T`'s rules are sent back to the
    /// model with the errors, up to the client's repair budget.
    pub async fn extract<T: Extractor>(self) -> Result<T, crate::error::Error> {
        if self.prompt.trim().is_empty() {
            return Err(CompletionError::from(ExtractionError::EmptyInput).into());
        }
        let schema = ExtractorSchema::for_type::<T>().map_err(|e| {
            CompletionError::from(ExtractionError::Schema(
                std::any::type_name::<T>().to_string(),
                e.to_string(),
            ))
        })?;

        let (one_shot, custom_history) = self.one_shot;
        let mut history = match (one_shot, custom_history) {
            (true, Some(history)) => history,
            (true, None) => self
                .client
                .history
                .iter()
                .filter(|m| matches!(m, Message::Preamble(_)))
                .cloned()
                .collect(),
            (false, _) => self.client.history.clone(),
        };
        let prompt = Message::User {
            content: self.prompt.clone(),
            tool_responses: None,
        };
        let mut message = prompt.clone();

        let attempts = self.client.repair_attempts + 1;
        let mut last_error = None;
        for attempt in 1..=attempts {
            let call = self
                .client
                .request_extraction(&schema, message.clone(), &history)
                .await?;

            match decode::<T>(&call.arguments) {
                Ok(value) => {
                    info!(
                        extractor_type = std::any::type_name::<T>(),
                        attempt, "Successfully extracted data"
                    );
                    if !one_shot {
                        self.client.history.push(prompt);
                        self.client.history.push(Message::Assistant {
                            content: String::new(),
                            tool_calls: Some(vec![call]),
                        });
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Extraction rejected, asking the model to repair it");
                    history.push(message);
                    history.push(Message::Assistant {
                        content: String::new(),
                        tool_calls: Some(vec![call.clone()]),
                    });
                    message = Message::User {
                        content: REPAIR_INSTRUCTION.to_string(),
                        tool_responses: Some(vec![ToolResponse {
                            id: call.id,
                            name: call.name,
                            content: e.to_string(),
                            is_error: true,
                        }]),
                    };
                    last_error = Some(e);
                }
            }
        }

        Err(ValidationError::RepairBudgetExhausted {
            attempts,
            last: Box::new(last_error.unwrap_or_else(|| {
                ValidationError::Malformed("no answer was received".to_string())
            })),
        }
        .into())
    }
}

impl<M: CompletionModel> Client<M> {
    pub fn new(
        completion_model: M,
        preamble: impl AsRef<str>,
        temperature: f64,
        max_tokens: usize,
    ) -> Self {
        Self {
            completion_model: Arc::new(RwLock::new(completion_model)),
            history: vec![Message::Preamble(String::from(preamble.as_ref()))],
            temperature,
            max_tokens,
            retry_policy: RetryPolicy::default(),
            repair_attempts: DEFAULT_REPAIR_ATTEMPTS,
            token_usage: TokenUsage::default(),
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// How many times a rejected answer is sent back for repair
    #[must_use]
    pub fn with_repair_attempts(mut self, attempts: usize) -> Self {
        self.repair_attempts = attempts;
        self
    }

    /// Clear conversation history while maintaining premble
    pub fn clear_history(&mut self) {
        self.history.retain(|m| matches!(m, Message::Preamble(_)));
    }

    pub fn load_history(&mut self, history: MessageHistory) {
        self.history = history;
    }

    #[must_use]
    pub fn export_history(&self) -> &MessageHistory {
        &self.history
    }

    pub fn append_history(&mut self, messages: &[Message]) {
        messages.iter().for_each(|m| self.history.push(m.clone()));
    }

    #[must_use]
    pub fn token_usage(&self) -> &TokenUsage {
        &self.token_usage
    }

    /// Creates a `PromptBuilder` instance .
    pub fn prompt(&mut self, prompt: impl Into<String>) -> PromptBuilder<'_, M> {
        PromptBuilder::new(self, prompt)
    }

    fn update_token_usage(&mut self, usage: &TokenUsage) {
        self.token_usage.prompt_tokens =
            combine_options(self.token_usage.prompt_tokens, usage.prompt_tokens);
        self.token_usage.completion_tokens =
            combine_options(self.token_usage.completion_tokens, usage.completion_tokens);
        self.token_usage.total_tokens =
            combine_options(self.token_usage.total_tokens, usage.total_tokens);
    }

    /// One extraction round trip, retrying transient provider failures
    async fn request_extraction(
        &mut self,
        schema: &ExtractorSchema,
        message: Message,
        history: &MessageHistory,
    ) -> Result<ToolCall, CompletionError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = {
                let mut guard = self.completion_model.write().await;
                guard
                    .extract(
                        schema,
                        message.clone(),
                        history,
                        self.temperature,
                        self.max_tokens,
                    )
                    .await
            };
            match result {
                Ok((call, usage)) => {
                    self.update_token_usage(&usage);
                    if usage.total_tokens.is_some() {
                        info!(
                            "Prompt used up: {:?} tokens, Total tokens used: {:?}",
                            usage.total_tokens, self.token_usage.total_tokens
                        );
                    }
                    return Ok(call);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry_policy.backoff(attempt);
                    warn!(attempt, ?delay, error = %e, "Transient provider failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn combine_options(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a_val), Some(b_val)) => Some(a_val + b_val),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}
