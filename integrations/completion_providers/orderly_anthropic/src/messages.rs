use orderly::completion::{Message, ToolCall, ToolResponse, TokenUsage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "role", content = "content")]
#[allow(non_camel_case_types)]
pub(crate) enum AnthropicMessage {
    user(Vec<ContentBlock>),
    assistant(Vec<ContentBlock>),
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        signature: String,
    },
    RedactedThinking {
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Unknown,
}

impl From<ToolCall> for ContentBlock {
    fn from(call: ToolCall) -> Self {
        // the API only accepts objects as tool input
        let input = serde_json::from_str::<Value>(&call.arguments)
            .ok()
            .filter(Value::is_object)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        Self::ToolUse {
            id: call.id,
            name: call.name,
            input,
        }
    }
}

impl From<ToolResponse> for ContentBlock {
    fn from(response: ToolResponse) -> Self {
        Self::ToolResult {
            tool_use_id: response.id,
            content: response.content,
            is_error: response.is_error,
        }
    }
}

/// Converts the crate's messages, the preamble goes to the `system` field instead
pub(crate) fn convert_history(messages: Vec<Message>) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system = None;
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        match message {
            Message::Preamble(preamble) => system = Some(preamble),
            Message::User {
                content,
                tool_responses,
            } => {
                // tool results must lead the user turn
                let mut blocks: Vec<ContentBlock> = tool_responses
                    .into_iter()
                    .flatten()
                    .map(ContentBlock::from)
                    .collect();
                if !content.is_empty() {
                    blocks.push(ContentBlock::Text { text: content });
                }
                out.push(AnthropicMessage::user(blocks));
            }
            Message::Assistant {
                content,
                tool_calls,
            } => {
                let mut blocks = Vec::new();
                if !content.is_empty() {
                    blocks.push(ContentBlock::Text { text: content });
                }
                blocks.extend(tool_calls.into_iter().flatten().map(ContentBlock::from));
                out.push(AnthropicMessage::assistant(blocks));
            }
        }
    }
    (system.filter(|s| !s.is_empty()), out)
}

#[derive(Deserialize, Debug)]
pub(crate) struct MessagesResponse {
    pub(crate) content: Vec<ContentBlock>,
    #[serde(default)]
    pub(crate) stop_reason: Option<String>,
    pub(crate) usage: Usage,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub(crate) struct Usage {
    pub(crate) input_tokens: u64,
    pub(crate) output_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: Some(usage.input_tokens),
            completion_tokens: Some(usage.output_tokens),
            total_tokens: Some(usage.input_tokens + usage.output_tokens),
        }
    }
}

impl MessagesResponse {
    /// First `tool_use` block calling `tool_name`
    pub(crate) fn tool_call(&self, tool_name: &str) -> Option<ToolCall> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } if name == tool_name => Some(ToolCall {
                id: id.clone(),
                name: name.clone(),
                arguments: input.to_string(),
            }),
            _ => None,
        })
    }

    pub(crate) fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}
