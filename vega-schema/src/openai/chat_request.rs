//! OpenAI chat-completions request schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// OpenAI request body for `POST /v1/chat/completions`.
///
/// Schema reference:
/// <https://platform.openai.com/docs/api-reference/chat/create>
///
/// Notes:
/// - `model` falls back to a Gemini default instead of being rejected; the
///   upstream validates model names, the gateway does not.
/// - `extra` collects unknown/new fields so deserialization doesn't break
///   when OpenAI extends the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// OpenAI docs: `string`, required. Defaulted here for resilience.
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI docs: `array`, required.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,

    /// OpenAI docs: `boolean`, optional, default `false`.
    #[serde(default)]
    pub stream: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Not part of the official OpenAI schema but accepted by many
    /// Gemini-flavored clients; forwarded as `topK`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,

    /// Candidate count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,

    /// A single stop string or a list of them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    /// Accepted for wire compatibility; the upstream tool-calling mode is
    /// always `VALIDATED`, so this field is not consulted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,

    /// `low` | `medium` | `high`; mapped onto a thinking budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,

    /// Explicit thinking budget override; wins over `reasoning_effort`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<i64>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

/// One conversation message as sent by an OpenAI client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,

    /// `string`, content-part array, or absent (tool-call-only turns).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,

    /// Tool name on `tool` role messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<RequestToolCall>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Reasoning text previously emitted by the gateway and echoed back by
    /// the client on multi-turn thinking conversations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,

    /// Opaque reasoning signature previously emitted by the gateway.
    #[serde(
        alias = "thoughtSignature",
        skip_serializing_if = "Option::is_none"
    )]
    pub thought_signature: Option<String>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// `content` is either a bare string or an array of typed parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
    /// Anything else (objects, numbers); normalized downstream.
    Other(Value),
}

/// One multimodal content part (`{"type": "text" | "image_url", ...}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Usually a string; some clients send `{ "text": ... }` or
    /// `{ "value": ... }` wrappers, so this stays a raw value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    #[serde(default)]
    pub url: String,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A tool call echoed back on an assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub function: ToolCallFunction,

    #[serde(
        alias = "thoughtSignature",
        skip_serializing_if = "Option::is_none"
    )]
    pub thought_signature: Option<String>,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallFunction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// JSON-encoded string in well-formed requests, but clients also send
    /// plain objects; both are accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// `stop` accepts a bare string or a list of strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

impl StopSequences {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StopSequences::One(s) => vec![s],
            StopSequences::Many(v) => v,
        }
    }
}

/// `tools[]` entry: `{"type": "function", "function": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub function: FunctionDefinition,

    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionDefinition {
    #[serde(default)]
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON-Schema parameters, kept raw for cleanup/validation downstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}
