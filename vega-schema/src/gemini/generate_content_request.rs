//! Typed Gemini request schema for generate-content endpoints.
//!
//! The converter builds these structs instead of assembling raw
//! `serde_json::Value` trees. This gives us:
//! - Compile-time access to the fields the conversion rules touch.
//! - Forward compatibility via `extra` catch-all maps at every level.
//! - Validation-friendly request shape (e.g. required `contents`).

mod content;
mod generation;
mod system_instruction;
mod tool;
mod tool_config;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use content::{Content, FileData, FunctionCall, FunctionResponse, InlineData, Part};
pub use generation::{GenerationConfig, ThinkingConfig};
use system_instruction::deserialize_system_instruction;
pub use tool::{FunctionDeclaration, Tool};
pub use tool_config::{FunctionCallingConfig, ToolConfig};

/// Gemini `generateContent` / `streamGenerateContent` request body.
///
/// Reference: <https://ai.google.dev/gemini-api/docs/text-generation>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Required conversation turns.
    pub contents: Vec<Content>,

    /// Scopes the upstream's stateful thinking/tool protocol; generated per
    /// project at load time, never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// System-level instruction. Structured identically to a `Content` but
    /// typically contains only a single text part with no `role`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_system_instruction"
    )]
    pub system_instruction: Option<Content>,

    /// Generation parameters (temperature, topP, maxOutputTokens, …).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,

    /// Tool declarations (function calling).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,

    /// Tool-calling configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,

    /// Catch-all for future/optional unknown fields, including
    /// `safetySettings` and `cachedContent`.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}
