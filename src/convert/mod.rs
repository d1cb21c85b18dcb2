//! Bidirectional protocol conversion between the OpenAI chat-completions
//! surface and the internal Gemini request/response shapes.

mod names;
mod request;
mod response;
mod schema;
mod stream;
mod thinking;

pub use names::{MAX_TOOL_NAME_LEN, sanitize_tool_name};
pub use request::{is_image_model, openai_to_internal};
pub use response::{
    ResponseContext, internal_to_openai, map_finish_reason, models_to_openai, new_completion_id,
};
pub use schema::{clean_tool_schema, validate_tool_schema};
pub use stream::{pump_passthrough_sse, pump_sse};
pub(crate) use stream::{SSE_DONE, SSE_HEARTBEAT, sse_data, sse_error_chunk, unwrap_response_value};
pub use thinking::{resolve_thinking_budget, thinking_enabled};

use vega_thoughtsig::{SignatureCache, ToolNameCache};

/// The process-local scratchpads shared by both conversion directions.
#[derive(Default)]
pub struct ScratchCaches {
    pub signatures: SignatureCache,
    pub tool_names: ToolNameCache,
}
