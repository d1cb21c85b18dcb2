mod chat_request;
mod chat_response;
mod model_list;

pub use chat_request::{
    ChatCompletionRequest, ChatMessage, ContentPart, FunctionDefinition, ImageUrl, MessageContent,
    RequestToolCall, ResponseFormat, StopSequences, ToolCallFunction, ToolDefinition,
};
pub use chat_response::{
    AssistantMessage, ChatChoice, ChatCompletion, ChatCompletionChunk, ChunkChoice, Delta,
    ToolCall, ToolCallPayload, Usage,
};
pub use model_list::{OpenaiModel, OpenaiModelList};
