mod generate_content_request;
mod model_list;
mod response;

pub use generate_content_request::GeminiRequest;
pub use generate_content_request::{
    Content, FileData, FunctionCall, FunctionCallingConfig, FunctionDeclaration, FunctionResponse,
    GenerationConfig, InlineData, Part, ThinkingConfig, Tool, ToolConfig,
};
pub use model_list::{FetchModelsRequest, FetchModelsResponse};
pub use response::{Candidate, GenerateContentResponse, MaybeWrapped, UsageMetadata};
