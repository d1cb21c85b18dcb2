//! Internal Gemini response -> OpenAI chat completion.

use crate::convert::ScratchCaches;
use crate::images::ImageStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;
use vega_schema::gemini::{FetchModelsResponse, GenerateContentResponse, Part};
use vega_schema::openai::{
    AssistantMessage, ChatChoice, ChatCompletion, Delta, OpenaiModelList, ToolCall,
    ToolCallPayload, Usage,
};

/// Everything the response path needs to translate one upstream reply,
/// owned so it can cross task boundaries on stream paths.
#[derive(Clone)]
pub struct ResponseContext {
    pub model: String,
    pub session_id: Option<String>,
    pub caches: Arc<ScratchCaches>,
    pub images: Arc<ImageStore>,
}

impl ResponseContext {
    fn session(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

pub fn new_completion_id() -> String {
    format!("chatcmpl-{}", &Uuid::new_v4().simple().to_string()[..24])
}

fn new_call_id() -> String {
    format!("call_{}", &Uuid::new_v4().simple().to_string()[..24])
}

pub fn map_finish_reason(reason: Option<&str>) -> String {
    match reason {
        Some("MAX_TOKENS") => "length",
        Some("SAFETY" | "RECITATION") => "content_filter",
        // STOP, OTHER, and anything unrecognized all map to a plain stop.
        _ => "stop",
    }
    .to_string()
}

/// Accumulates the per-part conversion rules shared by the non-stream and
/// SSE paths.
#[derive(Default)]
pub(crate) struct PartAccumulator {
    content: String,
    reasoning: String,
    tool_calls: Vec<ToolCall>,
    reasoning_signature: Option<String>,
}

impl PartAccumulator {
    pub(crate) async fn fold(&mut self, part: &Part, ctx: &ResponseContext) {
        if part.thought == Some(true) {
            self.reasoning.push_str(part.text.as_deref().unwrap_or_default());
            if let Some(signature) = part.thought_signature.as_deref() {
                self.reasoning_signature = Some(signature.to_string());
            }
            return;
        }

        if let Some(function_call) = part.function_call.as_ref() {
            let signature = part
                .thought_signature
                .clone()
                .or_else(|| function_call.thought_signature.clone());
            if let Some(signature) = signature.as_deref() {
                ctx.caches
                    .signatures
                    .set_tool(ctx.session(), &ctx.model, signature);
            }

            let name = ctx
                .caches
                .tool_names
                .get(ctx.session(), &ctx.model, &function_call.name)
                .map_or_else(|| function_call.name.clone(), |orig| orig.to_string());

            self.tool_calls.push(ToolCall {
                index: None,
                id: function_call.id.clone().unwrap_or_else(new_call_id),
                kind: "function".to_string(),
                function: ToolCallPayload {
                    name,
                    arguments: if function_call.args.is_null() {
                        "{}".to_string()
                    } else {
                        function_call.args.to_string()
                    },
                },
                thought_signature: signature,
            });
            return;
        }

        if let Some(inline) = part.inline_data.as_ref() {
            match ctx
                .images
                .save_base64(&inline.data, Some(inline.mime_type.as_str()))
                .await
            {
                Ok(filename) => {
                    self.content
                        .push_str(&format!("![image]({})", ctx.images.public_url(&filename)));
                }
                Err(err) => warn!("Failed to persist inline image: {err}"),
            }
            if let Some(signature) = part.thought_signature.as_deref() {
                self.reasoning_signature = Some(signature.to_string());
            }
            return;
        }

        if let Some(signature) = part.thought_signature.as_deref() {
            self.reasoning_signature = Some(signature.to_string());
            // Signature-carrier parts hold no meaningful text of their own.
            if part.text.as_deref().is_none_or(|text| text.trim().is_empty()) {
                return;
            }
        }
        if let Some(text) = part.text.as_deref() {
            self.content.push_str(text);
        }
    }

    fn store_reasoning_signature(&self, ctx: &ResponseContext) {
        if let Some(signature) = self.reasoning_signature.as_deref() {
            ctx.caches
                .signatures
                .set_reasoning(ctx.session(), &ctx.model, signature);
        }
    }

    pub(crate) fn into_message(self, ctx: &ResponseContext) -> AssistantMessage {
        self.store_reasoning_signature(ctx);
        AssistantMessage {
            content: (!self.content.is_empty()).then_some(self.content),
            reasoning_content: (!self.reasoning.is_empty()).then_some(self.reasoning),
            tool_calls: (!self.tool_calls.is_empty()).then_some(self.tool_calls),
            thought_signature: self.reasoning_signature,
            ..AssistantMessage::assistant()
        }
    }

    pub(crate) fn into_delta(self, ctx: &ResponseContext) -> Delta {
        self.store_reasoning_signature(ctx);
        let tool_calls = (!self.tool_calls.is_empty()).then(|| {
            self.tool_calls
                .into_iter()
                .enumerate()
                .map(|(index, mut call)| {
                    call.index = Some(index as u32);
                    call
                })
                .collect()
        });
        Delta {
            content: (!self.content.is_empty()).then_some(self.content),
            reasoning_content: (!self.reasoning.is_empty()).then_some(self.reasoning),
            tool_calls,
            ..Delta::default()
        }
    }
}

/// Convert an unwrapped upstream response into an OpenAI chat completion.
pub async fn internal_to_openai(
    resp: &GenerateContentResponse,
    ctx: &ResponseContext,
) -> ChatCompletion {
    let mut choices = Vec::with_capacity(resp.candidates.len());
    for (index, candidate) in resp.candidates.iter().enumerate() {
        let mut acc = PartAccumulator::default();
        if let Some(content) = candidate.content.as_ref() {
            for part in &content.parts {
                acc.fold(part, ctx).await;
            }
        }

        choices.push(ChatChoice {
            index: index as u32,
            message: acc.into_message(ctx),
            finish_reason: map_finish_reason(candidate.finish_reason.as_deref()),
        });
    }

    let usage = resp.usage_metadata.unwrap_or_default();
    ChatCompletion {
        id: new_completion_id(),
        object: ChatCompletion::OBJECT.to_string(),
        created: Utc::now().timestamp(),
        model: ctx.model.clone(),
        choices,
        usage: Usage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        },
    }
}

/// Convert the upstream model catalog into the OpenAI list shape.
pub fn models_to_openai(resp: &FetchModelsResponse) -> OpenaiModelList {
    OpenaiModelList::from_model_ids(resp.models.keys().cloned(), Utc::now().timestamp())
}
