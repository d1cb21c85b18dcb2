//! Line-oriented SSE transcoding.
//!
//! The pumps consume upstream SSE payloads (already stripped of the
//! `data:` framing by the eventsource decoder) and push terminated SSE
//! strings into a bounded channel. The channel is the backpressure boundary:
//! a slow client slows the pump, and a dropped receiver stops it.

use crate::convert::response::PartAccumulator;
use crate::convert::{ResponseContext, map_finish_reason, new_completion_id};
use chrono::Utc;
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{error, warn};
use vega_schema::gemini::{GenerateContentResponse, MaybeWrapped};
use vega_schema::openai::{ChatCompletionChunk, ChunkChoice, Usage};

pub(crate) const SSE_DONE: &str = "data: [DONE]\n\n";
pub(crate) const SSE_HEARTBEAT: &str = ": heartbeat\n\n";

pub(crate) fn sse_data<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => format!("data: {json}\n\n"),
        Err(err) => {
            error!("Failed to serialize SSE payload: {err}");
            format!("data: {}\n\n", json!({"error": "serialization failure"}))
        }
    }
}

pub(crate) fn sse_error_chunk(detail: &str) -> String {
    sse_data(&json!({"error": detail}))
}

/// Transcode an upstream Gemini SSE stream into OpenAI chat-completion
/// chunks, ending with `data: [DONE]`.
///
/// Invalid JSON payloads are logged and skipped; a transport error mid-pump
/// becomes an error chunk so the client always sees a terminator. Events
/// are emitted strictly in upstream order.
pub async fn pump_sse<S, E>(payloads: S, tx: mpsc::Sender<String>, ctx: &ResponseContext)
where
    S: Stream<Item = Result<String, E>>,
    E: std::fmt::Display,
{
    let mut payloads = std::pin::pin!(payloads);
    let id = new_completion_id();
    let created = Utc::now().timestamp();
    let mut finish_reason: Option<String> = None;
    let mut usage: Option<Usage> = None;

    while let Some(item) = payloads.next().await {
        let data = match item {
            Ok(data) => data,
            Err(err) => {
                error!("Upstream SSE stream failed: {err}");
                let _ = tx.send(sse_error_chunk(&format!("Stream error: {err}"))).await;
                let _ = tx.send(SSE_DONE.to_string()).await;
                return;
            }
        };

        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            continue;
        }

        let resp = match serde_json::from_str::<MaybeWrapped<GenerateContentResponse>>(data) {
            Ok(parsed) => parsed.into_inner(),
            Err(err) => {
                warn!("Skipping invalid SSE JSON data ({err}): {:.80}", data);
                continue;
            }
        };

        if let Some(metadata) = resp.usage_metadata {
            usage = Some(Usage {
                prompt_tokens: metadata.prompt_token_count,
                completion_tokens: metadata.candidates_token_count,
                total_tokens: metadata.total_token_count,
            });
        }

        let Some(candidate) = resp.candidates.first() else {
            continue;
        };
        if let Some(reason) = candidate.finish_reason.as_deref() {
            finish_reason = Some(map_finish_reason(Some(reason)));
        }

        let mut acc = PartAccumulator::default();
        if let Some(content) = candidate.content.as_ref() {
            for part in &content.parts {
                acc.fold(part, ctx).await;
            }
        }

        let chunk = ChatCompletionChunk {
            id: id.clone(),
            object: ChatCompletionChunk::OBJECT.to_string(),
            created,
            model: ctx.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: acc.into_delta(ctx),
                finish_reason: finish_reason.clone(),
            }],
            usage: if finish_reason.is_some() { usage } else { None },
        };

        if tx.send(sse_data(&chunk)).await.is_err() {
            // Client went away; stop consuming upstream.
            return;
        }
    }

    let _ = tx.send(SSE_DONE.to_string()).await;
}

/// Forward a native Gemini SSE stream, unwrapping the `{"response": ...}`
/// envelope per chunk. No OpenAI conversion is applied.
pub async fn pump_passthrough_sse<S, E>(payloads: S, tx: mpsc::Sender<String>)
where
    S: Stream<Item = Result<String, E>>,
    E: std::fmt::Display,
{
    let mut payloads = std::pin::pin!(payloads);
    while let Some(item) = payloads.next().await {
        let data = match item {
            Ok(data) => data,
            Err(err) => {
                error!("Upstream SSE stream failed: {err}");
                let _ = tx.send(sse_error_chunk(&format!("Stream error: {err}"))).await;
                return;
            }
        };

        let data = data.trim();
        if data.is_empty() {
            continue;
        }
        if data == "[DONE]" {
            if tx.send(SSE_DONE.to_string()).await.is_err() {
                return;
            }
            continue;
        }

        let line = match serde_json::from_str::<Value>(data) {
            Ok(value) => sse_data(&unwrap_response_value(value)),
            // Not JSON: forward the raw payload untouched.
            Err(_) => format!("data: {data}\n\n"),
        };
        if tx.send(line).await.is_err() {
            return;
        }
    }
}

pub(crate) fn unwrap_response_value(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("response").is_some_and(Value::is_object) => {
            map.remove("response").expect("checked above")
        }
        other => other,
    }
}
