//! SSE response builders for the chat surface.

use crate::convert::{
    ResponseContext, SSE_DONE, SSE_HEARTBEAT, internal_to_openai, pump_sse, sse_data,
    sse_error_chunk,
};
use crate::error::GatewayError;
use crate::pool::ProjectLease;
use crate::server::router::GatewayState;
use axum::{
    body::Body,
    http::header,
    response::Response,
};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::error;
use vega_schema::antigravity::AntigravityRequestBody;
use vega_schema::gemini::{GenerateContentResponse, MaybeWrapped};
use vega_schema::openai::{
    ChatCompletion, ChatCompletionChunk, ChunkChoice, Delta,
};

/// Wrap a channel of pre-framed SSE strings into a streaming response.
pub(crate) fn sse_response(rx: mpsc::Receiver<String>) -> Response {
    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .expect("static response parts must be valid")
}

fn stream_error_detail(err: &GatewayError) -> String {
    match err {
        GatewayError::UpstreamStatus { status, body } => {
            format!("Upstream error {status}: {body}")
        }
        other => other.to_string(),
    }
}

/// Regular streaming completion: upstream SSE transcoded chunk by chunk.
pub(crate) fn chat_stream_response(
    state: GatewayState,
    lease: ProjectLease,
    body: AntigravityRequestBody,
    ctx: ResponseContext,
) -> Response {
    let (tx, rx) = mpsc::channel::<String>(16);

    tokio::spawn(async move {
        match state
            .upstream
            .send_generate(&state.manager, &lease, &body, true)
            .await
        {
            Ok(resp) => {
                let payloads = resp
                    .bytes_stream()
                    .eventsource()
                    .map(|item| item.map(|event| event.data));
                pump_sse(payloads, tx, &ctx).await;
            }
            Err(err) => {
                error!("Streaming request failed before first byte: {err}");
                let _ = tx.send(sse_error_chunk(&stream_error_detail(&err))).await;
                let _ = tx.send(SSE_DONE.to_string()).await;
            }
        }
    });

    sse_response(rx)
}

/// Image-model stream wrapper: the upstream call is non-streaming, so run
/// it in a background task and pump comment heartbeats until it completes.
/// Heartbeats share the bounded channel with real chunks, so a slow client
/// applies backpressure instead of accumulating frames.
pub(crate) fn image_stream_response(
    state: GatewayState,
    lease: ProjectLease,
    body: AntigravityRequestBody,
    ctx: ResponseContext,
) -> Response {
    let (tx, rx) = mpsc::channel::<String>(4);
    let heartbeat = state.heartbeat;
    let model = ctx.model.clone();

    tokio::spawn(async move {
        let mut task = tokio::spawn(async move {
            let resp = state
                .upstream
                .send_generate(&state.manager, &lease, &body, false)
                .await?;
            let parsed = resp
                .json::<MaybeWrapped<GenerateContentResponse>>()
                .await
                .map_err(GatewayError::from)?
                .into_inner();
            Ok::<_, GatewayError>(internal_to_openai(&parsed, &ctx).await)
        });

        loop {
            tokio::select! {
                result = &mut task => {
                    match result {
                        Ok(Ok(completion)) => {
                            send_image_chunks(&tx, &model, completion).await;
                        }
                        Ok(Err(err)) => {
                            let _ = tx.send(sse_error_chunk(&stream_error_detail(&err))).await;
                            let _ = tx.send(SSE_DONE.to_string()).await;
                        }
                        Err(join_err) => {
                            error!("Image generation task failed: {join_err}");
                            let _ = tx.send(sse_error_chunk("image generation task failed")).await;
                            let _ = tx.send(SSE_DONE.to_string()).await;
                        }
                    }
                    return;
                }
                () = tokio::time::sleep(heartbeat) => {
                    if tx.send(SSE_HEARTBEAT.to_string()).await.is_err() {
                        // Client disconnected: cancel the upstream call and
                        // reap the task, suppressing its outcome.
                        task.abort();
                        let _ = task.await;
                        return;
                    }
                }
            }
        }
    });

    sse_response(rx)
}

/// One content-bearing chunk, one finish chunk (with usage), then `[DONE]`.
async fn send_image_chunks(tx: &mpsc::Sender<String>, model: &str, completion: ChatCompletion) {
    let (content, finish_reason) = completion
        .choices
        .first()
        .map(|choice| {
            (
                choice.message.content.clone().unwrap_or_default(),
                choice.finish_reason.clone(),
            )
        })
        .unwrap_or_else(|| (String::new(), "stop".to_string()));

    let content_chunk = ChatCompletionChunk {
        id: completion.id.clone(),
        object: ChatCompletionChunk::OBJECT.to_string(),
        created: completion.created,
        model: model.to_string(),
        choices: vec![ChunkChoice {
            index: 0,
            delta: Delta {
                content: Some(content),
                ..Delta::default()
            },
            finish_reason: None,
        }],
        usage: None,
    };
    if tx.send(sse_data(&content_chunk)).await.is_err() {
        return;
    }

    let finish_chunk = ChatCompletionChunk {
        id: completion.id,
        object: ChatCompletionChunk::OBJECT.to_string(),
        created: completion.created,
        model: model.to_string(),
        choices: vec![ChunkChoice {
            index: 0,
            delta: Delta::default(),
            finish_reason: Some(finish_reason),
        }],
        usage: Some(completion.usage),
    };
    if tx.send(sse_data(&finish_chunk)).await.is_err() {
        return;
    }
    let _ = tx.send(SSE_DONE.to_string()).await;
}
