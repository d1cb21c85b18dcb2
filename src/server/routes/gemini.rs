//! Native Gemini passthrough: `POST /v1[beta]/models/{model}:generateContent`
//! and `:streamGenerateContent`.
//!
//! No OpenAI conversion happens here; the client body is wrapped into the
//! upstream envelope and the reply is returned raw, except that the
//! `{"response": ...}` wrapper is unwrapped per chunk and per body.

use super::respond::sse_response;
use crate::convert::{pump_passthrough_sse, unwrap_response_value};
use crate::error::GatewayError;
use crate::server::router::GatewayState;
use axum::{
    Json, RequestExt,
    extract::{FromRequest, Path, Request, State},
    response::{IntoResponse, Response},
};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;
use vega_schema::antigravity::AntigravityRequestBody;
use vega_schema::gemini::GeminiRequest;

const PASSTHROUGH_TIMEOUT: Duration = Duration::from_secs(120);

pub struct GeminiPreprocess {
    pub model: String,
    pub stream: bool,
    pub body: Value,
}

impl<S> FromRequest<S> for GeminiPreprocess
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(mut req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let Path(path) = req
            .extract_parts::<Path<String>>()
            .await
            .map_err(|rejection| GatewayError::bad_request(rejection.to_string()))?;

        // The wildcard tail is `<model>:<rpc>`.
        let last_seg = path
            .split('/')
            .next_back()
            .ok_or_else(|| GatewayError::bad_request("model not found in path"))?;
        let (model, rpc) = last_seg
            .split_once(':')
            .ok_or_else(|| GatewayError::bad_request("missing rpc suffix in path"))?;
        let stream = match rpc {
            "generateContent" => false,
            "streamGenerateContent" => true,
            other => {
                return Err(GatewayError::bad_request(format!(
                    "unsupported rpc: {other}"
                )));
            }
        };

        let Json(body) = req
            .extract::<Json<Value>, _>()
            .await
            .map_err(|rejection| GatewayError::bad_request(rejection.body_text()))?;

        Ok(GeminiPreprocess {
            model: model.to_string(),
            stream,
            body,
        })
    }
}

pub async fn gemini_proxy(
    State(state): State<GatewayState>,
    GeminiPreprocess {
        model,
        stream,
        body,
    }: GeminiPreprocess,
) -> Result<Response, GatewayError> {
    let lease = state.manager.pick_next().await?;
    let envelope = build_passthrough_envelope(&model, body, &lease.project_id)?;

    let url = state.upstream.endpoints().select(stream);
    let resp = state
        .upstream
        .post_with_auth_retry(
            &state.manager,
            &lease.project_id,
            url,
            &envelope,
            PASSTHROUGH_TIMEOUT,
        )
        .await?;

    if stream {
        let (tx, rx) = mpsc::channel::<String>(16);
        tokio::spawn(async move {
            let payloads = resp
                .bytes_stream()
                .eventsource()
                .map(|item| item.map(|event| event.data));
            pump_passthrough_sse(payloads, tx).await;
        });
        return Ok(sse_response(rx));
    }

    let value = resp.json::<Value>().await?;
    Ok(Json(unwrap_response_value(value)).into_response())
}

fn build_passthrough_envelope(
    model: &str,
    mut body: Value,
    project_id: &str,
) -> Result<AntigravityRequestBody, GatewayError> {
    let map = body
        .as_object_mut()
        .ok_or_else(|| GatewayError::bad_request("request body must be a JSON object"))?;

    map.remove("model");
    let request_id = map
        .remove("requestId")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("agent-{}", Uuid::new_v4()));
    let user_agent = map
        .remove("userAgent")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| AntigravityRequestBody::USER_AGENT.to_string());
    map.entry("contents").or_insert_with(|| json!([]));

    let request: GeminiRequest = serde_json::from_value(body)
        .map_err(|err| GatewayError::bad_request(format!("Request build failed: {err}")))?;

    Ok(AntigravityRequestBody {
        project: project_id.to_string(),
        request_id,
        request,
        model: model.to_string(),
        user_agent,
        request_type: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wraps_body_minus_model() {
        let body = json!({
            "model": "ignored",
            "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
            "generationConfig": {"temperature": 0.5}
        });

        let envelope = build_passthrough_envelope("gemini-2.5-flash", body, "proj-9").unwrap();
        assert_eq!(envelope.project, "proj-9");
        assert_eq!(envelope.model, "gemini-2.5-flash");
        assert_eq!(envelope.user_agent, "antigravity");
        assert!(envelope.request_id.starts_with("agent-"));
        assert!(envelope.request_type.is_none());

        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value["request"].get("model").is_none());
        assert_eq!(value["request"]["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn client_request_id_and_user_agent_win() {
        let body = json!({
            "contents": [],
            "requestId": "agent-custom",
            "userAgent": "my-agent"
        });

        let envelope = build_passthrough_envelope("m", body, "p").unwrap();
        assert_eq!(envelope.request_id, "agent-custom");
        assert_eq!(envelope.user_agent, "my-agent");
    }

    #[test]
    fn missing_contents_is_defaulted() {
        let envelope = build_passthrough_envelope("m", json!({}), "p").unwrap();
        assert!(envelope.request.contents.is_empty());
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(build_passthrough_envelope("m", json!([1, 2]), "p").is_err());
    }
}
