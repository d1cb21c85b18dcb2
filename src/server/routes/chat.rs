//! OpenAI-compatible `POST /v1/chat/completions`.

use super::respond::{chat_stream_response, image_stream_response};
use crate::convert::{ResponseContext, internal_to_openai, openai_to_internal};
use crate::error::GatewayError;
use crate::server::router::GatewayState;
use crate::utils::logging::with_pretty_json_debug;
use axum::{
    Json, RequestExt,
    extract::{FromRequest, Request, State},
    response::{IntoResponse, Response},
};
use tracing::debug;
use vega_schema::gemini::{GenerateContentResponse, MaybeWrapped};
use vega_schema::openai::ChatCompletionRequest;

pub struct OpenaiPreprocess(pub ChatCompletionRequest);

impl<S> FromRequest<S> for OpenaiPreprocess
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = req
            .extract::<Json<ChatCompletionRequest>, _>()
            .await
            .map_err(|rejection| GatewayError::bad_request(rejection.body_text()))?;
        Ok(OpenaiPreprocess(body))
    }
}

pub async fn chat_completions(
    State(state): State<GatewayState>,
    OpenaiPreprocess(req): OpenaiPreprocess,
) -> Result<Response, GatewayError> {
    let lease = state.manager.pick_next().await?;
    let (body, _url_suffix) =
        openai_to_internal(&req, &lease.project_id, &lease.session_id, &state.caches);

    with_pretty_json_debug(&body, |pretty_body| {
        debug!(
            req.model = %req.model,
            req.stream = req.stream,
            project = %lease.project_id,
            body = %pretty_body,
            "Prepared upstream payload"
        );
    });

    let ctx = ResponseContext {
        model: req.model.clone(),
        session_id: Some(lease.session_id.clone()),
        caches: state.caches.clone(),
        images: state.images.clone(),
    };

    if req.stream {
        // Image models are non-streaming upstream; the wrapper fakes the
        // stream with heartbeats.
        if body.is_image_gen() {
            return Ok(image_stream_response(state, lease, body, ctx));
        }
        return Ok(chat_stream_response(state, lease, body, ctx));
    }

    let resp = state
        .upstream
        .send_generate(&state.manager, &lease, &body, false)
        .await?;
    let parsed = resp
        .json::<MaybeWrapped<GenerateContentResponse>>()
        .await?
        .into_inner();
    let completion = internal_to_openai(&parsed, &ctx).await;
    Ok(Json(completion).into_response())
}
