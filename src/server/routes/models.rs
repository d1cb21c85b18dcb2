//! OpenAI-compatible `GET /v1/models`, backed by the upstream catalog.

use crate::convert::models_to_openai;
use crate::error::GatewayError;
use crate::server::router::GatewayState;
use axum::{Json, extract::State};
use vega_schema::openai::OpenaiModelList;

pub async fn list_models(
    State(state): State<GatewayState>,
) -> Result<Json<OpenaiModelList>, GatewayError> {
    let lease = state.manager.pick_next().await?;
    let catalog = state.upstream.fetch_models(&state.manager, &lease).await?;
    Ok(Json(models_to_openai(&catalog)))
}
