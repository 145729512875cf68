//! Anthropic passthrough endpoint
//!
//! POST /v1/anthropic/messages always goes to the designated provider, with
//! no classification, cache or committee.

use crate::error::AppError;
use crate::handlers::AppState;
use crate::handlers::chat::passthrough;
use crate::handlers::extractor::BridgeJson;
use crate::middleware::RequestId;
use crate::models::CompletionRequest;
use axum::{Extension, extract::State, response::Response};

pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    BridgeJson(request): BridgeJson<CompletionRequest>,
) -> Result<Response, AppError> {
    let routed = state.router().route_anthropic(&request, request_id).await?;
    Ok(passthrough(routed))
}
