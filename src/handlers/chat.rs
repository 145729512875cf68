//! Chat-completion endpoint
//!
//! Handles POST /v1/chat/completions. The provider's (or committee
//! winner's) status and body are passed through unchanged.

use crate::error::AppError;
use crate::handlers::AppState;
use crate::handlers::extractor::BridgeJson;
use crate::middleware::RequestId;
use crate::models::CompletionRequest;
use crate::router::RoutedResponse;
use axum::{
    Extension,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

pub const PROVIDER_HEADER: &str = "x-bridge-provider";
pub const SOURCE_HEADER: &str = "x-bridge-source";
pub const TASK_TYPE_HEADER: &str = "x-bridge-task-type";

pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    BridgeJson(request): BridgeJson<CompletionRequest>,
) -> Result<Response, AppError> {
    tracing::debug!(
        request_id = %request_id,
        messages = request.messages().len(),
        task_id = ?request.task_id(),
        "Received chat-completion request"
    );

    let routed = state.router().route(&request, request_id).await?;
    Ok(passthrough(routed))
}

/// Turn a routed response into the HTTP response, body untouched
pub(crate) fn passthrough(routed: RoutedResponse) -> Response {
    let status = StatusCode::from_u16(routed.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, routed.body).into_response();

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        SOURCE_HEADER,
        HeaderValue::from_static(routed.source.as_str()),
    );
    if let Some(provider) = &routed.provider
        && let Ok(value) = HeaderValue::from_str(provider.as_str())
    {
        headers.insert(PROVIDER_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(routed.category.as_str()) {
        headers.insert(TASK_TYPE_HEADER, value);
    }

    response
}
