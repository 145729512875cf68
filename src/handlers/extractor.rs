//! JSON extractor with bridge-formatted rejections
//!
//! Wraps Axum's `Json` so a malformed or invalid body comes back as
//! `{"error": "..."}` like every other bridge error.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Status codes by rejection kind:
/// - JSON syntax errors → 400 Bad Request
/// - Validation errors (including request invariants) → 422 Unprocessable Entity
/// - Missing content type → 415 Unsupported Media Type
pub struct BridgeJsonRejection(JsonRejection);

impl IntoResponse for BridgeJsonRejection {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            JsonRejection::JsonSyntaxError(_) => (StatusCode::BAD_REQUEST, self.0.body_text()),
            JsonRejection::JsonDataError(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.body_text())
            }
            JsonRejection::MissingJsonContentType(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Content-Type must be application/json".to_string(),
            ),
            _ => (StatusCode::BAD_REQUEST, self.0.body_text()),
        };
        tracing::debug!(status = status.as_u16(), error = %message, "Rejected request body");
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub struct BridgeJson<T>(pub T);

impl<S, T> FromRequest<S> for BridgeJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = BridgeJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(BridgeJson(value)),
            Err(rejection) => Err(BridgeJsonRejection(rejection)),
        }
    }
}
