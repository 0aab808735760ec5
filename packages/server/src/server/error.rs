//! HTTP error mapping for the goods API.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::domains::goods::GoodsError;

/// Numeric code clients match "not found" responses on.
const NOT_FOUND_CODE: i32 = 3;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed path, query or body parameter
    BadRequest(String),
    Goods(GoodsError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<GoodsError> for ApiError {
    fn from(err: GoodsError) -> Self {
        ApiError::Goods(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) | ApiError::Goods(GoodsError::Validation(message)) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Goods(GoodsError::NotFound) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "code": NOT_FOUND_CODE,
                    "message": "errors.common.notFound",
                    "details": {},
                })),
            )
                .into_response(),
            ApiError::Goods(GoodsError::Persistence(e)) => {
                error!(error = %e, "goods persistence failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
