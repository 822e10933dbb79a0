use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    /// The app started without a usable configuration.
    Unavailable(String),
    /// Another turn is streaming.
    Busy,
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message)
            }
            AppError::Busy => (
                StatusCode::CONFLICT,
                "BUSY",
                "A response is still streaming".to_string(),
            ),
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            }
        };

        let body = json!({ "error": { "code": code, "message": message } });
        (status, Json(body)).into_response()
    }
}
