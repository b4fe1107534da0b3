use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                internal()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                internal()
            }
            AppError::Io(e) => {
                tracing::error!("Storage I/O error: {}", e);
                internal()
            }
            AppError::Archive(e) => {
                tracing::error!("Archive error: {}", e);
                internal()
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                internal()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                internal()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn response_status(err: AppError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(
            response_status(AppError::NotFound("Campaign")),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unauthorized_returns_401() {
        assert_eq!(
            response_status(AppError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn bad_request_returns_400() {
        assert_eq!(
            response_status(AppError::BadRequest("oops".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn too_large_returns_413() {
        assert_eq!(
            response_status(AppError::PayloadTooLarge("big".into())),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn storage_failures_return_500() {
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            response_status(AppError::Io(io)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn storage_failure_body_is_opaque() {
        let response = AppError::Internal("disk on fire at /var/x".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }
}
