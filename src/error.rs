use std::any::Any;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Failure kinds raised by request handlers and services.
///
/// Every variant maps to exactly one HTTP status and [`ErrorCode`], see
/// [`AppError::code`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Unexpected(#[from] anyhow::Error),
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Unexpected(anyhow::Error::new(err).context("database error"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Unexpected(anyhow::Error::new(err).context("database error"))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

/// Machine-readable code carried in every error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UserAlreadyExist,
    BadRequest,
    NotFound,
    Forbidden,
    InternalError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::UserAlreadyExist => StatusCode::CONFLICT,
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            ErrorCode::UserAlreadyExist => "Resource already exists",
            ErrorCode::BadRequest => "Bad Request",
            ErrorCode::NotFound => "Not Found",
            ErrorCode::Forbidden => "Forbidden",
            ErrorCode::InternalError => "Internal Server Error",
        }
    }
}

/// Wire shape of every failed request: `{ "code": ..., "message": ... }`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    /// Builds a payload, substituting the code's generic text for a blank message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            code.fallback_message().to_string()
        } else {
            message
        };
        Self { code, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), axum::Json(self)).into_response()
    }
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::AlreadyExists(_) => ErrorCode::UserAlreadyExist,
            AppError::InvalidArgument(_) | AppError::InvalidState(_) => ErrorCode::BadRequest,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::AccessDenied(_) => ErrorCode::Forbidden,
            AppError::Unexpected(_) => ErrorCode::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code().status()
    }

    pub fn to_api_error(&self) -> ApiError {
        ApiError::new(self.code(), self.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Unexpected(source) => {
                tracing::error!(error = ?source, "request failed");
            }
            other => {
                tracing::debug!(code = ?other.code(), error = %other, "request rejected");
            }
        }

        self.to_api_error().into_response()
    }
}

/// Last-resort handler for panics escaping a request handler.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "handler panicked");

    ApiError::new(ErrorCode::InternalError, "").into_response()
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::AlreadyExists("user exists".into()), StatusCode::CONFLICT, "USER_ALREADY_EXIST")]
    #[case(AppError::InvalidArgument("bad".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST")]
    #[case(AppError::InvalidState("cart is empty".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST")]
    #[case(AppError::NotFound("missing".into()), StatusCode::NOT_FOUND, "NOT_FOUND")]
    #[case(AppError::AccessDenied("nope".into()), StatusCode::FORBIDDEN, "FORBIDDEN")]
    #[case(AppError::Unexpected(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")]
    #[tokio::test]
    async fn maps_kind_to_status_and_code(
        #[case] err: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let message = err.to_string();
        let response = err.into_response();
        assert_eq!(response.status(), status);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], code);
        assert_eq!(body["message"], message);
        assert_eq!(body.as_object().unwrap().len(), 2);
    }

    #[test]
    fn database_errors_are_internal() {
        let err: AppError = sea_orm::DbErr::Custom("connection reset".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_api_error().message, "database error");
    }

    #[test]
    fn blank_message_gets_generic_text() {
        let payload = AppError::NotFound(String::new()).to_api_error();
        assert_eq!(payload.code, ErrorCode::NotFound);
        assert_eq!(payload.message, "Not Found");

        let payload = ApiError::new(ErrorCode::BadRequest, "   ");
        assert_eq!(payload.message, "Bad Request");
    }

    #[tokio::test]
    async fn panic_payload_is_internal_error() {
        let response = handle_panic(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "Internal Server Error");
    }
}
