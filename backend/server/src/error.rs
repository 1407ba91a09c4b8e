use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::database::ExecutorError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    MalformedRequest(String),

    #[error("The answer database could not complete the query.")]
    BackingStoreFailure(#[from] ExecutorError),

    #[error("The answer database returned a result of unexpected shape.")]
    UnexpectedResult(String),
}

impl AppError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        AppError::MalformedRequest(reason.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::BackingStoreFailure(cause) => {
                error!(%cause, "Backing store query failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::UnexpectedResult(detail) => {
                error!(%detail, "Backing store returned an unexpected result");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_is_bad_request_with_reason() {
        let response = AppError::malformed("Unknown question: bogus").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_backing_store_message_hides_cause() {
        let err = AppError::from(ExecutorError::Unavailable("connection refused".into()));
        assert!(!err.to_string().contains("refused"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
