use analytics::AnalyticsError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use executor::ExecutorError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// The request body was not valid JSON for the endpoint.
    #[error("{}", .0.body_text())]
    Json(#[from] JsonRejection),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Executor(err) => match err {
                ExecutorError::InvalidQuantity(_)
                | ExecutorError::InvalidPrice(_)
                | ExecutorError::InsufficientFunds { .. }
                | ExecutorError::InsufficientShares { .. }
                | ExecutorError::Ledger(_) => StatusCode::BAD_REQUEST,
                ExecutorError::InstrumentNotFound(_) | ExecutorError::AccountNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ExecutorError::DuplicateInstrument(_) => StatusCode::CONFLICT,
                ExecutorError::Valuation(AnalyticsError::Arithmetic(_)) => StatusCode::BAD_REQUEST,
                ExecutorError::Storage(_) | ExecutorError::Valuation(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Json(rejection) => rejection.status(),
        }
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed.");
            "An internal error occurred; the operation was not applied".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
