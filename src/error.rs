use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Every user-visible failure of the API. Rendered as a JSON body with a
/// single human-readable `detail` field; raw transport or database errors
/// never reach the client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    /// The provider answered with an error status; the status is passed
    /// through and the detail is the normalized provider message.
    #[error("{detail}")]
    Upstream { status: u16, detail: String },

    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    InvalidInput(String),

    /// Server-side failure with no better classification (e.g. the history
    /// read hitting a database error). The detail stays generic.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Configuration(_)
            | ApiError::UpstreamUnavailable(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        };

        let body = Json(json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
