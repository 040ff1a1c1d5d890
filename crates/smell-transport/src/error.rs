//! Error types for the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use smell_foundation::{ErrorBody, PipelineError};
use thiserror::Error;
use tracing::error;

/// Failure to bring the server up or keep it running
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A request failure rendered as `{error, details?}` with a non-2xx status
#[derive(Debug)]
pub enum ApiError {
    Pipeline(PipelineError),
    /// Rejected before reaching the pipeline (malformed or oversized body)
    Rejected { status: StatusCode, body: ErrorBody },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Pipeline(e) => status_for(e),
            Self::Rejected { status, .. } => *status,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(err)
    }
}

/// HTTP status for a pipeline failure
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        PipelineError::AnalyzerTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Pipeline(e) => {
                if status.is_server_error() {
                    error!(error = %e, category = e.category(), "Request failed");
                }
                e.to_body()
            }
            Self::Rejected { body, .. } => body,
        };
        (status, Json(body)).into_response()
    }
}
