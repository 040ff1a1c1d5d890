//! Error handling for the analysis pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failure of one analysis request. None of these are retried.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Failed to start analyzer '{program}': {source}")]
    AnalyzerStartFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Analyzer exited with {}", describe_exit(.code))]
    AnalyzerExitFailure { code: Option<i32>, stderr: String },

    #[error("Analyzer produced invalid output: {message}")]
    AnalyzerOutputInvalid { message: String, raw: String },

    #[error("Analyzer output exceeded {limit} bytes")]
    AnalyzerOutputTooLarge { limit: usize },

    #[error("Analyzer did not finish within {timeout_ms} ms")]
    AnalyzerTimeout { timeout_ms: u64 },

    #[error("Workspace error: {message}")]
    Workspace {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

impl PipelineError {
    /// Create a new invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a new workspace error
    pub fn workspace(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Workspace {
            message: message.into(),
            source,
        }
    }

    /// Create a new invalid output error, keeping the raw output for diagnostics
    pub fn output_invalid(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::AnalyzerOutputInvalid {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the caller is at fault (client error) rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }

    /// Stable category name, used as a structured log field.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::AnalyzerStartFailure { .. } => "analyzer_start_failure",
            Self::AnalyzerExitFailure { .. } => "analyzer_exit_failure",
            Self::AnalyzerOutputInvalid { .. } => "analyzer_output_invalid",
            Self::AnalyzerOutputTooLarge { .. } => "analyzer_output_too_large",
            Self::AnalyzerTimeout { .. } => "analyzer_timeout",
            Self::Workspace { .. } => "workspace_error",
            Self::Io(_) => "io_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Wire error document for this failure.
    pub fn to_body(&self) -> ErrorBody {
        match self {
            Self::InvalidRequest { message } => ErrorBody::new(message.clone()),
            Self::AnalyzerStartFailure { source, .. } => {
                ErrorBody::with_details("Failed to start analysis process", source.to_string())
            }
            Self::AnalyzerExitFailure { code, .. } => {
                let details = match code {
                    Some(code) => format!("Exit code: {}", code),
                    None => "Terminated by signal".to_string(),
                };
                ErrorBody::with_details("Analysis failed", details)
            }
            Self::AnalyzerOutputInvalid { raw, .. } => {
                ErrorBody::with_details("Invalid analysis output", raw.clone())
            }
            Self::AnalyzerOutputTooLarge { limit } => ErrorBody::with_details(
                "Analysis output too large",
                format!("Output exceeded {} bytes", limit),
            ),
            Self::AnalyzerTimeout { timeout_ms } => ErrorBody::with_details(
                "Analysis timed out",
                format!("No result after {} ms", timeout_ms),
            ),
            Self::Workspace { message, source } => {
                ErrorBody::with_details("Server error", format!("{}: {}", message, source))
            }
            Self::Io(e) => ErrorBody::with_details("Server error", e.to_string()),
            Self::Internal { message } => ErrorBody::with_details("Server error", message.clone()),
        }
    }
}

/// Result type alias for convenience
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error document returned to callers with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exit_failure_body_carries_exit_code() {
        let err = PipelineError::AnalyzerExitFailure {
            code: Some(2),
            stderr: "Traceback".into(),
        };
        assert_eq!(
            err.to_body(),
            ErrorBody::with_details("Analysis failed", "Exit code: 2")
        );
        assert_eq!(err.to_string(), "Analyzer exited with exit code 2");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_invalid_output_body_keeps_raw_output() {
        let err = PipelineError::output_invalid("expected value", "not json");
        let body = err.to_body();
        assert_eq!(body.error, "Invalid analysis output");
        assert_eq!(body.details.as_deref(), Some("not json"));
    }

    #[test]
    fn test_invalid_request_is_client_error() {
        let err = PipelineError::invalid_request("No code provided");
        assert!(err.is_client_error());
        assert_eq!(err.to_body(), ErrorBody::new("No code provided"));
        assert_eq!(err.category(), "invalid_request");
    }
}
