//! Error types for the signal analyst service

use hyper::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalystError {
    /// Malformed or insufficient input; names the offending wire field.
    #[error("invalid field '{field}': {message}")]
    Validation { field: String, message: String },

    /// Bad or missing shared-secret header. No detail is leaked.
    #[error("unauthorized")]
    Auth,

    /// Only POST is accepted on the analysis endpoint.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Oracle or notifier unreachable or answering with a non-success
    /// status. Status 0 means the failure happened below HTTP (connect,
    /// DNS).
    #[error("upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// Oracle output could not be normalized. Recovered locally into a safe
    /// hold; never surfaced as a request failure.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalystError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AnalystError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status this error surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            AnalystError::Validation { .. } => StatusCode::BAD_REQUEST,
            AnalystError::Auth => StatusCode::UNAUTHORIZED,
            AnalystError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AnalystError::Upstream { .. }
            | AnalystError::Parse(_)
            | AnalystError::Configuration { .. }
            | AnalystError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalystError>;
