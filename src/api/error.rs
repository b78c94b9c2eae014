use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong while talking to the portal.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no key exists with id {id}")]
    NotFound { id: String },

    #[error("the portal refused this operation: {message}")]
    Permission { message: String },

    #[error("unable to reach the portal: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("portal returned result code {code}: {message}")]
    Portal { code: i64, message: String },

    #[error("portal response from {endpoint} did not include a key")]
    MissingKey { endpoint: &'static str },

    #[error("unable to parse portal response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid portal URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
