//! Error type shared by every questionnaire operation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QsError>;

#[derive(Debug, Error)]
pub enum QsError {
    /// The backend answered with a non-success status. Aborts the current run.
    #[error("invalid HTTP status code {status} from server ({url})")]
    Remote { status: u16, url: String },

    #[error("failed to reach the questionnaire at {url}: {message}")]
    Transport { url: String, message: String },

    #[error("unexpected response shape from {context}: {message}")]
    Decode { context: String, message: String },

    /// A value that must be an integer (lens flags, positions, quantities) is not one.
    #[error("attribute `{attribute}` has non-integer value {value}")]
    InvalidValue { attribute: String, value: String },

    #[error("attribute id `{id}` does not have the expected shape: {reason}")]
    MalformedAttribute { id: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QsError {
    pub(crate) fn decode(context: impl Into<String>, message: impl Into<String>) -> Self {
        QsError::Decode {
            context: context.into(),
            message: message.into(),
        }
    }

    /// HTTP status carried by a remote failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            QsError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
