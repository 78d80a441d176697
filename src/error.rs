use thiserror::Error;

#[derive(Debug, Error)]
pub enum JourneyError {
    /// Credentials or session handle are missing. Raised before any fetch.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("upstream {operation} failed: {message}")]
    Upstream { operation: String, message: String },

    /// A single play event carried a timestamp that could not be parsed.
    #[error("malformed play event {track_id}: cannot parse timestamp {raw:?}")]
    MalformedData { track_id: String, raw: String },
}

impl JourneyError {
    pub fn upstream(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

pub type JourneyResult<T> = Result<T, JourneyError>;
