use thiserror::Error;

/// Domain failures raised by the tracker store.
///
/// Store operations return `anyhow::Result`; these values travel inside it and
/// can be recovered with `anyhow::Error::downcast_ref`.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("malformed import document: {0}")]
    Import(#[from] serde_json::Error),
}

impl TrackerError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        TrackerError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        TrackerError::InvalidInput(message.into())
    }
}
