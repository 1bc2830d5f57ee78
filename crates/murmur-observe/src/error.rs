//! Error types for the voice event layer.

/// Errors that can occur while building voice events.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// A required identifier was empty or whitespace.
    #[error("{0} must be a non-empty string")]
    EmptyField(&'static str),

    /// JSON serialization of the payload failed.
    #[error("observe serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The payload did not serialize to a JSON object.
    #[error("voice event payload must serialize to an object")]
    InvalidPayload,
}
