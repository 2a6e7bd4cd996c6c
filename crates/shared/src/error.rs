use thiserror::Error;

/// Reasons an inbound frame could not be turned into a story event.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("frame must be a JSON object")]
    NotAnObject,
    #[error("invalid `{kind}` payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    pub fn invalid_payload(kind: impl Into<String>, source: serde_json::Error) -> Self {
        Self::InvalidPayload {
            kind: kind.into(),
            source,
        }
    }
}
