use thiserror::Error;

/// Result type for Dynaudio operations
pub type Result<T> = std::result::Result<T, DynaudioError>;

/// Errors that can occur when talking to a Dynaudio Connect device
#[derive(Error, Debug)]
pub enum DynaudioError {
    /// I/O error while connecting, sending or receiving
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device did not answer within the receive timeout
    #[error("Request timeout")]
    Timeout,

    /// A payload group is not a two-digit hex byte
    #[error("Malformed payload group: {group:?}")]
    MalformedPayload {
        /// The offending group text
        group: String,
    },

    /// Payload has no groups at all
    #[error("Payload is empty")]
    EmptyPayload,

    /// Payload has more groups than the two-digit length field can express
    #[error("Payload too long: {groups} groups (max 99)")]
    PayloadTooLong {
        /// Number of groups in the rejected payload
        groups: usize,
    },

    /// Volume level is not a finite number
    #[error("Invalid volume level: {0}")]
    InvalidVolume(f64),

    /// Source name is not in the source table
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// Response byte does not map to a known source
    #[error("Unknown source code: {0:#04x}")]
    UnknownSourceCode(u8),

    /// Zone identifier cannot be addressed by the protocol
    #[error("Invalid zone: {0:?}")]
    InvalidZone(String),

    /// Received bytes are not a valid frame
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
