use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum HubError {
    // Delivery errors
    SendFailed { connection_id: String, reason: String },
    DuplicateConnection(String),

    // Storage errors
    StorageWriteFailed(String),

    // HTTP collaborator errors
    UploadError(String),
    UpstreamError(String),
    Unauthorized(String),

    // System errors
    SystemError(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed { connection_id, reason } => {
                write!(f, "Send to connection {} failed: {}", connection_id, reason)
            }
            Self::DuplicateConnection(id) => write!(f, "Connection already registered: {}", id),
            Self::StorageWriteFailed(msg) => write!(f, "Storage write failed: {}", msg),
            Self::UploadError(msg) => write!(f, "Upload error: {}", msg),
            Self::UpstreamError(msg) => write!(f, "Upstream service error: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::SystemError(msg) => write!(f, "System error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for HubError {}

// Filesystem failures in this crate only happen on storage paths
impl From<std::io::Error> for HubError {
    fn from(err: std::io::Error) -> Self {
        HubError::StorageWriteFailed(err.to_string())
    }
}

// Generic result type for the hub
pub type Result<T> = std::result::Result<T, HubError>;
