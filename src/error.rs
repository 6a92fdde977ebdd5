// Error kinds surfaced by generation, storage and export

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlogError>;

/// Notice shown in the display area when the user aborts a generation.
pub const CANCELLED_NOTICE: &str = "Generation cancelled.";

/// Notice shown for transport level failures.
pub const GENERIC_FAILURE_NOTICE: &str =
    "Something went wrong while generating your blog. Please try again.";

/// Used when a rejected request carries no usable `error` message.
pub const FALLBACK_REJECTION: &str = "Failed to generate blog.";

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("{message}")]
    RequestRejected { status: u16, message: String },

    #[error("Response has no readable body")]
    StreamUnavailable,

    #[error("Transport failure: {0}")]
    TransportFailure(#[source] reqwest::Error),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Could not parse image metadata: {0}")]
    MetadataParseFailure(String),

    #[error("Image lookup failed for '{keyword}': {reason}")]
    ImageLookupFailure { keyword: String, reason: String },

    #[error("PDF export unavailable: {0}")]
    ExportUnavailable(String),

    #[error("Clipboard access denied: {0}")]
    ClipboardDenied(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to serialize state: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No blog post has been generated yet")]
    NoResult,
}

impl BlogError {
    /// Short human readable text for the display area.
    pub fn notice(&self) -> String {
        match self {
            BlogError::RequestRejected { message, .. } => message.clone(),
            BlogError::Cancelled => CANCELLED_NOTICE.to_string(),
            BlogError::StreamUnavailable | BlogError::TransportFailure(_) => {
                GENERIC_FAILURE_NOTICE.to_string()
            }
            other => other.to_string(),
        }
    }
}
