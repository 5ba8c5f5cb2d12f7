//! Error types for the sentiment responder.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Database-related errors. Surfaced as the store error of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Outbound send failures.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Refusing to send an empty message to {recipient}")]
    EmptyMessage { recipient: String },

    #[error("Network error sending to {recipient}: {reason}")]
    Network { recipient: String, reason: String },

    #[error("Platform rejected message to {recipient} (status {status}): {body}")]
    Rejected {
        recipient: String,
        status: u16,
        body: String,
    },

    #[error("Send to {recipient} timed out after {timeout:?}")]
    Timeout { recipient: String, timeout: Duration },
}

impl DeliveryError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

/// Webhook payload decoding failures.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Subscription handshake failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Missing hub.verify_token query parameter")]
    MissingToken,

    #[error("Verify token does not match")]
    TokenMismatch,
}

/// Sentiment capability failures.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("Cannot classify empty text")]
    EmptyInput,

    #[error("Classifier unavailable: {0}")]
    Unavailable(String),
}
