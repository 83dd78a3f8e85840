//! Domain error types
//!
//! This module defines the error hierarchy for Tidemark. All errors are
//! domain-specific and don't expose third-party types. The pipeline-stage
//! variants (`Connection`, `Extraction`, `Normalization`, `Load`, `Metrics`)
//! carry the failure taxonomy recorded on run logs.

use thiserror::Error;

/// Main Tidemark error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum TidemarkError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source connector errors
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Persistence errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A source could not be reached during the Connecting stage
    #[error("Connection error: {0}")]
    Connection(String),

    /// An API call failed mid-fetch during the Extracting stage
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// A raw record could not be mapped to canonical form; aborts the run
    #[error("Normalization error: {message} (record: {record})")]
    Normalization {
        message: String,
        /// Truncated copy of the offending raw record
        record: String,
    },

    /// The Loading stage failed beyond per-entity recovery
    #[error("Load error: {0}")]
    Load(String),

    /// Aggregate query or metric computation failed
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl TidemarkError {
    /// Builds a normalization error, truncating the raw record so run logs
    /// stay bounded even for pathological payloads.
    pub fn normalization(message: impl Into<String>, raw: &serde_json::Value) -> Self {
        const MAX_RECORD_CHARS: usize = 256;
        let mut record = raw.to_string();
        if record.len() > MAX_RECORD_CHARS {
            let mut end = MAX_RECORD_CHARS;
            while !record.is_char_boundary(end) {
                end -= 1;
            }
            record.truncate(end);
            record.push_str("...");
        }
        TidemarkError::Normalization {
            message: message.into(),
            record,
        }
    }
}

/// Source-connector-specific errors
///
/// Errors that occur when talking to storefront platform APIs.
/// These errors don't expose the underlying HTTP client types.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Failed to reach the platform API
    #[error("Failed to connect to source API: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after: {0}")]
    RateLimitExceeded(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

/// Persistence-specific errors
///
/// Errors that occur in the storage backend. These don't expose
/// tokio-postgres or pool types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to the database
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Schema bootstrap failed
    #[error("Failed to initialize schema: {0}")]
    SchemaFailed(String),

    /// An upsert or insert failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// A query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A row could not be mapped back to a domain type
    #[error("Failed to decode row: {0}")]
    DecodeFailed(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for TidemarkError {
    fn from(err: std::io::Error) -> Self {
        TidemarkError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for TidemarkError {
    fn from(err: serde_json::Error) -> Self {
        TidemarkError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for TidemarkError {
    fn from(err: toml::de::Error) -> Self {
        TidemarkError::Configuration(format!("TOML parse error: {err}"))
    }
}
