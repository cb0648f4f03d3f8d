//! Error taxonomy shared by every stage of the pipeline.
//!
//! Setup-time failures (extraction, chunking, embedding, index build) and
//! query-time failures (retrieval, completion) are kept as distinct variants
//! so callers can tell a credential problem from a transient one from a
//! quota problem without parsing messages.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the RAG pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// The schema source's media type has no extractor.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The schema source could not be decoded (invalid UTF-8, malformed
    /// delimited table, unreadable workbook).
    #[error("decoding error: {0}")]
    Decoding(String),

    /// The input produced no chunkable content.
    #[error("no text chunks could be extracted from the provided content")]
    EmptyInput,

    /// Chunk and vector sequences handed to the index differ in length.
    #[error("length mismatch: {chunks} chunks but {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    /// The embedding model could not be initialized.
    #[error("failed to load embedding model '{model}': {message}")]
    ModelLoad { model: String, message: String },

    /// An embedding call returned an unusable result.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// A query was issued before any schema was ingested.
    #[error("no active schema index; provide a schema before asking questions")]
    NoActiveIndex,

    /// The provider rejected the credential.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The provider asked us to back off.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// The request never reached the provider or the transport broke.
    #[error("connection error: {0}")]
    Connection(String),

    /// The provider answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    ApiStatus { status: u16, message: String },

    /// A long-latency operation exceeded its deadline.
    #[error("{operation} timed out after {}s", .after.as_secs_f64())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RagError {
    /// True for failures where retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RagError::Connection(_) | RagError::Timeout { .. } | RagError::RateLimit(_)
        ) || matches!(self, RagError::ApiStatus { status, .. } if *status >= 500)
    }

    /// True when the fix is a configuration change (API key).
    pub fn is_credential_problem(&self) -> bool {
        matches!(self, RagError::Authentication(_))
    }
}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(RagError::RateLimit("slow down".into()).is_transient());
        assert!(RagError::Connection("refused".into()).is_transient());
        assert!(RagError::Timeout {
            operation: "completion",
            after: Duration::from_secs(1)
        }
        .is_transient());
        assert!(RagError::ApiStatus {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(!RagError::ApiStatus {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!RagError::Authentication("bad key".into()).is_transient());
    }

    #[test]
    fn test_credential_classification() {
        assert!(RagError::Authentication("bad key".into()).is_credential_problem());
        assert!(!RagError::RateLimit("quota".into()).is_credential_problem());
    }

    #[test]
    fn test_timeout_message() {
        let err = RagError::Timeout {
            operation: "completion",
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "completion timed out after 30s");
    }
}
