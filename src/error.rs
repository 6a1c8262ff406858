//! Error taxonomy for IntelliDoc.
//!
//! Library code returns [`Result`] over [`Error`]. The variants map onto the
//! failure classes the retrieval and ingestion paths treat differently:
//!
//! | Variant | Raised by | Handling |
//! |---------|-----------|----------|
//! | [`Error::Connection`] | store connection acquisition | search paths degrade to an empty result |
//! | [`Error::InvalidArgument`] | mode parsing, bad inputs | fails before any storage or model call |
//! | [`Error::ExternalService`] | embedder, language model | propagated to the caller |
//! | [`Error::Io`] | artifact writers, PDF reads | propagated to the caller |
//! | [`Error::Storage`] | SQL statements | propagated; ingestion rolls back |

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The relational store could not be reached.
    #[error("storage unreachable: {0}")]
    Connection(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An embedding or language-model provider failed.
    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("PDF extraction failed: {0}")]
    Extract(String),

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// True when the store was unreachable, as opposed to a failed statement.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}
