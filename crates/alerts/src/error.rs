use thiserror::Error;

/// Failure to read products from the backing store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("product repository unavailable: {0}")]
    Unavailable(String),

    #[error("failed to decode product records: {0}")]
    Decode(String),
}

/// Failure to hand a message over to the mail transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("transport i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Fatal sweep error. Per-product and per-notification failures never surface here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SweepError {
    #[error(transparent)]
    RepositoryUnavailable(#[from] RepositoryError),
}
