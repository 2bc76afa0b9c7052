pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("range fetch failed: {0}")]
    RangeFetch(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short machine-readable name, used in CLI error lines.
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NotFound",
            Error::InvalidInput(_) => "InvalidInput",
            Error::InvalidRange(_) => "InvalidRange",
            Error::RangeFetch(_) => "RangeFetch",
            Error::Io(_) | Error::Internal(_) => "InternalError",
        }
    }

    /// Whether the error came from the range data source rather than from
    /// the caller's input.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::RangeFetch(_) | Error::NotFound(_))
    }
}
