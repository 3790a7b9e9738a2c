//! Error taxonomy shared by every collection job.
//!
//! All fallible operations in this crate return [`JobError`] so that callers
//! can match on the failure class instead of string-typing against
//! `Box<dyn Error>`. Conversions from the underlying library errors are
//! provided via `#[from]`, which keeps `?` usable throughout.

use thiserror::Error;

/// Convenience alias used by every module in this crate.
pub type JobResult<T> = Result<T, JobError>;

/// Error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum JobError {
    /// HTTP transport failure (connect, timeout, TLS, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote endpoint answered with an unexpected status code.
    #[error("unexpected http status {status} from {url}")]
    Status {
        /// The status code the endpoint returned.
        status: u16,
        /// The URL that was requested, with credentials stripped.
        url: String,
    },

    /// PostgreSQL failure, either while connecting or while executing a statement.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A payload could not be serialized or deserialized as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configured endpoint could not be parsed as a URL.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// A record in an otherwise valid response failed field-level parsing.
    #[error("parse error: {0}")]
    Parse(String),

    /// Filesystem or stdin failure while reading an invocation event.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    /// Whether retrying the same operation could plausibly succeed.
    ///
    /// Transient transport failures and server-side status codes are
    /// retryable; malformed data and client-side mistakes are not. The jobs
    /// themselves never retry, this exists so operators scheduling reruns
    /// can tell the two classes apart in logs and exit handling.
    pub fn is_retryable(&self) -> bool {
        match self {
            JobError::Http(e) => e.is_timeout() || e.is_connect(),
            JobError::Status { status, .. } => *status == 429 || *status >= 500,
            JobError::Database(sqlx::Error::PoolTimedOut) => true,
            JobError::Database(sqlx::Error::Io(_)) => true,
            _ => false,
        }
    }
}
