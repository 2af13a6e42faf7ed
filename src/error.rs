use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller-supplied data violates a structural invariant (too few
    /// participants, empty content, unknown participant id).
    #[error("invalid entity: {0}")]
    InvalidEntity(String),

    /// The referenced conversation does not exist or the acting user is not
    /// a participant. One variant for both cases so existence is not leaked
    /// to non-participants.
    #[error("invalid conversation: {0}")]
    InvalidConversation(String),

    #[error("not found")]
    NotFound,

    /// The store reported an unexpected error. Wrapped exactly once with the
    /// operation name; retry policy belongs to the caller.
    #[error("storage failure in {op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl AppError {
    pub fn storage(op: &'static str, source: sqlx::Error) -> Self {
        AppError::Storage { op, source }
    }

    /// Whether a retry could plausibly succeed (pool/connectivity trouble).
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Storage { source, .. } => matches!(
                source,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }

    /// HTTP status the transport tier should map this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidEntity(_) => 400,
            AppError::InvalidConversation(_) => 403,
            AppError::NotFound => 404,
            AppError::Storage { .. } | AppError::Config(_) => 500,
        }
    }

    /// Message safe to show to clients. Server-side failures collapse to a
    /// generic line; full detail stays in logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidEntity(m) => format!("invalid entity: {m}"),
            AppError::InvalidConversation(m) => format!("invalid conversation: {m}"),
            AppError::NotFound => "not found".into(),
            AppError::Storage { .. } | AppError::Config(_) => "internal server error".into(),
        }
    }
}
