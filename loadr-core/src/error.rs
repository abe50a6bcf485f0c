pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can escape the engine. Everything that goes wrong while a request is in flight
/// is recorded as sample data instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("`duration` and `total` are mutually exclusive; configure only one stop condition")]
    ConflictingStopConditions,

    #[error("`duration` must be a positive duration")]
    InvalidDuration,

    #[error("`total` must be a positive integer")]
    InvalidTotal,

    #[error("`concurrency` must be a positive integer")]
    InvalidConcurrency,

    #[error("`timeout` must be a positive duration")]
    InvalidTimeout,

    #[error("`{0}` is required")]
    MissingUrl(&'static str),

    #[error("invalid `{field}`: `{url}` (expected an absolute http:// or https:// URL)")]
    InvalidUrl { field: &'static str, url: String },

    #[error("invalid `method`: `{0}` (expected GET, POST, PUT, PATCH or DELETE)")]
    InvalidMethod(String),

    #[error("invalid header `{0}`")]
    InvalidHeader(String),

    #[error("`placeholder` must not be empty")]
    EmptyPlaceholder,

    #[error("failed to encode request body: {0}")]
    BodyEncode(#[from] serde_json::Error),
}
