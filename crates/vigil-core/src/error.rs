use thiserror::Error;

/// Error type shared across the Vigil workspace.
///
/// The taxonomy mirrors how callers must react: `Unauthenticated` and
/// `Terminated` require re-login, `Forbidden` directs the client to the
/// facial CAPTCHA flow, and `RateLimited`/`ReplayDetected` carry no new
/// state. Messages stay generic to avoid leaking internal state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("session locked")]
    Forbidden,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("too many recent failures")]
    RateLimited,

    #[error("challenge already consumed")]
    ReplayDetected,

    #[error("session terminated")]
    Terminated,

    #[error("session not found")]
    SessionNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("store version conflict")]
    VersionConflict,

    #[error("store error: {0}")]
    Store(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
