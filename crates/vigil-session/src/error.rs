use thiserror::Error;

use vigil_biometric::BiometricError;
use vigil_core::CoreError;
use vigil_liveness::LivenessError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    SessionNotFound,

    #[error("user not found")]
    UserNotFound,

    /// The session is locked; only the facial CAPTCHA flow is allowed.
    #[error("session is locked, complete the facial CAPTCHA to continue")]
    SessionLocked,

    /// Force-logout outcome. The session row has been removed; the caller
    /// must treat this as an authentication failure, not a response.
    #[error("session terminated due to high security risk")]
    Terminated,

    /// The submitted embedding failed quality validation. Nothing was
    /// scored or recorded.
    #[error("invalid face embedding: {0}")]
    InvalidVector(#[from] BiometricError),

    #[error("challenge already used or invalid")]
    ReplayDetected,

    #[error("too many failed attempts")]
    RateLimited,

    #[error(transparent)]
    Store(#[from] CoreError),

    #[error("internal error")]
    Internal,
}

impl From<LivenessError> for SessionError {
    fn from(err: LivenessError) -> Self {
        match err {
            LivenessError::ReplayDetected => SessionError::ReplayDetected,
            LivenessError::RateLimited => SessionError::RateLimited,
            LivenessError::Internal => SessionError::Internal,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
