use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LivenessError {
    /// The challenge id already appears in the attempt ledger.
    #[error("challenge has already been used")]
    ReplayDetected,

    /// Too many recent failures or issuance requests for this user.
    #[error("rate limit exceeded")]
    RateLimited,

    /// A shared lock was poisoned.
    #[error("internal error")]
    Internal,
}

pub type LivenessResult<T> = Result<T, LivenessError>;
