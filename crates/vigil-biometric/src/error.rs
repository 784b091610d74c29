use thiserror::Error;

/// Error type for the vigil-biometric crate.
///
/// Decryption failures get their own variant so callers can apply the
/// fail-safe rule (treat as mismatch) without pattern-matching on strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BiometricError {
    #[error("no vector provided")]
    MissingVector,

    #[error("vector must be {expected}-dimensional, got {actual}")]
    WrongDimension { expected: usize, actual: usize },

    #[error("vector is all zeros")]
    AllZeros,

    #[error("vector contains non-finite values")]
    NonFinite,

    #[error("sealing failed")]
    Encryption,

    #[error("unsealing failed")]
    Decryption,

    #[error("sealed payload is malformed")]
    MalformedCiphertext,
}

pub type BiometricResult<T> = Result<T, BiometricError>;
