use thiserror::Error;

/// Error type for the Vigil root binary, aggregating errors from the
/// subsystem crates.
#[derive(Debug, Error)]
pub enum VigilError {
    #[error("core error: {0}")]
    Core(#[from] vigil_core::CoreError),

    #[error("biometric error: {0}")]
    Biometric(#[from] vigil_biometric::BiometricError),

    #[error("liveness error: {0}")]
    Liveness(#[from] vigil_liveness::LivenessError),

    #[error("notification error: {0}")]
    Notify(#[from] vigil_notify::NotifyError),

    #[error("session error: {0}")]
    Session(#[from] vigil_session::SessionError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for VigilError {
    fn from(e: serde_json::Error) -> Self {
        VigilError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for VigilError {
    fn from(e: toml::de::Error) -> Self {
        VigilError::Config(format!("TOML parse error: {}", e))
    }
}

pub type VigilResult<T> = Result<T, VigilError>;
