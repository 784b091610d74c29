use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vigil_core::Thresholds;
use vigil_session::MonitorConfig;

use crate::error::{VigilError, VigilResult};

/// Top-level configuration for the Vigil root binary.
///
/// Loaded from a TOML file (typically `~/.vigil/config.toml`). Every
/// section has sensible defaults; a missing file yields the default
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VigilConfig {
    /// Secret the biometric sealing key is derived from. Must be set to a
    /// real secret in any deployment; the default exists only so `init`
    /// can write a template.
    #[serde(default = "default_sealing_secret")]
    pub sealing_secret: String,

    /// Score and distance thresholds shared by every component.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Streak, CAPTCHA and rate-limit settings for the session monitor.
    #[serde(default)]
    pub monitor: MonitorConfig,
}

fn default_sealing_secret() -> String {
    "change-me".to_string()
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            sealing_secret: default_sealing_secret(),
            thresholds: Thresholds::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl VigilConfig {
    /// Load configuration from a TOML file. A missing file returns the
    /// default configuration.
    pub fn load(path: &Path) -> VigilResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(VigilError::Io)?;
        let config: VigilConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> VigilResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| VigilError::Config(format!("TOML serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(VigilError::Io)?;
        }
        std::fs::write(path, contents).map_err(VigilError::Io)?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> VigilResult<()> {
        if self.sealing_secret.is_empty() {
            return Err(VigilError::Config("sealing_secret must not be empty".into()));
        }
        self.thresholds.validate()?;
        if self.monitor.no_face_lock_streak == 0 || self.monitor.multi_face_lock_streak == 0 {
            return Err(VigilError::Config(
                "lock streaks must be at least 1".into(),
            ));
        }
        if self.monitor.max_captcha_attempts == 0 {
            return Err(VigilError::Config(
                "max_captcha_attempts must be at least 1".into(),
            ));
        }
        if self.monitor.failure_window_seconds == 0 || self.monitor.issuance_window_seconds == 0 {
            return Err(VigilError::Config("rate-limit windows must be > 0".into()));
        }
        Ok(())
    }

    /// Return the path to the default config file location.
    pub fn default_config_path() -> PathBuf {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".vigil/config.toml"))
            .unwrap_or_else(|_| PathBuf::from(".vigil/config.toml"))
    }
}
