use serde::{Deserialize, Serialize};

use vigil_core::{RecommendedAction, ThreatTrigger};

// ---------------------------------------------------------------------------
// RiskEvent — the fixed vocabulary of client-facing push events
// ---------------------------------------------------------------------------

/// Events pushed to a user's open channels. The wire format is
/// `{"event": "<name>", "data": {...}}`, which clients dispatch on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RiskEvent {
    #[serde(rename = "threat:update")]
    ThreatUpdate {
        threat_score: f64,
        /// Human-readable trigger descriptions, displayed verbatim.
        triggers: Vec<String>,
        recommended_action: String,
        requires_facial_captcha: bool,
    },

    #[serde(rename = "session:lock")]
    SessionLock {
        reason: String,
        requires_facial_captcha: bool,
    },

    #[serde(rename = "security:alert")]
    SecurityAlert {
        #[serde(rename = "type")]
        alert_type: String,
        message: String,
    },

    #[serde(rename = "security:face_verified")]
    FaceVerified { verdict: String },

    #[serde(rename = "security:face_failed")]
    FaceFailed { verdict: String },

    #[serde(rename = "camera:warning")]
    CameraWarning { warning: String },
}

impl RiskEvent {
    pub fn threat_update(
        threat_score: f64,
        triggers: &[ThreatTrigger],
        recommended_action: RecommendedAction,
        requires_facial_captcha: bool,
    ) -> Self {
        RiskEvent::ThreatUpdate {
            threat_score,
            triggers: triggers.iter().map(|t| t.description().to_string()).collect(),
            recommended_action: recommended_action.to_string(),
            requires_facial_captcha,
        }
    }

    pub fn session_lock(reason: impl Into<String>) -> Self {
        RiskEvent::SessionLock {
            reason: reason.into(),
            requires_facial_captcha: true,
        }
    }

    pub fn security_alert(alert_type: impl Into<String>, message: impl Into<String>) -> Self {
        RiskEvent::SecurityAlert {
            alert_type: alert_type.into(),
            message: message.into(),
        }
    }

    pub fn face_verification(success: bool, verdict: impl Into<String>) -> Self {
        if success {
            RiskEvent::FaceVerified {
                verdict: verdict.into(),
            }
        } else {
            RiskEvent::FaceFailed {
                verdict: verdict.into(),
            }
        }
    }

    pub fn camera_warning(warning: impl Into<String>) -> Self {
        RiskEvent::CameraWarning {
            warning: warning.into(),
        }
    }

    /// The wire event name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            RiskEvent::ThreatUpdate { .. } => "threat:update",
            RiskEvent::SessionLock { .. } => "session:lock",
            RiskEvent::SecurityAlert { .. } => "security:alert",
            RiskEvent::FaceVerified { .. } => "security:face_verified",
            RiskEvent::FaceFailed { .. } => "security:face_failed",
            RiskEvent::CameraWarning { .. } => "camera:warning",
        }
    }
}
