use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Timestamp — canonical time representation (seconds + nanoseconds)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds_since_epoch: u64,
    pub nanoseconds: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        Self {
            seconds_since_epoch: now.timestamp() as u64,
            nanoseconds: now.timestamp_subsec_nanos(),
        }
    }

    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            seconds_since_epoch: seconds,
            nanoseconds: 0,
        }
    }

    /// Milliseconds since the epoch. Challenge ids embed this.
    pub fn as_millis(&self) -> u64 {
        self.seconds_since_epoch * 1_000 + u64::from(self.nanoseconds) / 1_000_000
    }

    pub fn to_rfc3339(&self) -> String {
        let dt =
            chrono::DateTime::from_timestamp(self.seconds_since_epoch as i64, self.nanoseconds);
        dt.map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "invalid".to_string())
    }

    /// Whole seconds elapsed since `earlier`, saturating at zero.
    pub fn seconds_since(&self, earlier: &Timestamp) -> u64 {
        self.seconds_since_epoch
            .saturating_sub(earlier.seconds_since_epoch)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Timestamp {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            seconds_since_epoch: dt.timestamp() as u64,
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }
}

// ---------------------------------------------------------------------------
// Typed identifiers — prevent stringly-typed confusion
// ---------------------------------------------------------------------------

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

define_id!(UserId, "Unique identifier for an account owner.");
define_id!(SessionId, "Unique identifier for an authenticated session.");
define_id!(ChallengeId, "Unique identifier for a liveness challenge.");
define_id!(ChannelId, "Unique identifier for an open push channel.");

// ---------------------------------------------------------------------------
// RecommendedAction — what the scoring engine asks the session layer to do
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendedAction {
    Continue,
    IncreaseMonitoring,
    LockSession,
    ForceLogout,
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendedAction::Continue => write!(f, "CONTINUE"),
            RecommendedAction::IncreaseMonitoring => write!(f, "INCREASE_MONITORING"),
            RecommendedAction::LockSession => write!(f, "LOCK_SESSION"),
            RecommendedAction::ForceLogout => write!(f, "FORCE_LOGOUT"),
        }
    }
}

// ---------------------------------------------------------------------------
// ThreatTrigger — fixed vocabulary of rule outcomes (no open-ended strings)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatTrigger {
    DeviceMismatch,
    IpDrift,
    MultipleFaces,
    NoFace,
    CameraBlocked,
    BehavioralAnomaly,
    CaptchaFailed,
    MlAnomaly,
    FaceMismatch,
    BotLikeMouse,
}

impl ThreatTrigger {
    /// Human-readable description, matching what clients display.
    pub fn description(&self) -> &'static str {
        match self {
            ThreatTrigger::DeviceMismatch => "Device mismatch detected",
            ThreatTrigger::IpDrift => "IP address change detected",
            ThreatTrigger::MultipleFaces => "Multiple faces detected",
            ThreatTrigger::NoFace => "No face detected",
            ThreatTrigger::CameraBlocked => "Camera blocked or covered",
            ThreatTrigger::BehavioralAnomaly => "Unusual behavioral patterns",
            ThreatTrigger::CaptchaFailed => "Facial CAPTCHA verification failed",
            ThreatTrigger::MlAnomaly => "ML model detected anomaly",
            ThreatTrigger::FaceMismatch => "Live face does not match enrollment",
            ThreatTrigger::BotLikeMouse => "Bot-like mouse behavior detected",
        }
    }
}

impl fmt::Display for ThreatTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ---------------------------------------------------------------------------
// ScoreBreakdown — one field per scoring rule, checkable at compile time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub device_mismatch: f64,
    pub ip_drift: f64,
    pub camera_anomalies: f64,
    pub behavioral_anomalies: f64,
    pub captcha_failure: f64,
    pub ml_anomaly: f64,
    pub face_mismatch: f64,
    pub mouse_behavior: f64,
    pub session_age: f64,
}

impl ScoreBreakdown {
    /// Sum of all rule contributions, before the 0–100 cap.
    pub fn raw_total(&self) -> f64 {
        self.device_mismatch
            + self.ip_drift
            + self.camera_anomalies
            + self.behavioral_anomalies
            + self.captcha_failure
            + self.ml_anomaly
            + self.face_mismatch
            + self.mouse_behavior
            + self.session_age
    }
}

// ---------------------------------------------------------------------------
// SessionState — lifecycle of a monitored session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Monitoring,
    Locked,
    /// Terminal. A terminated session row is deleted from the store;
    /// this variant only appears in events describing the transition.
    Terminated,
}

// ---------------------------------------------------------------------------
// SessionSnapshot — the persisted per-session risk state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub user_id: UserId,

    // Binding established at login.
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub browser_signature: Option<String>,
    pub created_at: Timestamp,

    // Risk state.
    pub state: SessionState,
    pub threat_score: f64,
    pub breakdown: ScoreBreakdown,
    pub triggers: Vec<ThreatTrigger>,
    pub recommended_action: RecommendedAction,

    // Control flags.
    pub is_locked: bool,
    pub requires_facial_captcha: bool,

    // Hysteresis counters (reset when the condition is absent on a tick).
    pub no_face_streak: u32,
    pub multi_face_streak: u32,

    pub last_heartbeat: Option<Timestamp>,

    /// Store version for conditional updates (single-writer discipline).
    pub version: u64,
}

impl SessionSnapshot {
    /// A fresh session bound to the given user and environment.
    pub fn new(session_id: SessionId, user_id: UserId) -> Self {
        Self {
            session_id,
            user_id,
            device_fingerprint: None,
            ip_address: None,
            browser_signature: None,
            created_at: Timestamp::now(),
            state: SessionState::Active,
            threat_score: 0.0,
            breakdown: ScoreBreakdown::default(),
            triggers: Vec::new(),
            recommended_action: RecommendedAction::Continue,
            is_locked: false,
            requires_facial_captcha: false,
            no_face_streak: 0,
            multi_face_streak: 0,
            last_heartbeat: None,
            version: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// UserRecord — what the user store exposes to the decision core
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    /// Sealed 128-dim biometric vector, or None when nothing is enrolled.
    pub sealed_vector: Option<String>,
    pub account_locked: bool,
}
