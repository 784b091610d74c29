use serde::{Deserialize, Serialize};
use vigil_biometric::BiometricVector;
use vigil_core::Timestamp;

// ---------------------------------------------------------------------------
// HeartbeatSignals — one behavioral/environmental sample from the client
// ---------------------------------------------------------------------------

/// Ephemeral signals accompanying a single heartbeat. Not persisted as an
/// entity beyond the behavioral audit append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatSignals {
    #[serde(default)]
    pub device_fingerprint: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,

    /// Standard deviations from the user's keystroke-timing baseline.
    #[serde(default)]
    pub keystroke_deviation: f64,
    /// Standard deviations from the user's mouse-movement baseline.
    #[serde(default)]
    pub mouse_deviation: f64,

    /// None when the camera could not report.
    #[serde(default)]
    pub face_present: Option<bool>,
    #[serde(default)]
    pub multiple_faces: bool,
    #[serde(default)]
    pub camera_ready: bool,
    #[serde(default)]
    pub camera_blocked: bool,

    /// Failed facial CAPTCHA count reported with this heartbeat.
    #[serde(default)]
    pub captcha_failures: u32,

    /// Shannon entropy of recent mouse movement vectors.
    #[serde(default = "neutral_metric")]
    pub mouse_entropy: f64,
    /// Variance of recent mouse velocities.
    #[serde(default = "neutral_metric")]
    pub mouse_velocity_variance: f64,

    #[serde(default)]
    pub live_vector: Option<BiometricVector>,
}

fn neutral_metric() -> f64 {
    1.0
}

impl Default for HeartbeatSignals {
    fn default() -> Self {
        Self {
            device_fingerprint: None,
            ip_address: None,
            keystroke_deviation: 0.0,
            mouse_deviation: 0.0,
            face_present: None,
            multiple_faces: false,
            camera_ready: false,
            camera_blocked: false,
            captcha_failures: 0,
            mouse_entropy: neutral_metric(),
            mouse_velocity_variance: neutral_metric(),
            live_vector: None,
        }
    }
}

impl HeartbeatSignals {
    /// Suppress face observations when the camera was not actually ready.
    /// A browser that never opened the camera must not look like a missing
    /// face.
    pub fn camera_gated(mut self) -> Self {
        if !self.camera_ready {
            self.face_present = None;
            self.multiple_faces = false;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// SessionBinding — the stored environment the session was opened from
// ---------------------------------------------------------------------------

/// Snapshot of the binding data the scoring engine compares signals against.
#[derive(Debug, Clone)]
pub struct SessionBinding {
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub browser_signature: Option<String>,
    pub created_at: Timestamp,
    /// Decrypted enrollment vector, or None when nothing usable is stored.
    pub stored_vector: Option<BiometricVector>,
}
