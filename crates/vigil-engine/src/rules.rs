use std::net::IpAddr;

use vigil_core::Timestamp;

use crate::signals::{HeartbeatSignals, SessionBinding};

// Individual scoring rules. Each returns a non-negative sub-score; the
// engine sums them and caps the total at 100. None of these raise on
// malformed signal input.

pub const DEVICE_MISMATCH_WEIGHT: f64 = 40.0;
pub const IP_SAME_SUBNET_WEIGHT: f64 = 10.0;
pub const IP_DIFFERENT_SUBNET_WEIGHT: f64 = 25.0;
pub const CAMERA_CAP: f64 = 35.0;
pub const BEHAVIOR_CAP: f64 = 20.0;
pub const CAPTCHA_FAILURE_WEIGHT: f64 = 45.0;
pub const ML_WEIGHT: f64 = 20.0;
pub const ML_TRIGGER_FLOOR: f64 = 5.0;
pub const FACE_MISMATCH_WEIGHT: f64 = 50.0;
pub const MOUSE_CAP: f64 = 25.0;

/// Stored vs current fingerprint, both present and unequal.
pub fn device_mismatch(binding: &SessionBinding, signals: &HeartbeatSignals) -> f64 {
    match (&binding.device_fingerprint, &signals.device_fingerprint) {
        (Some(stored), Some(current)) if stored != current => DEVICE_MISMATCH_WEIGHT,
        _ => 0.0,
    }
}

/// IP change with subnet tolerance. Mobile users hop addresses within a
/// subnet routinely, so a same-/24 move scores low.
pub fn ip_drift(binding: &SessionBinding, signals: &HeartbeatSignals) -> f64 {
    let (stored, current) = match (&binding.ip_address, &signals.ip_address) {
        (Some(s), Some(c)) => (s, c),
        _ => return 0.0,
    };
    if stored == current {
        return 0.0;
    }
    match (stored.parse::<IpAddr>(), current.parse::<IpAddr>()) {
        (Ok(IpAddr::V4(a)), Ok(IpAddr::V4(b))) => {
            if a.octets()[..3] == b.octets()[..3] {
                IP_SAME_SUBNET_WEIGHT
            } else {
                IP_DIFFERENT_SUBNET_WEIGHT
            }
        }
        (Ok(IpAddr::V6(a)), Ok(IpAddr::V6(b))) => {
            if a.octets()[..8] == b.octets()[..8] {
                IP_SAME_SUBNET_WEIGHT
            } else {
                IP_DIFFERENT_SUBNET_WEIGHT
            }
        }
        // Mixed families or unparsable: treat as a different network.
        _ => IP_DIFFERENT_SUBNET_WEIGHT,
    }
}

/// Multiple faces +20, camera blocked +15, face absent +15, capped at 35.
pub fn camera_anomalies(signals: &HeartbeatSignals) -> f64 {
    let mut score: f64 = 0.0;
    if signals.multiple_faces {
        score += 20.0;
    }
    if signals.camera_blocked {
        score += 15.0;
    }
    if signals.face_present == Some(false) {
        score += 15.0;
    }
    score.min(CAMERA_CAP)
}

/// Keystroke/mouse deviation beyond two standard deviations, capped at 20.
pub fn behavioral_anomalies(signals: &HeartbeatSignals) -> f64 {
    let mut score: f64 = 0.0;
    if signals.keystroke_deviation > 2.0 {
        score += 10.0;
    }
    if signals.mouse_deviation > 2.0 {
        score += 10.0;
    }
    score.min(BEHAVIOR_CAP)
}

pub fn captcha_failure(signals: &HeartbeatSignals) -> f64 {
    f64::from(signals.captcha_failures) * CAPTCHA_FAILURE_WEIGHT
}

pub fn ml_anomaly(ml_score: f64) -> f64 {
    ml_score.clamp(0.0, 1.0) * ML_WEIGHT
}

/// Live vs stored embedding at the shared match distance. Vectors are
/// pre-validated; absence of either side means the rule cannot fire.
pub fn face_mismatch(
    binding: &SessionBinding,
    signals: &HeartbeatSignals,
    match_distance: f64,
) -> f64 {
    match (&signals.live_vector, &binding.stored_vector) {
        (Some(live), Some(stored)) if live.distance(stored) >= match_distance => {
            FACE_MISMATCH_WEIGHT
        }
        _ => 0.0,
    }
}

/// Low movement entropy and flat velocity read as scripted input.
pub fn mouse_behavior(signals: &HeartbeatSignals) -> f64 {
    let mut score: f64 = 0.0;
    if signals.mouse_entropy < 0.3 {
        score += 15.0;
    } else if signals.mouse_entropy < 0.5 {
        score += 8.0;
    }
    if signals.mouse_velocity_variance < 0.2 {
        score += 10.0;
    }
    score.min(MOUSE_CAP)
}

/// Very old sessions get a minor penalty.
pub fn session_age(created_at: &Timestamp, now: &Timestamp) -> f64 {
    let age_hours = now.seconds_since(created_at) / 3600;
    if age_hours > 24 {
        5.0
    } else if age_hours > 12 {
        2.0
    } else {
        0.0
    }
}
