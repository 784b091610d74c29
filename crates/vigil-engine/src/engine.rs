use serde::{Deserialize, Serialize};
use tracing::debug;

use vigil_core::{
    RecommendedAction, ScoreBreakdown, ThreatTrigger, Thresholds, Timestamp,
};

use crate::rules;
use crate::signals::{HeartbeatSignals, SessionBinding};

pub const MAX_SCORE: f64 = 100.0;

// ---------------------------------------------------------------------------
// ThreatAssessment — the engine's complete, explainable output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatAssessment {
    /// Capped composite score in 0..=100.
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Triggers in fixed rule order, one per rule that contributed.
    pub triggers: Vec<ThreatTrigger>,
    pub recommended_action: RecommendedAction,
    pub evaluated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// ThreatScoringEngine
// ---------------------------------------------------------------------------

/// Stateless rule evaluator. One instance is shared across all sessions;
/// hysteresis and streak tracking live with the session monitor, not here.
#[derive(Debug, Clone)]
pub struct ThreatScoringEngine {
    thresholds: Thresholds,
}

impl ThreatScoringEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Score one heartbeat against the session's stored binding.
    ///
    /// Camera observations are gated on `camera_ready` before any rule
    /// sees them, so a client that never opened its camera cannot be
    /// penalized for a missing face.
    pub fn evaluate(
        &self,
        binding: &SessionBinding,
        signals: &HeartbeatSignals,
        ml_score: f64,
    ) -> ThreatAssessment {
        let now = Timestamp::now();
        self.evaluate_at(binding, signals, ml_score, now)
    }

    /// Deterministic variant taking the evaluation instant explicitly.
    pub fn evaluate_at(
        &self,
        binding: &SessionBinding,
        signals: &HeartbeatSignals,
        ml_score: f64,
        now: Timestamp,
    ) -> ThreatAssessment {
        let signals = signals.clone().camera_gated();

        let breakdown = ScoreBreakdown {
            device_mismatch: rules::device_mismatch(binding, &signals),
            ip_drift: rules::ip_drift(binding, &signals),
            camera_anomalies: rules::camera_anomalies(&signals),
            behavioral_anomalies: rules::behavioral_anomalies(&signals),
            captcha_failure: rules::captcha_failure(&signals),
            ml_anomaly: rules::ml_anomaly(ml_score),
            face_mismatch: rules::face_mismatch(
                binding,
                &signals,
                self.thresholds.face_match_distance,
            ),
            mouse_behavior: rules::mouse_behavior(&signals),
            session_age: rules::session_age(&binding.created_at, &now),
        };

        let mut triggers = Vec::new();
        if breakdown.device_mismatch > 0.0 {
            triggers.push(ThreatTrigger::DeviceMismatch);
        }
        if breakdown.ip_drift > 0.0 {
            triggers.push(ThreatTrigger::IpDrift);
        }
        if signals.multiple_faces {
            triggers.push(ThreatTrigger::MultipleFaces);
        }
        if signals.face_present == Some(false) {
            triggers.push(ThreatTrigger::NoFace);
        }
        if signals.camera_blocked {
            triggers.push(ThreatTrigger::CameraBlocked);
        }
        if breakdown.behavioral_anomalies > 0.0 {
            triggers.push(ThreatTrigger::BehavioralAnomaly);
        }
        if breakdown.captcha_failure > 0.0 {
            triggers.push(ThreatTrigger::CaptchaFailed);
        }
        if breakdown.ml_anomaly > rules::ML_TRIGGER_FLOOR {
            triggers.push(ThreatTrigger::MlAnomaly);
        }
        if breakdown.face_mismatch > 0.0 {
            triggers.push(ThreatTrigger::FaceMismatch);
        }
        if breakdown.mouse_behavior > 0.0 {
            triggers.push(ThreatTrigger::BotLikeMouse);
        }

        let score = breakdown.raw_total().min(MAX_SCORE);
        let recommended_action = self.thresholds.action_for_score(score);

        debug!(
            score,
            ?recommended_action,
            triggers = triggers.len(),
            "threat evaluation complete"
        );

        ThreatAssessment {
            score,
            breakdown,
            triggers,
            recommended_action,
            evaluated_at: now,
        }
    }
}
