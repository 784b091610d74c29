use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::RecommendedAction;

/// Decision thresholds shared by every component that scores or reacts to
/// threat levels. There is exactly one face-match distance threshold; the
/// matcher, the scoring engine, auto-login lookup, and CAPTCHA verification
/// all read it from here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    /// Score at or above which the session is terminated.
    pub logout_score: f64,
    /// Score at or above which the session is locked pending facial CAPTCHA.
    pub lock_score: f64,
    /// Score at or above which monitoring is increased.
    pub monitoring_score: f64,
    /// Euclidean distance below which two biometric vectors match.
    pub face_match_distance: f64,
    /// Minimum liveness confidence accepted by the verifier.
    pub liveness_confidence: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            logout_score: 80.0,
            lock_score: 75.0,
            monitoring_score: 20.0,
            face_match_distance: 0.55,
            liveness_confidence: 0.7,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> CoreResult<()> {
        if self.lock_score > self.logout_score {
            return Err(CoreError::InvalidConfig(format!(
                "lock_score {} exceeds logout_score {}",
                self.lock_score, self.logout_score
            )));
        }
        if self.monitoring_score > self.lock_score {
            return Err(CoreError::InvalidConfig(format!(
                "monitoring_score {} exceeds lock_score {}",
                self.monitoring_score, self.lock_score
            )));
        }
        if !(0.0..=100.0).contains(&self.lock_score)
            || !(0.0..=100.0).contains(&self.logout_score)
            || !(0.0..=100.0).contains(&self.monitoring_score)
        {
            return Err(CoreError::InvalidConfig(
                "score thresholds must lie in 0..=100".into(),
            ));
        }
        if self.face_match_distance <= 0.0 {
            return Err(CoreError::InvalidConfig(
                "face_match_distance must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.liveness_confidence) {
            return Err(CoreError::InvalidConfig(
                "liveness_confidence must lie in 0..=1".into(),
            ));
        }
        Ok(())
    }

    /// Map a final 0–100 score to the recommended action.
    pub fn action_for_score(&self, score: f64) -> RecommendedAction {
        if score >= self.logout_score {
            RecommendedAction::ForceLogout
        } else if score >= self.lock_score {
            RecommendedAction::LockSession
        } else if score >= self.monitoring_score {
            RecommendedAction::IncreaseMonitoring
        } else {
            RecommendedAction::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let t = Thresholds::default();
        t.validate().unwrap();
        assert!((t.face_match_distance - 0.55).abs() < f64::EPSILON);
    }

    #[test]
    fn action_mapping() {
        let t = Thresholds::default();
        assert_eq!(t.action_for_score(0.0), RecommendedAction::Continue);
        assert_eq!(t.action_for_score(19.9), RecommendedAction::Continue);
        assert_eq!(
            t.action_for_score(20.0),
            RecommendedAction::IncreaseMonitoring
        );
        assert_eq!(t.action_for_score(75.0), RecommendedAction::LockSession);
        assert_eq!(t.action_for_score(80.0), RecommendedAction::ForceLogout);
        assert_eq!(t.action_for_score(100.0), RecommendedAction::ForceLogout);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let t = Thresholds {
            lock_score: 90.0,
            logout_score: 80.0,
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_scores() {
        let t = Thresholds {
            logout_score: 120.0,
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn rejects_bad_liveness_confidence() {
        let t = Thresholds {
            liveness_confidence: 1.5,
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }
}
