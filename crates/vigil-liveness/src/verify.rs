use serde::{Deserialize, Serialize};

// Timing bounds for a submitted challenge. Anything above the upper bound
// is a timeout regardless of the challenge's own limit; anything below the
// lower bound is faster than a human can react.
pub const MAX_TIMING_SECONDS: f64 = 8.0;
pub const MIN_TIMING_SECONDS: f64 = 0.5;

// ---------------------------------------------------------------------------
// ChallengeResponse — what the client reports back
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    /// Did the client-side detector observe the requested action?
    pub action_completed: bool,
    /// Seconds from challenge display to action completion.
    pub timing_seconds: f64,
    /// Client-reported liveness confidence in 0..=1.
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// LivenessOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessOutcome {
    pub verified: bool,
    pub confidence: f64,
    /// All failure reasons joined with "; ", or the success message.
    pub reason: String,
}

// ---------------------------------------------------------------------------
// LivenessVerifier
// ---------------------------------------------------------------------------

/// Checks a challenge response against timing and confidence floors.
/// Every applicable failure reason is reported, not just the first.
#[derive(Debug, Clone)]
pub struct LivenessVerifier {
    min_confidence: f64,
}

impl LivenessVerifier {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    pub fn verify(&self, response: &ChallengeResponse) -> LivenessOutcome {
        if !response.action_completed {
            return LivenessOutcome {
                verified: false,
                confidence: 0.0,
                reason: "Challenge action not completed".to_string(),
            };
        }

        let mut reasons = Vec::new();
        if response.timing_seconds > MAX_TIMING_SECONDS {
            reasons.push("Response too slow (timeout)".to_string());
        }
        if response.timing_seconds < MIN_TIMING_SECONDS {
            reasons.push("Response too fast (suspicious)".to_string());
        }
        if response.confidence < self.min_confidence {
            reasons.push(format!(
                "Low liveness confidence: {:.2}",
                response.confidence
            ));
        }

        if reasons.is_empty() {
            LivenessOutcome {
                verified: true,
                confidence: response.confidence,
                reason: "Liveness verified successfully".to_string(),
            }
        } else {
            LivenessOutcome {
                verified: false,
                confidence: response.confidence,
                reason: reasons.join("; "),
            }
        }
    }
}

/// Composite liveness score from landmark-level factors, for deployments
/// that process landmarks server-side instead of trusting the client's
/// confidence. Action detection dominates; the result is clamped to 1.0.
pub fn composite_liveness_score(
    action_detected: bool,
    motion_consistency: f64,
    face_quality: f64,
    timing_valid: bool,
) -> f64 {
    let mut score = 0.0;
    if action_detected {
        score += 0.4;
    }
    score += motion_consistency * 0.3;
    score += face_quality * 0.2;
    if timing_valid {
        score += 0.1;
    }
    score.min(1.0)
}
