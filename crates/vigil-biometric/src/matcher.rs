use tracing::warn;
use vigil_core::UserId;

use crate::error::BiometricResult;
use crate::seal::{unseal_vector, SealingKey};
use crate::vector::BiometricVector;

// ---------------------------------------------------------------------------
// MatchVerdict / MatchOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVerdict {
    Match,
    NoMatch,
    /// The stored vector could not be decrypted. Always reported as a
    /// mismatch (fail-safe), never as a match or an internal error.
    DecryptFailed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub verdict: MatchVerdict,
    /// Euclidean distance, absent when decryption failed.
    pub distance: Option<f64>,
}

impl MatchOutcome {
    pub fn matched(&self) -> bool {
        self.verdict == MatchVerdict::Match
    }
}

// ---------------------------------------------------------------------------
// FaceMatcher
// ---------------------------------------------------------------------------

/// Distance-based face matching against sealed enrollment vectors.
///
/// Stateless apart from the sealing key; safe to share behind an `Arc`.
pub struct FaceMatcher {
    sealing_key: SealingKey,
    match_distance: f64,
}

impl FaceMatcher {
    pub fn new(sealing_key: SealingKey, match_distance: f64) -> Self {
        Self {
            sealing_key,
            match_distance,
        }
    }

    /// Validate a caller-supplied raw embedding before any comparison.
    pub fn quality(&self, values: Vec<f64>) -> BiometricResult<BiometricVector> {
        BiometricVector::new(values)
    }

    /// Decrypt a sealed enrollment vector for scoring-time comparison.
    /// Callers on the heartbeat path treat a failure as "nothing enrolled";
    /// verification paths must go through [`FaceMatcher::match_sealed`],
    /// which fails safe instead.
    pub fn unseal_enrolled(&self, sealed: &str) -> BiometricResult<BiometricVector> {
        unseal_vector(&self.sealing_key, sealed)
    }

    /// Compare a live vector against a sealed enrollment vector.
    ///
    /// A decryption error is conservative: the outcome is a mismatch, with
    /// the failure logged for observability. Crypto errors must never make
    /// verification easier.
    pub fn match_sealed(&self, live: &BiometricVector, sealed: &str) -> MatchOutcome {
        let stored = match unseal_vector(&self.sealing_key, sealed) {
            Ok(v) => v,
            Err(err) => {
                warn!(error = %err, "stored vector unseal failed, treating as mismatch");
                return MatchOutcome {
                    verdict: MatchVerdict::DecryptFailed,
                    distance: None,
                };
            }
        };

        let distance = live.distance(&stored);
        let verdict = if distance < self.match_distance {
            MatchVerdict::Match
        } else {
            MatchVerdict::NoMatch
        };
        MatchOutcome {
            verdict,
            distance: Some(distance),
        }
    }

    /// Scan all enrolled vectors and return the minimum-distance match under
    /// the threshold, or None if every candidate misses it.
    ///
    /// Linear over the enrollment population; ties break in stored order
    /// because only a strictly smaller distance replaces the best match.
    /// Candidates whose sealed vector fails to decrypt are skipped.
    pub fn find_best_match(
        &self,
        candidates: &[(UserId, String)],
        live: &BiometricVector,
    ) -> Option<(UserId, f64)> {
        let mut best: Option<(UserId, f64)> = None;
        for (user_id, sealed) in candidates {
            let stored = match unseal_vector(&self.sealing_key, sealed) {
                Ok(v) => v,
                Err(err) => {
                    warn!(user_id = %user_id, error = %err, "skipping candidate with unreadable vector");
                    continue;
                }
            };
            let distance = live.distance(&stored);
            if distance >= self.match_distance {
                continue;
            }
            match &best {
                Some((_, best_distance)) if distance >= *best_distance => {}
                _ => best = Some((user_id.clone(), distance)),
            }
        }
        best
    }
}
