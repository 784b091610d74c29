use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use vigil_core::{ChallengeId, Timestamp, UserId};

use crate::challenge::ChallengeType;
use crate::error::{LivenessError, LivenessResult};

/// Trailing window used when counting recent failures.
pub const FAILURE_WINDOW_SECONDS: u64 = 600;

// ---------------------------------------------------------------------------
// ChallengeAttempt — one ledger row, written for every verification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeAttempt {
    pub user_id: UserId,
    pub challenge_id: ChallengeId,
    pub challenge_type: ChallengeType,
    pub success: bool,
    pub liveness_verified: bool,
    pub face_matched: bool,
    pub recorded_at: Timestamp,
}

// ---------------------------------------------------------------------------
// AttemptLedger — append-only history of challenge attempts
// ---------------------------------------------------------------------------

/// Append-only record of challenge attempts. The ledger is the replay
/// guard: a (user, challenge) pair that already has a row can never be
/// verified again, whatever the earlier outcome was.
pub trait AttemptLedger: Send + Sync {
    /// True if this user has already submitted this challenge.
    fn has_attempt(&self, user_id: &UserId, challenge_id: &ChallengeId) -> LivenessResult<bool>;

    /// Append one attempt. Rows are never updated or deleted.
    fn record(&self, attempt: ChallengeAttempt) -> LivenessResult<()>;

    /// Failed attempts for this user with `recorded_at` inside the trailing
    /// window ending at `now`. Counted by timestamp comparison; old rows
    /// are not evicted.
    fn recent_failures(
        &self,
        user_id: &UserId,
        window_seconds: u64,
        now: Timestamp,
    ) -> LivenessResult<u32>;
}

// ---------------------------------------------------------------------------
// InMemoryAttemptLedger
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryAttemptLedger {
    attempts: Mutex<Vec<ChallengeAttempt>>,
}

impl InMemoryAttemptLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttemptLedger for InMemoryAttemptLedger {
    fn has_attempt(&self, user_id: &UserId, challenge_id: &ChallengeId) -> LivenessResult<bool> {
        let attempts = self.attempts.lock().map_err(|_| LivenessError::Internal)?;
        Ok(attempts
            .iter()
            .any(|a| a.user_id == *user_id && a.challenge_id == *challenge_id))
    }

    fn record(&self, attempt: ChallengeAttempt) -> LivenessResult<()> {
        let mut attempts = self.attempts.lock().map_err(|_| LivenessError::Internal)?;
        tracing::debug!(
            user_id = %attempt.user_id,
            challenge_id = %attempt.challenge_id,
            success = attempt.success,
            "challenge attempt recorded"
        );
        attempts.push(attempt);
        Ok(())
    }

    fn recent_failures(
        &self,
        user_id: &UserId,
        window_seconds: u64,
        now: Timestamp,
    ) -> LivenessResult<u32> {
        let attempts = self.attempts.lock().map_err(|_| LivenessError::Internal)?;
        Ok(attempts
            .iter()
            .filter(|a| {
                a.user_id == *user_id
                    && !a.success
                    && now.seconds_since(&a.recorded_at) <= window_seconds
            })
            .count() as u32)
    }
}
