use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vigil_biometric::FaceMatcher;
use vigil_core::{
    ChallengeId, RecommendedAction, ScoreBreakdown, SessionId, SessionState, SessionStore,
    ThreatTrigger, Timestamp, UserId, UserStore,
};
use vigil_engine::{HeartbeatSignals, SessionBinding, ThreatScoringEngine};
use vigil_liveness::{
    AttemptLedger, Challenge, ChallengeAttempt, ChallengeIssuer, ChallengeResponse, ChallengeType,
    LivenessVerifier, SlidingWindowCounter,
};
use vigil_notify::{NotificationBroadcaster, RiskEvent};

use crate::audit::{BehaviorAuditSink, BehaviorRecord};
use crate::error::{SessionError, SessionResult};
use crate::locks::SessionLocks;

/// Threat-score penalty for a failed or high-risk CAPTCHA verdict.
const CAPTCHA_PENALTY: f64 = 45.0;

// ---------------------------------------------------------------------------
// MonitorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Consecutive no-face heartbeats (camera ready) that force a lock.
    pub no_face_lock_streak: u32,
    /// Consecutive multi-face heartbeats that force a lock.
    pub multi_face_lock_streak: u32,
    /// Failed CAPTCHA attempts tolerated inside the failure window.
    pub max_captcha_attempts: u32,
    pub failure_window_seconds: u64,
    /// Challenge issuance rate limit per user.
    pub issuance_limit: usize,
    pub issuance_window_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            no_face_lock_streak: 5,
            multi_face_lock_streak: 3,
            max_captcha_attempts: 3,
            failure_window_seconds: 600,
            issuance_limit: 5,
            issuance_window_seconds: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatOutcome {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub triggers: Vec<ThreatTrigger>,
    pub recommended_action: RecommendedAction,
    pub requires_facial_captcha: bool,
    pub state: SessionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptchaVerdict {
    Pass,
    HighRisk,
    Fail,
}

impl CaptchaVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptchaVerdict::Pass => "PASS",
            CaptchaVerdict::HighRisk => "HIGH_RISK",
            CaptchaVerdict::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for CaptchaVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A completed challenge as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSubmission {
    pub challenge_id: ChallengeId,
    pub challenge_type: ChallengeType,
    pub action_completed: bool,
    pub timing_seconds: f64,
    pub confidence: f64,
    /// Raw live embedding, quality-validated before anything else runs.
    pub live_embedding: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaOutcome {
    pub verdict: CaptchaVerdict,
    pub success: bool,
    pub face_matched: bool,
    pub liveness_verified: bool,
    pub message: String,
    pub new_threat_score: f64,
}

// ---------------------------------------------------------------------------
// SessionRiskMonitor
// ---------------------------------------------------------------------------

/// The session risk state machine.
///
/// One shared instance drives every session. Collaborators are injected:
/// the scoring engine and matcher are stateless, the stores and the
/// broadcaster are shared live state. Per-session updates are serialized
/// by keyed locks, and every committed transition is broadcast afterwards,
/// never before.
pub struct SessionRiskMonitor {
    engine: ThreatScoringEngine,
    matcher: FaceMatcher,
    issuer: ChallengeIssuer,
    verifier: LivenessVerifier,
    ledger: Arc<dyn AttemptLedger>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    broadcaster: Arc<NotificationBroadcaster>,
    audit: Arc<dyn BehaviorAuditSink>,
    issuance_limiter: SlidingWindowCounter,
    locks: SessionLocks,
    config: MonitorConfig,
}

impl SessionRiskMonitor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: ThreatScoringEngine,
        matcher: FaceMatcher,
        ledger: Arc<dyn AttemptLedger>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        broadcaster: Arc<NotificationBroadcaster>,
        audit: Arc<dyn BehaviorAuditSink>,
        config: MonitorConfig,
    ) -> Self {
        let verifier = LivenessVerifier::new(engine.thresholds().liveness_confidence);
        let issuance_limiter =
            SlidingWindowCounter::new(config.issuance_window_seconds, config.issuance_limit);
        Self {
            engine,
            matcher,
            issuer: ChallengeIssuer::new(),
            verifier,
            ledger,
            sessions,
            users,
            broadcaster,
            audit,
            issuance_limiter,
            locks: SessionLocks::new(),
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Heartbeat evaluation
    // -----------------------------------------------------------------------

    /// Score one heartbeat, apply streak hysteresis, transition the session,
    /// persist, then broadcast.
    ///
    /// A FORCE_LOGOUT outcome removes the session row and surfaces as
    /// [`SessionError::Terminated`]; callers must treat that as an
    /// authentication failure.
    pub fn evaluate_heartbeat(
        &self,
        session_id: &SessionId,
        signals: HeartbeatSignals,
        ml_score: f64,
    ) -> SessionResult<HeartbeatOutcome> {
        let session_lock = self.locks.for_session(session_id)?;
        let _guard = session_lock.lock().map_err(|_| SessionError::Internal)?;

        let mut snapshot = self
            .sessions
            .get(session_id)?
            .ok_or(SessionError::SessionNotFound)?;
        if snapshot.is_locked {
            return Err(SessionError::SessionLocked);
        }

        let user = self
            .users
            .get_user(&snapshot.user_id)?
            .ok_or(SessionError::UserNotFound)?;

        // An unreadable stored vector degrades to "nothing enrolled" here;
        // only CAPTCHA verification treats a decrypt failure as a mismatch.
        let stored_vector = user.sealed_vector.as_deref().and_then(|sealed| {
            match self.matcher.unseal_enrolled(sealed) {
                Ok(v) => Some(v),
                Err(err) => {
                    warn!(
                        user_id = %user.user_id,
                        error = %err,
                        "stored vector unreadable, scoring without it"
                    );
                    None
                }
            }
        });

        let signals = signals.camera_gated();
        let binding = SessionBinding {
            device_fingerprint: snapshot.device_fingerprint.clone(),
            ip_address: snapshot.ip_address.clone(),
            browser_signature: snapshot.browser_signature.clone(),
            created_at: snapshot.created_at,
            stored_vector,
        };
        let assessment = self.engine.evaluate(&binding, &signals, ml_score);
        let thresholds = *self.engine.thresholds();
        let now = assessment.evaluated_at;

        // Streaks debounce single-frame camera noise. They only advance
        // while the camera actually reports.
        if signals.camera_ready {
            if signals.face_present == Some(false) {
                snapshot.no_face_streak += 1;
            } else {
                snapshot.no_face_streak = 0;
            }
            if signals.multiple_faces {
                snapshot.multi_face_streak += 1;
            } else {
                snapshot.multi_face_streak = 0;
            }
        } else {
            snapshot.no_face_streak = 0;
            snapshot.multi_face_streak = 0;
        }

        let mut score = assessment.score;
        let mut triggers = assessment.triggers;
        let mut action = assessment.recommended_action;

        let mut force_lock = false;
        if signals.camera_ready && snapshot.no_face_streak >= self.config.no_face_lock_streak {
            force_lock = true;
            if !triggers.contains(&ThreatTrigger::NoFace) {
                triggers.push(ThreatTrigger::NoFace);
            }
        }
        if signals.camera_ready && snapshot.multi_face_streak >= self.config.multi_face_lock_streak
        {
            force_lock = true;
            if !triggers.contains(&ThreatTrigger::MultipleFaces) {
                triggers.push(ThreatTrigger::MultipleFaces);
            }
        }
        if force_lock {
            score = score.max(thresholds.lock_score);
            action = RecommendedAction::LockSession;
        }

        // A live-face mismatch demands a CAPTCHA even when the numeric
        // action alone would not.
        let face_mismatch = triggers.contains(&ThreatTrigger::FaceMismatch);
        let requires_captcha =
            force_lock || face_mismatch || score >= thresholds.lock_score;

        if action == RecommendedAction::ForceLogout {
            self.sessions.delete(session_id)?;
            self.audit.append(BehaviorRecord {
                user_id: snapshot.user_id.clone(),
                session_id: session_id.clone(),
                signals,
                threat_score: score,
                recorded_at: now,
            })?;
            self.deliver(
                &snapshot.user_id,
                &RiskEvent::threat_update(score, &triggers, action, requires_captcha),
            );
            self.deliver(
                &snapshot.user_id,
                &RiskEvent::security_alert(
                    "session_terminated",
                    "Session terminated due to high security risk",
                ),
            );
            info!(session_id = %session_id, score, "session terminated");
            return Err(SessionError::Terminated);
        }

        snapshot.threat_score = score;
        snapshot.breakdown = assessment.breakdown;
        snapshot.triggers = triggers.clone();
        snapshot.recommended_action = action;
        snapshot.last_heartbeat = Some(now);
        if requires_captcha {
            snapshot.requires_facial_captcha = true;
        }
        match action {
            RecommendedAction::LockSession => {
                snapshot.is_locked = true;
                snapshot.requires_facial_captcha = true;
                snapshot.state = SessionState::Locked;
            }
            RecommendedAction::IncreaseMonitoring => {
                snapshot.state = SessionState::Monitoring;
            }
            RecommendedAction::Continue => {
                snapshot.state = SessionState::Active;
            }
            // Handled by the early return above.
            RecommendedAction::ForceLogout => {}
        }

        let updated = self.sessions.update(&snapshot)?;
        self.audit.append(BehaviorRecord {
            user_id: updated.user_id.clone(),
            session_id: session_id.clone(),
            signals,
            threat_score: score,
            recorded_at: now,
        })?;

        self.deliver(
            &updated.user_id,
            &RiskEvent::threat_update(score, &triggers, action, updated.requires_facial_captcha),
        );
        if updated.is_locked {
            let reason = triggers
                .first()
                .map(|t| t.description().to_string())
                .unwrap_or_else(|| "Threat score exceeded lock threshold".to_string());
            self.deliver(&updated.user_id, &RiskEvent::session_lock(reason));
        } else if triggers.contains(&ThreatTrigger::MultipleFaces) {
            self.deliver(
                &updated.user_id,
                &RiskEvent::camera_warning("Multiple faces detected"),
            );
        } else if triggers.contains(&ThreatTrigger::CameraBlocked) {
            self.deliver(
                &updated.user_id,
                &RiskEvent::camera_warning("Camera blocked or covered"),
            );
        }

        Ok(HeartbeatOutcome {
            score,
            breakdown: updated.breakdown,
            triggers,
            recommended_action: action,
            requires_facial_captcha: updated.requires_facial_captcha,
            state: updated.state,
        })
    }

    /// Read-only view of the persisted risk state. No evaluation runs.
    pub fn threat_score(&self, session_id: &SessionId) -> SessionResult<HeartbeatOutcome> {
        let snapshot = self
            .sessions
            .get(session_id)?
            .ok_or(SessionError::SessionNotFound)?;
        Ok(HeartbeatOutcome {
            score: snapshot.threat_score,
            breakdown: snapshot.breakdown,
            triggers: snapshot.triggers,
            recommended_action: snapshot.recommended_action,
            requires_facial_captcha: snapshot.requires_facial_captcha,
            state: snapshot.state,
        })
    }

    // -----------------------------------------------------------------------
    // Facial CAPTCHA flow — the only operations allowed on a locked session
    // -----------------------------------------------------------------------

    /// Issue a fresh challenge. Nothing is persisted until an attempt is
    /// submitted; the issuance rate limit is per user.
    pub fn issue_challenge(&self, session_id: &SessionId) -> SessionResult<Challenge> {
        let snapshot = self
            .sessions
            .get(session_id)?
            .ok_or(SessionError::SessionNotFound)?;
        self.issuance_limiter
            .try_acquire(snapshot.user_id.as_str(), Timestamp::now())?;
        Ok(self.issuer.issue())
    }

    /// Verify a submitted challenge: replay guard, failure rate limit,
    /// embedding quality, liveness, face match, verdict. The attempt is
    /// recorded whatever the verdict; input-validation failures record
    /// nothing.
    pub fn verify_challenge(
        &self,
        session_id: &SessionId,
        submission: ChallengeSubmission,
    ) -> SessionResult<CaptchaOutcome> {
        let session_lock = self.locks.for_session(session_id)?;
        let _guard = session_lock.lock().map_err(|_| SessionError::Internal)?;

        let mut snapshot = self
            .sessions
            .get(session_id)?
            .ok_or(SessionError::SessionNotFound)?;
        let user = self
            .users
            .get_user(&snapshot.user_id)?
            .ok_or(SessionError::UserNotFound)?;
        let now = Timestamp::now();

        if self
            .ledger
            .has_attempt(&snapshot.user_id, &submission.challenge_id)?
        {
            return Err(SessionError::ReplayDetected);
        }

        let recent_failures = self.ledger.recent_failures(
            &snapshot.user_id,
            self.config.failure_window_seconds,
            now,
        )?;
        if recent_failures >= self.config.max_captcha_attempts {
            warn!(
                user_id = %snapshot.user_id,
                recent_failures,
                "captcha verification rate limited"
            );
            return Err(SessionError::RateLimited);
        }

        let live = self.matcher.quality(submission.live_embedding)?;

        let liveness = self.verifier.verify(&ChallengeResponse {
            action_completed: submission.action_completed,
            timing_seconds: submission.timing_seconds,
            confidence: submission.confidence,
        });

        // No enrolled vector: nothing to compare against, fail open.
        // Decrypt failure inside match_sealed is a mismatch, fail safe.
        let face_matched = match user.sealed_vector.as_deref() {
            None => true,
            Some(sealed) => self.matcher.match_sealed(&live, sealed).matched(),
        };

        let thresholds = self.engine.thresholds();
        let mut newly_locked = false;
        let (verdict, success, message) = if face_matched && liveness.verified {
            snapshot.is_locked = false;
            snapshot.requires_facial_captcha = false;
            snapshot.state = SessionState::Active;
            (
                CaptchaVerdict::Pass,
                true,
                "Facial CAPTCHA verified successfully".to_string(),
            )
        } else if face_matched {
            snapshot.threat_score = (snapshot.threat_score + CAPTCHA_PENALTY).min(100.0);
            (
                CaptchaVerdict::HighRisk,
                false,
                format!("Liveness verification failed: {}", liveness.reason),
            )
        } else {
            snapshot.threat_score = (snapshot.threat_score + CAPTCHA_PENALTY).min(100.0);
            if snapshot.threat_score >= thresholds.lock_score {
                newly_locked = !snapshot.is_locked;
                snapshot.is_locked = true;
                snapshot.requires_facial_captcha = true;
                snapshot.state = SessionState::Locked;
            }
            (
                CaptchaVerdict::Fail,
                false,
                "Face verification failed".to_string(),
            )
        };

        let updated = self.sessions.update(&snapshot)?;

        self.ledger.record(ChallengeAttempt {
            user_id: updated.user_id.clone(),
            challenge_id: submission.challenge_id.clone(),
            challenge_type: submission.challenge_type,
            success,
            liveness_verified: liveness.verified,
            face_matched,
            recorded_at: now,
        })?;

        self.deliver(
            &updated.user_id,
            &RiskEvent::face_verification(success, verdict.as_str()),
        );
        if newly_locked {
            self.deliver(
                &updated.user_id,
                &RiskEvent::session_lock("Facial CAPTCHA verification failed"),
            );
        }

        info!(
            session_id = %session_id,
            challenge_id = %submission.challenge_id,
            verdict = verdict.as_str(),
            new_threat_score = updated.threat_score,
            "captcha verification complete"
        );

        Ok(CaptchaOutcome {
            verdict,
            success,
            face_matched,
            liveness_verified: liveness.verified,
            message,
            new_threat_score: updated.threat_score,
        })
    }

    // -----------------------------------------------------------------------
    // Face-based identification (auto-login lookup)
    // -----------------------------------------------------------------------

    /// Identify a user by face alone: best enrolled match under the
    /// configured distance, skipping locked accounts.
    pub fn identify_by_face(
        &self,
        live_embedding: Vec<f64>,
    ) -> SessionResult<Option<(UserId, f64)>> {
        let live = self.matcher.quality(live_embedding)?;
        let candidates: Vec<(UserId, String)> = self
            .users
            .enrolled_users()?
            .into_iter()
            .filter(|u| !u.account_locked)
            .filter_map(|u| u.sealed_vector.map(|sealed| (u.user_id, sealed)))
            .collect();
        Ok(self.matcher.find_best_match(&candidates, &live))
    }

    fn deliver(&self, user_id: &UserId, event: &RiskEvent) {
        if let Err(err) = self.broadcaster.send(user_id, event) {
            warn!(
                user_id = %user_id,
                event = event.name(),
                error = %err,
                "broadcast failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use vigil_biometric::{derive_sealing_key, seal_vector, BiometricVector, EMBEDDING_DIM};
    use vigil_core::{SessionSnapshot, Thresholds, UserRecord};
    use vigil_liveness::InMemoryAttemptLedger;

    use crate::audit::InMemoryBehaviorAudit;
    use crate::store::{InMemorySessionStore, InMemoryUserStore};

    const SECRET: &str = "test-secret";

    /// Push channel that records delivered event names.
    #[derive(Default)]
    struct RecordingChannel {
        events: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingChannel {
        fn names(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl vigil_notify::PushChannel for RecordingChannel {
        fn push(&self, event: &RiskEvent) -> vigil_notify::NotifyResult<()> {
            self.events.lock().unwrap().push(event.name().to_string());
            Ok(())
        }
    }

    struct Harness {
        monitor: SessionRiskMonitor,
        sessions: Arc<InMemorySessionStore>,
        users: Arc<InMemoryUserStore>,
        ledger: Arc<InMemoryAttemptLedger>,
        audit: Arc<InMemoryBehaviorAudit>,
        broadcaster: Arc<NotificationBroadcaster>,
    }

    fn harness() -> Harness {
        let sessions = Arc::new(InMemorySessionStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let ledger = Arc::new(InMemoryAttemptLedger::new());
        let audit = Arc::new(InMemoryBehaviorAudit::new());
        let broadcaster = Arc::new(NotificationBroadcaster::new());
        let thresholds = Thresholds::default();
        let monitor = SessionRiskMonitor::new(
            ThreatScoringEngine::new(thresholds),
            FaceMatcher::new(derive_sealing_key(SECRET), thresholds.face_match_distance),
            ledger.clone(),
            sessions.clone(),
            users.clone(),
            broadcaster.clone(),
            audit.clone(),
            MonitorConfig::default(),
        );
        Harness {
            monitor,
            sessions,
            users,
            ledger,
            audit,
            broadcaster,
        }
    }

    fn enrolled_vector() -> BiometricVector {
        BiometricVector::new(vec![0.5; EMBEDDING_DIM]).unwrap()
    }

    fn offset_embedding(offset: f64) -> Vec<f64> {
        let mut values = vec![0.5; EMBEDDING_DIM];
        values[0] += offset;
        values
    }

    fn seed_session(h: &Harness, enrolled: bool) -> SessionId {
        let session_id = SessionId::new("s-1");
        let user_id = UserId::new("u-1");
        let mut snapshot = SessionSnapshot::new(session_id.clone(), user_id.clone());
        snapshot.device_fingerprint = Some("fp-1".into());
        snapshot.ip_address = Some("192.168.1.10".into());
        h.sessions.insert(snapshot).unwrap();

        let sealed = if enrolled {
            Some(seal_vector(&derive_sealing_key(SECRET), &enrolled_vector()).unwrap())
        } else {
            None
        };
        h.users
            .upsert(UserRecord {
                user_id,
                sealed_vector: sealed,
                account_locked: false,
            })
            .unwrap();
        session_id
    }

    fn clean_signals() -> HeartbeatSignals {
        HeartbeatSignals {
            device_fingerprint: Some("fp-1".into()),
            ip_address: Some("192.168.1.10".into()),
            camera_ready: true,
            face_present: Some(true),
            ..Default::default()
        }
    }

    fn no_face_signals() -> HeartbeatSignals {
        HeartbeatSignals {
            face_present: Some(false),
            ..clean_signals()
        }
    }

    fn good_submission(challenge_id: &str) -> ChallengeSubmission {
        ChallengeSubmission {
            challenge_id: ChallengeId::new(challenge_id),
            challenge_type: ChallengeType::BlinkEyes,
            action_completed: true,
            timing_seconds: 3.0,
            confidence: 0.9,
            live_embedding: vec![0.5; EMBEDDING_DIM],
        }
    }

    fn set_score(h: &Harness, session_id: &SessionId, score: f64) {
        let mut snap = h.sessions.get(session_id).unwrap().unwrap();
        snap.threat_score = score;
        h.sessions.update(&snap).unwrap();
    }

    fn lock_session(h: &Harness, session_id: &SessionId) {
        let mut snap = h.sessions.get(session_id).unwrap().unwrap();
        snap.is_locked = true;
        snap.requires_facial_captcha = true;
        snap.state = SessionState::Locked;
        h.sessions.update(&snap).unwrap();
    }

    #[test]
    fn clean_heartbeat_continues() {
        let h = harness();
        let sid = seed_session(&h, false);
        let outcome = h
            .monitor
            .evaluate_heartbeat(&sid, clean_signals(), 0.0)
            .unwrap();
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.recommended_action, RecommendedAction::Continue);
        assert_eq!(outcome.state, SessionState::Active);
        assert!(!outcome.requires_facial_captcha);
        assert_eq!(h.audit.records().unwrap().len(), 1);
    }

    #[test]
    fn device_mismatch_alone_scores_forty_and_continues() {
        let h = harness();
        let sid = seed_session(&h, false);
        let signals = HeartbeatSignals {
            device_fingerprint: Some("fp-other".into()),
            ..clean_signals()
        };
        let outcome = h.monitor.evaluate_heartbeat(&sid, signals, 0.0).unwrap();
        assert_eq!(outcome.score, 40.0);
        assert_eq!(
            outcome.recommended_action,
            RecommendedAction::IncreaseMonitoring
        );
        assert_eq!(outcome.state, SessionState::Monitoring);
        assert!(outcome.triggers.contains(&ThreatTrigger::DeviceMismatch));
    }

    #[test]
    fn locked_session_rejects_heartbeat() {
        let h = harness();
        let sid = seed_session(&h, false);
        lock_session(&h, &sid);
        let err = h
            .monitor
            .evaluate_heartbeat(&sid, clean_signals(), 0.0)
            .unwrap_err();
        assert!(matches!(err, SessionError::SessionLocked));
    }

    #[test]
    fn unknown_session_not_found() {
        let h = harness();
        let err = h
            .monitor
            .evaluate_heartbeat(&SessionId::new("nope"), clean_signals(), 0.0)
            .unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound));
    }

    #[test]
    fn five_no_face_heartbeats_force_lock() {
        let h = harness();
        let sid = seed_session(&h, false);

        for _ in 0..4 {
            let outcome = h
                .monitor
                .evaluate_heartbeat(&sid, no_face_signals(), 0.0)
                .unwrap();
            assert_ne!(outcome.state, SessionState::Locked);
        }
        let outcome = h
            .monitor
            .evaluate_heartbeat(&sid, no_face_signals(), 0.0)
            .unwrap();
        assert_eq!(outcome.recommended_action, RecommendedAction::LockSession);
        assert_eq!(outcome.state, SessionState::Locked);
        assert!(outcome.score >= 75.0);
        assert!(outcome.requires_facial_captcha);
        assert!(outcome.triggers.contains(&ThreatTrigger::NoFace));

        let snap = h.sessions.get(&sid).unwrap().unwrap();
        assert!(snap.is_locked);
        assert_eq!(snap.no_face_streak, 5);
    }

    #[test]
    fn streak_resets_when_face_returns() {
        let h = harness();
        let sid = seed_session(&h, false);

        h.monitor
            .evaluate_heartbeat(&sid, no_face_signals(), 0.0)
            .unwrap();
        let outcome = h
            .monitor
            .evaluate_heartbeat(&sid, clean_signals(), 0.0)
            .unwrap();
        assert_ne!(outcome.state, SessionState::Locked);

        let snap = h.sessions.get(&sid).unwrap().unwrap();
        assert_eq!(snap.no_face_streak, 0);
    }

    #[test]
    fn camera_not_ready_never_advances_streaks() {
        let h = harness();
        let sid = seed_session(&h, false);
        let signals = HeartbeatSignals {
            camera_ready: false,
            face_present: Some(false),
            ..clean_signals()
        };
        for _ in 0..10 {
            h.monitor
                .evaluate_heartbeat(&sid, signals.clone(), 0.0)
                .unwrap();
        }
        let snap = h.sessions.get(&sid).unwrap().unwrap();
        assert_eq!(snap.no_face_streak, 0);
        assert!(!snap.is_locked);
    }

    #[test]
    fn three_multi_face_heartbeats_force_lock() {
        let h = harness();
        let sid = seed_session(&h, false);
        let signals = HeartbeatSignals {
            multiple_faces: true,
            ..clean_signals()
        };
        for _ in 0..2 {
            let outcome = h
                .monitor
                .evaluate_heartbeat(&sid, signals.clone(), 0.0)
                .unwrap();
            assert_ne!(outcome.state, SessionState::Locked);
        }
        let outcome = h.monitor.evaluate_heartbeat(&sid, signals, 0.0).unwrap();
        assert_eq!(outcome.state, SessionState::Locked);
        assert!(outcome.triggers.contains(&ThreatTrigger::MultipleFaces));
    }

    #[test]
    fn camera_anomaly_warns_before_locking() {
        let h = harness();
        let sid = seed_session(&h, false);
        let channel = Arc::new(RecordingChannel::default());
        h.broadcaster
            .register(&UserId::new("u-1"), channel.clone())
            .unwrap();

        let signals = HeartbeatSignals {
            multiple_faces: true,
            ..clean_signals()
        };
        let outcome = h.monitor.evaluate_heartbeat(&sid, signals, 0.0).unwrap();
        assert_ne!(outcome.state, SessionState::Locked);

        let names = channel.names();
        assert!(names.contains(&"camera:warning".to_string()));
        assert!(!names.contains(&"session:lock".to_string()));
    }

    #[test]
    fn force_logout_terminates_and_deletes_session() {
        let h = harness();
        let sid = seed_session(&h, false);
        let signals = HeartbeatSignals {
            captcha_failures: 2, // 90 points, past the logout threshold
            ..clean_signals()
        };
        let err = h.monitor.evaluate_heartbeat(&sid, signals, 0.0).unwrap_err();
        assert!(matches!(err, SessionError::Terminated));
        assert!(h.sessions.get(&sid).unwrap().is_none());
        // The terminating heartbeat is still audited.
        assert_eq!(h.audit.records().unwrap().len(), 1);
    }

    #[test]
    fn face_mismatch_forces_captcha_below_lock_score() {
        let h = harness();
        let sid = seed_session(&h, true);
        let signals = HeartbeatSignals {
            live_vector: Some(BiometricVector::new(offset_embedding(0.60)).unwrap()),
            ..clean_signals()
        };
        let outcome = h.monitor.evaluate_heartbeat(&sid, signals, 0.0).unwrap();
        assert_eq!(outcome.score, 50.0);
        assert_ne!(outcome.state, SessionState::Locked);
        assert!(outcome.requires_facial_captcha);
        assert!(outcome.triggers.contains(&ThreatTrigger::FaceMismatch));
    }

    #[test]
    fn unreadable_stored_vector_scores_without_it() {
        let h = harness();
        let sid = seed_session(&h, false);
        h.users
            .upsert(UserRecord {
                user_id: UserId::new("u-1"),
                sealed_vector: Some("deadbeef".into()),
                account_locked: false,
            })
            .unwrap();
        let signals = HeartbeatSignals {
            live_vector: Some(enrolled_vector()),
            ..clean_signals()
        };
        let outcome = h.monitor.evaluate_heartbeat(&sid, signals, 0.0).unwrap();
        assert_eq!(outcome.score, 0.0);
        assert!(!outcome.triggers.contains(&ThreatTrigger::FaceMismatch));
    }

    #[test]
    fn verify_pass_unlocks_session() {
        let h = harness();
        let sid = seed_session(&h, true);
        lock_session(&h, &sid);

        let outcome = h
            .monitor
            .verify_challenge(&sid, good_submission("BLINK_EYES_1"))
            .unwrap();
        assert_eq!(outcome.verdict, CaptchaVerdict::Pass);
        assert!(outcome.success);
        assert!(outcome.face_matched);
        assert!(outcome.liveness_verified);

        let snap = h.sessions.get(&sid).unwrap().unwrap();
        assert!(!snap.is_locked);
        assert!(!snap.requires_facial_captcha);
        assert_eq!(snap.state, SessionState::Active);
    }

    #[test]
    fn verify_near_threshold_distance_still_passes() {
        let h = harness();
        let sid = seed_session(&h, true);
        lock_session(&h, &sid);

        // Distance 0.54, just under the 0.55 match threshold.
        let submission = ChallengeSubmission {
            live_embedding: offset_embedding(0.54),
            ..good_submission("SMILE_1")
        };
        let outcome = h.monitor.verify_challenge(&sid, submission).unwrap();
        assert_eq!(outcome.verdict, CaptchaVerdict::Pass);
        assert!(!h.sessions.get(&sid).unwrap().unwrap().requires_facial_captcha);
    }

    #[test]
    fn verify_high_risk_adds_penalty_without_lock() {
        let h = harness();
        let sid = seed_session(&h, true);

        let submission = ChallengeSubmission {
            confidence: 0.3,
            ..good_submission("SMILE_2")
        };
        let outcome = h.monitor.verify_challenge(&sid, submission).unwrap();
        assert_eq!(outcome.verdict, CaptchaVerdict::HighRisk);
        assert!(!outcome.success);
        assert!(outcome.face_matched);
        assert!(!outcome.liveness_verified);
        assert_eq!(outcome.new_threat_score, 45.0);
        assert!(outcome.message.contains("Low liveness confidence"));
        assert!(!h.sessions.get(&sid).unwrap().unwrap().is_locked);
    }

    #[test]
    fn verify_fail_locks_when_threshold_crossed() {
        let h = harness();
        let sid = seed_session(&h, true);
        set_score(&h, &sid, 40.0);

        let submission = ChallengeSubmission {
            live_embedding: offset_embedding(0.60),
            ..good_submission("SMILE_3")
        };
        let outcome = h.monitor.verify_challenge(&sid, submission).unwrap();
        assert_eq!(outcome.verdict, CaptchaVerdict::Fail);
        assert!(!outcome.face_matched);
        assert_eq!(outcome.new_threat_score, 85.0);

        let snap = h.sessions.get(&sid).unwrap().unwrap();
        assert!(snap.is_locked);
        assert_eq!(snap.state, SessionState::Locked);
    }

    #[test]
    fn verify_fail_below_threshold_does_not_lock() {
        let h = harness();
        let sid = seed_session(&h, true);

        let submission = ChallengeSubmission {
            live_embedding: offset_embedding(0.60),
            ..good_submission("SMILE_4")
        };
        let outcome = h.monitor.verify_challenge(&sid, submission).unwrap();
        assert_eq!(outcome.verdict, CaptchaVerdict::Fail);
        assert_eq!(outcome.new_threat_score, 45.0);
        assert!(!h.sessions.get(&sid).unwrap().unwrap().is_locked);
    }

    #[test]
    fn verify_without_enrollment_fails_open_on_face() {
        let h = harness();
        let sid = seed_session(&h, false);
        lock_session(&h, &sid);

        let outcome = h
            .monitor
            .verify_challenge(&sid, good_submission("SMILE_5"))
            .unwrap();
        assert_eq!(outcome.verdict, CaptchaVerdict::Pass);
        assert!(outcome.face_matched);
    }

    #[test]
    fn replay_rejected_on_second_submission() {
        let h = harness();
        let sid = seed_session(&h, true);

        h.monitor
            .verify_challenge(&sid, good_submission("BLINK_EYES_9"))
            .unwrap();
        let err = h
            .monitor
            .verify_challenge(&sid, good_submission("BLINK_EYES_9"))
            .unwrap_err();
        assert!(matches!(err, SessionError::ReplayDetected));

        // No duplicate row was appended.
        assert_eq!(
            h.ledger
                .recent_failures(&UserId::new("u-1"), 600, Timestamp::now())
                .unwrap(),
            0
        );
    }

    #[test]
    fn rate_limited_after_three_recent_failures() {
        let h = harness();
        let sid = seed_session(&h, true);

        for i in 0..3 {
            let submission = ChallengeSubmission {
                live_embedding: offset_embedding(0.60),
                ..good_submission(&format!("SMILE_{i}"))
            };
            let outcome = h.monitor.verify_challenge(&sid, submission).unwrap();
            assert!(!outcome.success);
        }

        // The fourth attempt is refused regardless of its own correctness.
        let err = h
            .monitor
            .verify_challenge(&sid, good_submission("BLINK_EYES_99"))
            .unwrap_err();
        assert!(matches!(err, SessionError::RateLimited));
        assert!(!h
            .ledger
            .has_attempt(&UserId::new("u-1"), &ChallengeId::new("BLINK_EYES_99"))
            .unwrap());
    }

    #[test]
    fn invalid_embedding_records_no_attempt() {
        let h = harness();
        let sid = seed_session(&h, true);

        let submission = ChallengeSubmission {
            live_embedding: vec![0.0; EMBEDDING_DIM],
            ..good_submission("SMILE_7")
        };
        let err = h.monitor.verify_challenge(&sid, submission).unwrap_err();
        assert!(matches!(err, SessionError::InvalidVector(_)));
        assert!(!h
            .ledger
            .has_attempt(&UserId::new("u-1"), &ChallengeId::new("SMILE_7"))
            .unwrap());
    }

    #[test]
    fn issue_challenge_rate_limited_per_user() {
        let h = harness();
        let sid = seed_session(&h, false);
        for _ in 0..5 {
            h.monitor.issue_challenge(&sid).unwrap();
        }
        let err = h.monitor.issue_challenge(&sid).unwrap_err();
        assert!(matches!(err, SessionError::RateLimited));
    }

    #[test]
    fn threat_score_accessor_reflects_persisted_state() {
        let h = harness();
        let sid = seed_session(&h, false);
        let signals = HeartbeatSignals {
            device_fingerprint: Some("fp-other".into()),
            ..clean_signals()
        };
        h.monitor.evaluate_heartbeat(&sid, signals, 0.0).unwrap();

        let view = h.monitor.threat_score(&sid).unwrap();
        assert_eq!(view.score, 40.0);
        assert!(view.triggers.contains(&ThreatTrigger::DeviceMismatch));
        assert_eq!(view.state, SessionState::Monitoring);
    }

    #[test]
    fn identify_by_face_finds_closest_enrolled_user() {
        let h = harness();
        seed_session(&h, true); // u-1 enrolled at 0.5 fill
        let far = BiometricVector::new(offset_embedding(2.0)).unwrap();
        h.users
            .upsert(UserRecord {
                user_id: UserId::new("u-2"),
                sealed_vector: Some(
                    seal_vector(&derive_sealing_key(SECRET), &far).unwrap(),
                ),
                account_locked: false,
            })
            .unwrap();

        let found = h
            .monitor
            .identify_by_face(offset_embedding(0.10))
            .unwrap()
            .unwrap();
        assert_eq!(found.0, UserId::new("u-1"));

        // Nobody close enough.
        assert!(h
            .monitor
            .identify_by_face(offset_embedding(50.0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn identify_by_face_skips_locked_accounts() {
        let h = harness();
        seed_session(&h, true);
        h.users
            .upsert(UserRecord {
                user_id: UserId::new("u-1"),
                sealed_vector: Some(
                    seal_vector(&derive_sealing_key(SECRET), &enrolled_vector()).unwrap(),
                ),
                account_locked: true,
            })
            .unwrap();
        assert!(h
            .monitor
            .identify_by_face(offset_embedding(0.10))
            .unwrap()
            .is_none());
    }
}
