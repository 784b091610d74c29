//! End-to-end integration test: one user's session from login to lockout
//! and back.
//!
//! The story:
//!
//! 1. Dana enrolls a face embedding and opens a session from her laptop
//! 2. Clean heartbeats keep the session ACTIVE at score 0
//! 3. Her camera loses her face for five consecutive heartbeats — the
//!    session locks and every connected tab is told
//! 4. Further heartbeats are refused until she completes a facial CAPTCHA
//! 5. She requests a liveness challenge, performs it, and her live face
//!    matches the sealed enrollment — the session unlocks
//! 6. An attacker replaying her successful challenge is rejected
//! 7. A hijacked session (wrong device, wrong subnet, failed CAPTCHAs)
//!    is terminated outright
//!
//! Everything here runs against the real wiring: AES-256-GCM sealed
//! vectors, the nine-rule scoring engine, streak hysteresis, the attempt
//! ledger and the notification broadcaster.

use std::sync::{Arc, Mutex};

use vigil::{initialize, VigilConfig, VigilState};
use vigil_biometric::EMBEDDING_DIM;
use vigil_core::{SessionId, SessionState, UserId};
use vigil_engine::HeartbeatSignals;
use vigil_notify::{NotifyResult, PushChannel, RiskEvent};
use vigil_session::{CaptchaVerdict, ChallengeSubmission, SessionError};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64)";
const IP: &str = "192.168.1.10";

/// Test channel that records the names of delivered events.
#[derive(Default)]
struct RecordingChannel {
    events: Mutex<Vec<String>>,
}

impl RecordingChannel {
    fn names(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl PushChannel for RecordingChannel {
    fn push(&self, event: &RiskEvent) -> NotifyResult<()> {
        self.events.lock().unwrap().push(event.name().to_string());
        Ok(())
    }
}

fn dana_embedding() -> Vec<f64> {
    vec![0.5; EMBEDDING_DIM]
}

fn state_with_dana() -> (VigilState, SessionId, UserId, Arc<RecordingChannel>) {
    let config = VigilConfig {
        sealing_secret: "integration-secret".into(),
        ..Default::default()
    };
    let state = initialize(config).unwrap();

    let user_id = UserId::new("dana");
    state.enroll_user(user_id.clone(), dana_embedding()).unwrap();

    let snapshot = state
        .start_session(SessionId::new("sess-dana"), user_id.clone(), USER_AGENT, IP)
        .unwrap();

    state
        .bind_credential("tok-dana", user_id.clone(), snapshot.session_id.clone())
        .unwrap();

    let channel = Arc::new(RecordingChannel::default());
    state.broadcaster.register(&user_id, channel.clone()).unwrap();

    (state, snapshot.session_id, user_id, channel)
}

fn clean_signals() -> HeartbeatSignals {
    HeartbeatSignals {
        device_fingerprint: Some(vigil_session::device_fingerprint(USER_AGENT, IP)),
        ip_address: Some(IP.into()),
        camera_ready: true,
        face_present: Some(true),
        ..Default::default()
    }
}

#[test]
fn session_locks_on_lost_face_and_unlocks_after_captcha() {
    let (state, session_id, user_id, channel) = state_with_dana();

    // Her bearer token resolves to the session every heartbeat rides on.
    let (resolved_user, resolved_session) = state.resolve_session("tok-dana").unwrap();
    assert_eq!(resolved_user, user_id);
    assert_eq!(resolved_session, session_id);
    assert!(state.resolve_session("tok-forged").is_err());

    // Chapter 2: clean heartbeats keep the session healthy.
    for _ in 0..3 {
        let outcome = state
            .monitor
            .evaluate_heartbeat(&session_id, clean_signals(), 0.0)
            .unwrap();
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.state, SessionState::Active);
    }

    // Chapter 3: the face disappears. Four frames of debounce, then lock.
    let no_face = HeartbeatSignals {
        face_present: Some(false),
        ..clean_signals()
    };
    for _ in 0..4 {
        let outcome = state
            .monitor
            .evaluate_heartbeat(&session_id, no_face.clone(), 0.0)
            .unwrap();
        assert_ne!(outcome.state, SessionState::Locked);
    }
    let locked = state
        .monitor
        .evaluate_heartbeat(&session_id, no_face, 0.0)
        .unwrap();
    assert_eq!(locked.state, SessionState::Locked);
    assert!(locked.score >= 75.0);
    assert!(locked.requires_facial_captcha);

    // Every tab heard about the lock.
    let names = channel.names();
    assert!(names.contains(&"session:lock".to_string()));
    assert!(names.contains(&"threat:update".to_string()));

    // Chapter 4: heartbeats are refused while locked.
    let err = state
        .monitor
        .evaluate_heartbeat(&session_id, clean_signals(), 0.0)
        .unwrap_err();
    assert!(matches!(err, SessionError::SessionLocked));

    // Chapter 5: she completes a liveness challenge with her real face.
    let challenge = state.monitor.issue_challenge(&session_id).unwrap();
    assert!((5..=8).contains(&challenge.time_limit_seconds));
    assert!(!challenge.instruction.is_empty());

    let outcome = state
        .monitor
        .verify_challenge(
            &session_id,
            ChallengeSubmission {
                challenge_id: challenge.challenge_id.clone(),
                challenge_type: challenge.challenge_type,
                action_completed: true,
                timing_seconds: 3.2,
                confidence: 0.92,
                live_embedding: dana_embedding(),
            },
        )
        .unwrap();
    assert_eq!(outcome.verdict, CaptchaVerdict::Pass);
    assert!(outcome.success);

    let view = state.monitor.threat_score(&session_id).unwrap();
    assert_eq!(view.state, SessionState::Active);
    assert!(!view.requires_facial_captcha);

    // Heartbeats flow again.
    state
        .monitor
        .evaluate_heartbeat(&session_id, clean_signals(), 0.0)
        .unwrap();

    // Chapter 6: replaying the successful challenge is rejected.
    let replay = state
        .monitor
        .verify_challenge(
            &session_id,
            ChallengeSubmission {
                challenge_id: challenge.challenge_id,
                challenge_type: challenge.challenge_type,
                action_completed: true,
                timing_seconds: 3.2,
                confidence: 0.92,
                live_embedding: dana_embedding(),
            },
        )
        .unwrap_err();
    assert!(matches!(replay, SessionError::ReplayDetected));

    assert!(channel.names().contains(&"security:face_verified".to_string()));
}

#[test]
fn hijacked_session_is_terminated() {
    let (state, session_id, _user_id, channel) = state_with_dana();

    // Chapter 7: wrong device, wrong subnet, two failed CAPTCHAs already.
    // 40 + 25 + 90 pushes far past the logout threshold.
    let hostile = HeartbeatSignals {
        device_fingerprint: Some("someone-elses-laptop".into()),
        ip_address: Some("203.0.113.50".into()),
        captcha_failures: 2,
        camera_ready: true,
        face_present: Some(true),
        ..Default::default()
    };

    let err = state
        .monitor
        .evaluate_heartbeat(&session_id, hostile, 0.0)
        .unwrap_err();
    assert!(matches!(err, SessionError::Terminated));

    // The session row is gone; the monitor no longer knows it.
    let err = state.monitor.threat_score(&session_id).unwrap_err();
    assert!(matches!(err, SessionError::SessionNotFound));

    let names = channel.names();
    assert!(names.contains(&"security:alert".to_string()));
}

#[test]
fn behavioral_audit_captures_every_heartbeat() {
    let (state, session_id, _user_id, _channel) = state_with_dana();

    for _ in 0..3 {
        state
            .monitor
            .evaluate_heartbeat(&session_id, clean_signals(), 0.0)
            .unwrap();
    }

    let records = state.audit.records().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.session_id == session_id));
    assert!(records.iter().all(|r| r.threat_score == 0.0));
}
