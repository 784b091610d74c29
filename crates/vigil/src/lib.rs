//! Vigil root library.
//!
//! Wires the subsystem crates into one running monitor: configuration,
//! the threat scoring engine, the face matcher, the notification
//! broadcaster, the attempt ledger and the session stores, all injected
//! into a single [`SessionRiskMonitor`]. The root binary and embedding
//! applications go through [`VigilState`]; nothing below it reaches for
//! globals.

pub mod config;
pub mod error;

pub use config::VigilConfig;
pub use error::{VigilError, VigilResult};

use std::sync::Arc;

use tracing::info;

use vigil_biometric::{
    derive_sealing_key, seal_vector, BiometricVector, FaceMatcher, SealingKey,
};
use vigil_core::{IdentityResolver, SessionId, SessionSnapshot, SessionStore, UserId, UserRecord};
use vigil_engine::ThreatScoringEngine;
use vigil_liveness::InMemoryAttemptLedger;
use vigil_notify::NotificationBroadcaster;
use vigil_session::{
    device_fingerprint, InMemoryBehaviorAudit, InMemorySessionStore, InMemoryTokenResolver,
    InMemoryUserStore, SessionRiskMonitor,
};

// ---------------------------------------------------------------------------
// Root state
// ---------------------------------------------------------------------------

/// Runtime state for the Vigil orchestrator.
///
/// Created by [`initialize`]. Holds the monitor plus direct handles to the
/// shared collaborators so that callers can register push channels, enroll
/// users and inspect audit output without going through the monitor.
pub struct VigilState {
    pub config: VigilConfig,
    pub monitor: SessionRiskMonitor,
    pub sessions: Arc<InMemorySessionStore>,
    pub users: Arc<InMemoryUserStore>,
    pub ledger: Arc<InMemoryAttemptLedger>,
    pub audit: Arc<InMemoryBehaviorAudit>,
    pub broadcaster: Arc<NotificationBroadcaster>,
    pub resolver: Arc<InMemoryTokenResolver>,
    sealing_key: SealingKey,
}

impl std::fmt::Debug for VigilState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VigilState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Build the full subsystem graph from a validated configuration.
pub fn initialize(config: VigilConfig) -> VigilResult<VigilState> {
    config.validate()?;

    let sealing_key = derive_sealing_key(&config.sealing_secret);
    let sessions = Arc::new(InMemorySessionStore::new());
    let users = Arc::new(InMemoryUserStore::new());
    let ledger = Arc::new(InMemoryAttemptLedger::new());
    let audit = Arc::new(InMemoryBehaviorAudit::new());
    let broadcaster = Arc::new(NotificationBroadcaster::new());
    let resolver = Arc::new(InMemoryTokenResolver::new());

    let monitor = SessionRiskMonitor::new(
        ThreatScoringEngine::new(config.thresholds),
        FaceMatcher::new(sealing_key.clone(), config.thresholds.face_match_distance),
        ledger.clone(),
        sessions.clone(),
        users.clone(),
        broadcaster.clone(),
        audit.clone(),
        config.monitor,
    );

    info!(
        lock_score = config.thresholds.lock_score,
        logout_score = config.thresholds.logout_score,
        face_match_distance = config.thresholds.face_match_distance,
        "vigil initialized"
    );

    Ok(VigilState {
        config,
        monitor,
        sessions,
        users,
        ledger,
        audit,
        broadcaster,
        resolver,
        sealing_key,
    })
}

impl VigilState {
    /// Open a monitored session bound to the client environment seen at
    /// login. The device fingerprint is derived from the user agent and
    /// source address; later heartbeats from the same browser reproduce it.
    pub fn start_session(
        &self,
        session_id: SessionId,
        user_id: UserId,
        user_agent: &str,
        ip_address: &str,
    ) -> VigilResult<SessionSnapshot> {
        let mut snapshot = SessionSnapshot::new(session_id, user_id);
        snapshot.device_fingerprint = Some(device_fingerprint(user_agent, ip_address));
        snapshot.ip_address = Some(ip_address.to_string());
        snapshot.browser_signature = Some(user_agent.to_string());
        self.sessions.insert(snapshot.clone())?;
        info!(
            session_id = %snapshot.session_id,
            user_id = %snapshot.user_id,
            "session started"
        );
        Ok(snapshot)
    }

    /// Validate and seal an enrollment embedding for this user. Replaces
    /// any previous enrollment.
    pub fn enroll_user(&self, user_id: UserId, embedding: Vec<f64>) -> VigilResult<()> {
        let vector = BiometricVector::new(embedding)?;
        let sealed = seal_vector(&self.sealing_key, &vector)?;
        self.users.upsert(UserRecord {
            user_id: user_id.clone(),
            sealed_vector: Some(sealed),
            account_locked: false,
        })?;
        info!(user_id = %user_id, "biometric enrollment stored");
        Ok(())
    }

    /// Bind an opaque bearer credential (issued by the outer auth layer)
    /// to a running session.
    pub fn bind_credential(
        &self,
        credential: &str,
        user_id: UserId,
        session_id: SessionId,
    ) -> VigilResult<()> {
        self.resolver.register(credential, user_id, session_id)?;
        Ok(())
    }

    /// Resolve a bearer credential to its (user, session) pair. Unknown or
    /// revoked credentials are `Unauthenticated`.
    pub fn resolve_session(&self, credential: &str) -> VigilResult<(UserId, SessionId)> {
        Ok(self.resolver.resolve(credential)?)
    }
}
