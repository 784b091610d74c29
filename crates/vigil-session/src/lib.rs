//! Session risk state machine.
//!
//! `SessionRiskMonitor` owns the per-session decision loop: it scores
//! heartbeats, applies streak hysteresis, runs the facial CAPTCHA
//! orchestration, persists every transition through the versioned session
//! store, and broadcasts the committed state to the user's push channels.
//! Updates for one session are serialized behind a keyed lock.

pub mod audit;
pub mod error;
pub mod fingerprint;
pub mod locks;
pub mod monitor;
pub mod store;

pub use audit::{BehaviorAuditSink, BehaviorRecord, InMemoryBehaviorAudit};
pub use error::{SessionError, SessionResult};
pub use fingerprint::device_fingerprint;
pub use monitor::{
    CaptchaOutcome, CaptchaVerdict, ChallengeSubmission, HeartbeatOutcome, MonitorConfig,
    SessionRiskMonitor,
};
pub use store::{InMemorySessionStore, InMemoryTokenResolver, InMemoryUserStore};
