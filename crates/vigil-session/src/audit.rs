use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use vigil_core::{SessionId, Timestamp, UserId};
use vigil_engine::HeartbeatSignals;

use crate::error::{SessionError, SessionResult};

// ---------------------------------------------------------------------------
// BehaviorRecord — one audited heartbeat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorRecord {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub signals: HeartbeatSignals,
    pub threat_score: f64,
    pub recorded_at: Timestamp,
}

// ---------------------------------------------------------------------------
// BehaviorAuditSink
// ---------------------------------------------------------------------------

/// Append-only sink for heartbeat audit records. The monitor writes one
/// record per evaluated heartbeat; nothing in the decision path reads
/// them back.
pub trait BehaviorAuditSink: Send + Sync {
    fn append(&self, record: BehaviorRecord) -> SessionResult<()>;
}

#[derive(Default)]
pub struct InMemoryBehaviorAudit {
    records: Mutex<Vec<BehaviorRecord>>,
}

impl InMemoryBehaviorAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> SessionResult<Vec<BehaviorRecord>> {
        Ok(self
            .records
            .lock()
            .map_err(|_| SessionError::Internal)?
            .clone())
    }
}

impl BehaviorAuditSink for InMemoryBehaviorAudit {
    fn append(&self, record: BehaviorRecord) -> SessionResult<()> {
        self.records
            .lock()
            .map_err(|_| SessionError::Internal)?
            .push(record);
        Ok(())
    }
}
