use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use vigil_core::SessionId;

use crate::error::{SessionError, SessionResult};

// ---------------------------------------------------------------------------
// SessionLocks — keyed write serialization
// ---------------------------------------------------------------------------

/// One mutex per session id. Heartbeats and challenge submissions for the
/// same session take its lock for their whole read-modify-write, which is
/// what keeps two tabs of the same session from losing updates. Locks are
/// created on first use and never removed; the population is bounded by
/// live sessions.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for this session. Callers hold the returned mutex's guard
    /// for the duration of their update.
    pub fn for_session(&self, session_id: &SessionId) -> SessionResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| SessionError::Internal)?;
        Ok(locks
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }
}
