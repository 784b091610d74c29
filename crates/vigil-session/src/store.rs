use std::collections::HashMap;
use std::sync::Mutex;

use vigil_core::{
    CoreError, CoreResult, IdentityResolver, SessionId, SessionSnapshot, SessionStore, UserId,
    UserRecord, UserStore,
};

// ---------------------------------------------------------------------------
// InMemorySessionStore
// ---------------------------------------------------------------------------

/// HashMap-backed session store with version-conditional updates. The
/// reference backend for tests and single-process deployments.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, SessionSnapshot>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, session_id: &SessionId) -> CoreResult<Option<SessionSnapshot>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| CoreError::Store("session store lock poisoned".into()))?;
        Ok(sessions.get(session_id).cloned())
    }

    fn update(&self, snapshot: &SessionSnapshot) -> CoreResult<SessionSnapshot> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| CoreError::Store("session store lock poisoned".into()))?;
        let stored = sessions
            .get_mut(&snapshot.session_id)
            .ok_or(CoreError::SessionNotFound)?;
        if stored.version != snapshot.version {
            return Err(CoreError::VersionConflict);
        }
        let mut updated = snapshot.clone();
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    fn insert(&self, snapshot: SessionSnapshot) -> CoreResult<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| CoreError::Store("session store lock poisoned".into()))?;
        if sessions.contains_key(&snapshot.session_id) {
            return Err(CoreError::Store(format!(
                "session {} already exists",
                snapshot.session_id
            )));
        }
        sessions.insert(snapshot.session_id.clone(), snapshot);
        Ok(())
    }

    fn delete(&self, session_id: &SessionId) -> CoreResult<bool> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| CoreError::Store("session store lock poisoned".into()))?;
        Ok(sessions.remove(session_id).is_some())
    }
}

// ---------------------------------------------------------------------------
// InMemoryUserStore
// ---------------------------------------------------------------------------

/// Vec-backed user store. Insertion order is the stable stored order that
/// `enrolled_users` exposes, which is what makes best-match ties
/// deterministic.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record, preserving its original position
    /// when it already exists.
    pub fn upsert(&self, record: UserRecord) -> CoreResult<()> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| CoreError::Store("user store lock poisoned".into()))?;
        match users.iter_mut().find(|u| u.user_id == record.user_id) {
            Some(existing) => *existing = record,
            None => users.push(record),
        }
        Ok(())
    }
}

impl UserStore for InMemoryUserStore {
    fn get_user(&self, user_id: &UserId) -> CoreResult<Option<UserRecord>> {
        let users = self
            .users
            .lock()
            .map_err(|_| CoreError::Store("user store lock poisoned".into()))?;
        Ok(users.iter().find(|u| u.user_id == *user_id).cloned())
    }

    fn enrolled_users(&self) -> CoreResult<Vec<UserRecord>> {
        let users = self
            .users
            .lock()
            .map_err(|_| CoreError::Store("user store lock poisoned".into()))?;
        Ok(users
            .iter()
            .filter(|u| u.sealed_vector.is_some())
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// InMemoryTokenResolver
// ---------------------------------------------------------------------------

/// Credential → (user, session) lookup. Token issuance and verification
/// belong to the outer auth layer; this resolver only maps already-issued
/// opaque credentials to their session pair, and anything unknown is
/// `Unauthenticated`.
#[derive(Default)]
pub struct InMemoryTokenResolver {
    tokens: Mutex<HashMap<String, (UserId, SessionId)>>,
}

impl InMemoryTokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        credential: impl Into<String>,
        user_id: UserId,
        session_id: SessionId,
    ) -> CoreResult<()> {
        let mut tokens = self
            .tokens
            .lock()
            .map_err(|_| CoreError::Store("token resolver lock poisoned".into()))?;
        tokens.insert(credential.into(), (user_id, session_id));
        Ok(())
    }

    /// Invalidate a credential (logout or termination). Returns whether it
    /// was known.
    pub fn revoke(&self, credential: &str) -> CoreResult<bool> {
        let mut tokens = self
            .tokens
            .lock()
            .map_err(|_| CoreError::Store("token resolver lock poisoned".into()))?;
        Ok(tokens.remove(credential).is_some())
    }
}

impl IdentityResolver for InMemoryTokenResolver {
    fn resolve(&self, credential: &str) -> CoreResult<(UserId, SessionId)> {
        let tokens = self
            .tokens
            .lock()
            .map_err(|_| CoreError::Store("token resolver lock poisoned".into()))?;
        tokens
            .get(credential)
            .cloned()
            .ok_or(CoreError::Unauthenticated)
    }
}
