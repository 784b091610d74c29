use crate::error::CoreResult;
use crate::types::{SessionId, SessionSnapshot, UserId, UserRecord};

// ---------------------------------------------------------------------------
// IdentityResolver — maps a bearer credential to its session
//
// Token issuance and verification live outside this workspace. The decision
// core only needs the resolved (user, session) pair; anything else fails
// with CoreError::Unauthenticated.
// ---------------------------------------------------------------------------

pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credential: &str) -> CoreResult<(UserId, SessionId)>;
}

// ---------------------------------------------------------------------------
// SessionStore — persisted session snapshots
//
// `update` is conditional on the snapshot's version: the store rejects a
// write whose version does not match the stored one, which is the minimum
// primitive needed for single-writer-per-session discipline.
// ---------------------------------------------------------------------------

pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &SessionId) -> CoreResult<Option<SessionSnapshot>>;

    /// Persist `snapshot` if its `version` matches the stored version, then
    /// bump the version. Fails with `CoreError::VersionConflict` otherwise.
    fn update(&self, snapshot: &SessionSnapshot) -> CoreResult<SessionSnapshot>;

    /// Insert a new session. Fails if the id already exists.
    fn insert(&self, snapshot: SessionSnapshot) -> CoreResult<()>;

    /// Remove the session row entirely (force-logout). Returns whether a
    /// row was present.
    fn delete(&self, session_id: &SessionId) -> CoreResult<bool>;
}

// ---------------------------------------------------------------------------
// UserStore — enrollment data for the account owner
// ---------------------------------------------------------------------------

pub trait UserStore: Send + Sync {
    fn get_user(&self, user_id: &UserId) -> CoreResult<Option<UserRecord>>;

    /// All users with an enrolled vector, in stable stored order. Used by
    /// face-based identification (auto-login lookup).
    fn enrolled_users(&self) -> CoreResult<Vec<UserRecord>>;
}
