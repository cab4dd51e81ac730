//! Session repository trait and implementations.
//!
//! The trait is the contract the session manager depends on, so alternate
//! storage engines and test doubles can be substituted. Every mutation must be
//! atomic on its own: rotation is a compare-and-swap on the current refresh
//! digest, and blocking is a single update.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use std::sync::Mutex;

use super::errors::{StoreError, StoreResult};
use crate::auth::{NewSession, OwnerId, Rotation, Session, SessionId};

/// Trait for session store operations
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session and return its ID
    async fn create(&self, session: &NewSession) -> StoreResult<SessionId>;

    /// Find the live (unblocked, unexpired) session holding this refresh digest
    async fn find_by_refresh_hash(&self, hash: &str) -> StoreResult<Option<Session>>;

    /// Replace refresh material if the session is live and still holds
    /// `rotation.expected_hash`. Returns `false` when nothing was updated.
    async fn rotate(&self, rotation: &Rotation) -> StoreResult<bool>;

    /// Block a single session
    async fn block(&self, session_id: SessionId) -> StoreResult<()>;

    /// Block every session belonging to an owner, returning how many changed
    async fn block_all_for_owner(&self, owner_id: OwnerId) -> StoreResult<u64>;

    /// Delete sessions whose expiry has passed, returning how many were removed
    async fn purge_expired(&self) -> StoreResult<u64>;
}

/// Column list shared across queries
const COLUMNS: &str = "id, user_id, refresh_token, refresh_token_id, user_agent, client_ip, \
                       is_blocked, expires_at";

/// PostgreSQL implementation of `SessionRepository`
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn session_from_row(row: &PgRow) -> Result<Session, sqlx::Error> {
        Ok(Session {
            id: row.try_get("id")?,
            owner_id: row.try_get("user_id")?,
            refresh_token_hash: row.try_get("refresh_token")?,
            refresh_token_id: row.try_get("refresh_token_id")?,
            device_fingerprint: row.try_get("user_agent")?,
            origin_address: row.try_get("client_ip")?,
            blocked: row.try_get("is_blocked")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: &NewSession) -> StoreResult<SessionId> {
        let row = sqlx::query(
            r#"
            INSERT INTO sessions (user_id, refresh_token, refresh_token_id, user_agent, client_ip, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(session.owner_id)
        .bind(&session.refresh_token_hash)
        .bind(&session.refresh_token_id)
        .bind(&session.device_fingerprint)
        .bind(&session.origin_address)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn find_by_refresh_hash(&self, hash: &str) -> StoreResult<Option<Session>> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE refresh_token = $1 AND is_blocked = FALSE AND expires_at > $2"
        );
        let row = sqlx::query(&query)
            .bind(hash)
            .bind(Utc::now().timestamp())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Self::session_from_row).transpose()?)
    }

    async fn rotate(&self, rotation: &Rotation) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET refresh_token = $1, refresh_token_id = $2, client_ip = $3, expires_at = $4,
                updated_at = NOW()
            WHERE id = $5 AND refresh_token = $6 AND is_blocked = FALSE AND expires_at > $7
            "#,
        )
        .bind(&rotation.new_hash)
        .bind(&rotation.new_token_id)
        .bind(&rotation.origin_address)
        .bind(rotation.expires_at)
        .bind(rotation.session_id)
        .bind(&rotation.expected_hash)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn block(&self, session_id: SessionId) -> StoreResult<()> {
        sqlx::query("UPDATE sessions SET is_blocked = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn block_all_for_owner(&self, owner_id: OwnerId) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_blocked = TRUE, updated_at = NOW()
             WHERE user_id = $1 AND is_blocked = FALSE",
        )
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Default)]
struct MemoryState {
    sessions: HashMap<SessionId, Session>,
    next_id: SessionId,
}

/// In-process implementation of `SessionRepository`
///
/// Each operation runs inside one critical section, which gives the same
/// atomicity the PostgreSQL statements give. Used by tests and by the server's
/// `memory` storage backend.
#[derive(Default)]
pub struct MemorySessionRepository {
    state: Mutex<MemoryState>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("session store lock poisoned".to_string()))
    }

    /// Snapshot of a session by ID, regardless of liveness
    pub fn get(&self, session_id: SessionId) -> Option<Session> {
        self.lock()
            .ok()
            .and_then(|state| state.sessions.get(&session_id).cloned())
    }

    /// Snapshot of every session belonging to an owner
    pub fn sessions_for_owner(&self, owner_id: OwnerId) -> Vec<Session> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }

    /// Number of stored sessions (live or not)
    pub fn len(&self) -> usize {
        self.lock().map(|state| state.sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: &NewSession) -> StoreResult<SessionId> {
        let now = Utc::now().timestamp();
        let mut state = self.lock()?;

        if state
            .sessions
            .values()
            .any(|s| s.refresh_token_hash == session.refresh_token_hash && s.is_live(now))
        {
            return Err(StoreError::Unavailable(
                "refresh digest already held by a live session".to_string(),
            ));
        }

        state.next_id += 1;
        let id = state.next_id;
        state.sessions.insert(
            id,
            Session {
                id,
                owner_id: session.owner_id,
                refresh_token_hash: session.refresh_token_hash.clone(),
                refresh_token_id: session.refresh_token_id.clone(),
                device_fingerprint: session.device_fingerprint.clone(),
                origin_address: session.origin_address.clone(),
                blocked: false,
                expires_at: session.expires_at,
            },
        );
        Ok(id)
    }

    async fn find_by_refresh_hash(&self, hash: &str) -> StoreResult<Option<Session>> {
        let now = Utc::now().timestamp();
        let state = self.lock()?;
        Ok(state
            .sessions
            .values()
            .find(|s| s.refresh_token_hash == hash && s.is_live(now))
            .cloned())
    }

    async fn rotate(&self, rotation: &Rotation) -> StoreResult<bool> {
        let now = Utc::now().timestamp();
        let mut state = self.lock()?;

        match state.sessions.get_mut(&rotation.session_id) {
            Some(session)
                if session.is_live(now) && session.refresh_token_hash == rotation.expected_hash =>
            {
                session.refresh_token_hash = rotation.new_hash.clone();
                session.refresh_token_id = rotation.new_token_id.clone();
                session.origin_address = rotation.origin_address.clone();
                session.expires_at = rotation.expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn block(&self, session_id: SessionId) -> StoreResult<()> {
        let mut state = self.lock()?;
        if let Some(session) = state.sessions.get_mut(&session_id) {
            session.blocked = true;
        }
        Ok(())
    }

    async fn block_all_for_owner(&self, owner_id: OwnerId) -> StoreResult<u64> {
        let mut state = self.lock()?;
        let mut blocked = 0;
        for session in state.sessions.values_mut() {
            if session.owner_id == owner_id && !session.blocked {
                session.blocked = true;
                blocked += 1;
            }
        }
        Ok(blocked)
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let now = Utc::now().timestamp();
        let mut state = self.lock()?;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}
