//! In-memory session store.
//!
//! A session is created at login and identified by a UUID v4 token that the
//! browser keeps in the `session_id` cookie. Sessions live only in process
//! memory: a restart logs everyone out.
//!
//! The token itself is never kept. The map is keyed by `SHA-256(token)`, so a
//! heap dump does not reveal usable cookies.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::SessionError;

/// A live login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The logged-in user.
    pub user_id: i64,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires (`None` = valid until logout).
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Concurrency-safe map of session token hashes to sessions.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Option<Duration>,
}

impl SessionStore {
    /// Create an empty store. `ttl = None` disables expiry.
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Session lifetime applied to new sessions.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Start a session for `user_id` and return its plaintext token.
    pub async fn create(&self, user_id: i64) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = Session {
            user_id,
            created_at: now,
            expires_at: self.ttl.map(|ttl| now + ttl),
        };

        self.sessions.write().await.insert(hash_token(&token), session);
        info!(user_id, "session created");
        token
    }

    /// Resolve a token to its session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for unknown tokens and
    /// [`SessionError::Expired`] for expired ones; expired sessions are
    /// removed as a side effect.
    pub async fn lookup(&self, token: &str) -> Result<Session, SessionError> {
        let key = hash_token(token);
        let now = Utc::now();

        {
            let sessions = self.sessions.read().await;
            match sessions.get(&key) {
                None => return Err(SessionError::NotFound),
                Some(session) if !session.is_expired_at(now) => return Ok(session.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        match sessions.remove(&key) {
            Some(session) => {
                debug!(user_id = session.user_id, "expired session removed on lookup");
                Err(SessionError::Expired {
                    expired_at: session
                        .expires_at
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_default(),
                })
            }
            None => Err(SessionError::NotFound),
        }
    }

    /// End the session for `token`. Returns whether a session was removed.
    pub async fn revoke(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(&hash_token(token));
        if let Some(session) = &removed {
            info!(user_id = session.user_id, "session revoked");
        }
        removed.is_some()
    }

    /// End every session belonging to `user_id`. Returns how many were removed.
    pub async fn revoke_user(&self, user_id: i64) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        let removed = before.saturating_sub(sessions.len());
        if removed > 0 {
            info!(user_id, removed, "user sessions revoked");
        }
        removed
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        before.saturating_sub(sessions.len())
    }

    /// Number of sessions currently held (expired ones included until purged).
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
