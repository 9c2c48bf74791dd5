//! In-memory session store.
//!
//! Maps opaque hex tokens to the user they were issued for. Sessions expire a
//! fixed duration after creation; expired entries are dropped lazily on the
//! next lookup and periodically by [`SessionStore::purge_expired`].
//!
//! The store is shared by every connection task, so all access goes through
//! one mutex.

use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

/// Random bytes per token; the hex form is twice as long.
pub const TOKEN_BYTES: usize = 32;

/// Default lifetime of a session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Name of the cookie carrying the token.
pub const SESSION_COOKIE: &str = "session";

/// A server-side login record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl Session {
    /// A session is valid while `now <= expires_at`.
    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        now <= self.expires_at
    }
}

#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a fresh session for `username`.
    pub fn create_session(&self, username: &str) -> Session {
        let created_at = SystemTime::now();
        let mut sessions = self.lock();

        // Live tokens are unique.
        let token = loop {
            let candidate = generate_token();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = Session {
            token: token.clone(),
            username: username.to_string(),
            created_at,
            expires_at: created_at + self.ttl,
        };
        sessions.insert(token, session.clone());

        tracing::debug!(user = username, "Session created");
        session
    }

    /// Returns the session for `token` if it exists and has not expired.
    pub fn validate_session(&self, token: &str) -> Option<Session> {
        self.validate_session_at(token, SystemTime::now())
    }

    /// Like [`validate_session`](Self::validate_session) with an explicit clock.
    /// An expired session is removed as a side effect.
    pub fn validate_session_at(&self, token: &str, now: SystemTime) -> Option<Session> {
        let mut sessions = self.lock();
        let session = sessions.get(token)?;

        if session.is_valid_at(now) {
            return Some(session.clone());
        }

        tracing::debug!(user = %session.username, "Session expired");
        sessions.remove(token);
        None
    }

    /// Removes `token`. No-op when absent.
    pub fn remove_session(&self, token: &str) {
        if let Some(session) = self.lock().remove(token) {
            tracing::debug!(user = %session.username, "Session removed");
        }
    }

    /// Drops every expired session and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(SystemTime::now())
    }

    pub fn purge_expired_at(&self, now: SystemTime) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| session.is_valid_at(now));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Each mutation is a single map operation; a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
