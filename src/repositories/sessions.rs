use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::auth::SessionUser;

struct SessionEntry {
    user: SessionUser,
    expires_at: DateTime<Utc>,
}

/// Opaque bearer sessions. Only the SHA-256 digest of a token is kept.
pub struct SessionRepository {
    ttl: Duration,
    sessions: DashMap<String, SessionEntry>,
}

fn digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

impl SessionRepository {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: DashMap::new(),
        }
    }

    /// Issues a new token for `user`; returns it with its expiry.
    pub fn create(&self, user: SessionUser) -> (String, DateTime<Utc>) {
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.ttl;

        self.sessions
            .insert(digest(&token), SessionEntry { user, expires_at });

        (token, expires_at)
    }

    pub fn resolve(&self, token: &str) -> Option<SessionUser> {
        let key = digest(token);
        let entry = self.sessions.get(&key)?;

        if entry.expires_at <= Utc::now() {
            drop(entry);
            self.sessions.remove(&key);
            log::debug!("Dropped expired session.");
            return None;
        }

        Some(entry.user.clone())
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(&digest(token)).is_some()
    }

    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        before - self.sessions.len()
    }
}
