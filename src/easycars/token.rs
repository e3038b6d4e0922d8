//! Process-wide bearer token cache
//!
//! Tokens are keyed by dealership and held in memory only. A token is
//! served while `now + safety_margin < expires_at`; anything closer to
//! expiry is treated as a miss so a request never leaves with a token
//! that could lapse in flight.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// One cached bearer token.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-memory token cache shared by all sync work in the process.
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: RwLock<HashMap<Uuid, CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token for a dealership if it is still comfortably
    /// inside its validity window.
    pub fn get(&self, dealership_id: &Uuid, safety_margin: Duration) -> Option<String> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(dealership_id)?;
        if Utc::now() + safety_margin < entry.expires_at {
            Some(entry.token.clone())
        } else {
            None
        }
    }

    /// Store a freshly acquired token. The effective expiry is the earlier
    /// of the server-reported expiry and a local maximum lifetime, so a
    /// server that hands out very long tokens still gets re-authenticated
    /// on our schedule.
    pub fn insert(
        &self,
        dealership_id: Uuid,
        token: String,
        server_expires_at: Option<DateTime<Utc>>,
        max_lifetime: Duration,
    ) {
        let acquired_at = Utc::now();
        let local_cap = acquired_at + max_lifetime;
        let expires_at = match server_expires_at {
            Some(server) => server.min(local_cap),
            None => local_cap,
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                dealership_id,
                CachedToken {
                    token,
                    acquired_at,
                    expires_at,
                },
            );
        }
    }

    /// Drop a dealership's token, typically after the remote rejected it.
    pub fn invalidate(&self, dealership_id: &Uuid) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(dealership_id);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}
