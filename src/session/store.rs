//! Server-side session storage.
//!
//! Sessions are keyed by a cookie-carried UUID and live in process memory.
//! Entries expire on a sliding window; expired entries are dropped on access
//! and by the periodic sweep the server spawns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

/// Identity established for a session after a successful sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub subject: String,
    /// Scopes granted at sign-in time.
    pub scopes: Vec<String>,
}

/// Mutable per-session state.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub identity: Option<Identity>,
    /// Outstanding sign-in round-trip state, cleared on callback.
    pub pending_state: Option<String>,
    pub pending_nonce: Option<String>,
}

struct Entry {
    data: SessionData,
    last_seen: Instant,
}

/// In-memory session store with sliding expiry.
pub struct SessionStore {
    entries: DashMap<Uuid, Entry>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            lifetime,
        }
    }

    /// Resolve a session id presented by the client, or mint a fresh one.
    /// Returns the effective id and whether a new session was created.
    pub fn open(&self, presented: Option<Uuid>) -> (Uuid, bool) {
        if let Some(id) = presented {
            if let Some(mut entry) = self.entries.get_mut(&id) {
                if entry.last_seen.elapsed() <= self.lifetime {
                    entry.last_seen = Instant::now();
                    return (id, false);
                }
            }
            // Expired or unknown; fall through and replace it.
            self.entries.remove(&id);
        }

        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            Entry {
                data: SessionData::default(),
                last_seen: Instant::now(),
            },
        );
        (id, true)
    }

    pub fn get(&self, id: Uuid) -> Option<SessionData> {
        self.entries.get(&id).map(|e| e.data.clone())
    }

    pub fn update(&self, id: Uuid, f: impl FnOnce(&mut SessionData)) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            f(&mut entry.data);
            entry.last_seen = Instant::now();
        }
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let lifetime = self.lifetime;
        self.entries.retain(|_, entry| entry.last_seen.elapsed() <= lifetime);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Handle to one session, carried in request extensions.
#[derive(Clone)]
pub struct Session {
    pub id: Uuid,
    store: Arc<SessionStore>,
}

impl Session {
    pub fn new(id: Uuid, store: Arc<SessionStore>) -> Self {
        Self { id, store }
    }

    pub fn data(&self) -> SessionData {
        self.store.get(self.id).unwrap_or_default()
    }

    pub fn update(&self, f: impl FnOnce(&mut SessionData)) {
        self.store.update(self.id, f);
    }
}
