//! Pending-authorization records keyed by state token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::SessionError;
use crate::pkce::{CodeVerifier, fingerprint};

#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub state: String,
    pub code_verifier: CodeVerifier,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl PendingAuthorization {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// Process-local, mutex-guarded session map. Clones share the same map.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, PendingAuthorization>>>,
    max_pending: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps live sessions so unauthenticated `/start` floods stay bounded.
    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_pending,
        }
    }

    pub fn put(
        &self,
        state: impl Into<String>,
        code_verifier: CodeVerifier,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let state = state.into();
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or(SessionError::TtlOutOfRange)?;
        let mut sessions = self.lock();

        match sessions.get(&state) {
            Some(existing) if !existing.is_expired(now) => {
                return Err(SessionError::DuplicateState);
            }
            Some(_) => {}
            None => {
                // sweep only when full; the background sweeper handles the rest
                if sessions.len() >= self.max_pending && sweep(&mut sessions, now) == 0 {
                    tracing::warn!(pending = sessions.len(), "session store at capacity");
                    return Err(SessionError::CapacityExceeded);
                }
            }
        }

        sessions.insert(
            state.clone(),
            PendingAuthorization {
                state,
                code_verifier,
                created_at: now,
                expires_at,
            },
        );
        Ok(())
    }

    /// Removes the record and returns its verifier if it has not expired.
    /// Lookup and removal happen under a single lock acquisition.
    pub fn take_if_valid(&self, state: &str) -> Result<CodeVerifier, SessionError> {
        let pending = self.lock().remove(state).ok_or(SessionError::NotFound)?;
        if pending.is_expired(Instant::now()) {
            tracing::debug!(state = %fingerprint(state), "pending authorization expired");
            return Err(SessionError::Expired);
        }
        Ok(pending.code_verifier)
    }

    pub fn sweep_expired(&self) -> usize {
        sweep(&mut self.lock(), Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweeps on a fixed interval until the returned task is aborted.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = store.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired authorizations");
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingAuthorization>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sweep(sessions: &mut HashMap<String, PendingAuthorization>, now: Instant) -> usize {
    let before = sessions.len();
    sessions.retain(|_, pending| !pending.is_expired(now));
    before - sessions.len()
}
