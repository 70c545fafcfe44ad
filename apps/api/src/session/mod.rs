//! Conversation Context Manager: owns every chat session in the process.
//!
//! Sessions are addressed only by id. The session table sits behind a short,
//! synchronous lock; each session has its own async lock so writers to one
//! session are serialized while different sessions proceed in parallel.
//!
//! Expiry: a session dies after `ttl` without access, or when the table is
//! full and it is the least recently used. Expired entries are purged lazily.

pub mod models;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::analysis::models::AnalysisResult;
use models::{ChatContext, ChatTurn, Role, Session, SessionId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session {0} not found or expired")]
    NotFound(SessionId),
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Inactivity window before a session expires.
    pub ttl: Duration,
    /// Max live sessions; the least recently used is evicted beyond this.
    pub capacity: usize,
    /// Max stored turns per session; oldest dropped first.
    pub history_cap: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            capacity: 1_000,
            history_cap: 40,
        }
    }
}

struct SessionSlot {
    session: Arc<AsyncMutex<Session>>,
    last_active: Instant,
}

pub struct SessionManager {
    config: SessionConfig,
    slots: Mutex<HashMap<SessionId, SessionSlot>>,
}

/// Exclusive access to one session for the lifetime of the handle.
pub struct SessionHandle {
    guard: OwnedMutexGuard<Session>,
    history_cap: usize,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.guard.session_id
    }

    pub fn context(&self) -> ChatContext {
        self.guard.context()
    }

    pub fn turn_count(&self) -> usize {
        self.guard.history.len()
    }

    pub fn anchor(&self) -> &AnalysisResult {
        &self.guard.anchor
    }

    fn push(&mut self, role: Role, text: impl Into<String>) {
        let dropped = self.guard.push_turn(ChatTurn::new(role, text), self.history_cap);
        if dropped > 0 {
            debug!(
                "Session {} history at cap {}, dropped {} oldest turn(s)",
                self.guard.session_id, self.history_cap, dropped
            );
        }
    }
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a new session anchored to `anchor` and returns its id.
    pub fn create_session(&self, resume_text: String, anchor: AnalysisResult) -> SessionId {
        let session_id = Uuid::new_v4();
        let now = Instant::now();
        let mut slots = self.lock_slots();

        self.purge_expired(&mut slots, now);
        while slots.len() >= self.config.capacity.max(1) {
            let Some(lru) = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_active)
                .map(|(id, _)| *id)
            else {
                break;
            };
            slots.remove(&lru);
            debug!("Session {lru} evicted (capacity {})", self.config.capacity);
        }

        slots.insert(
            session_id,
            SessionSlot {
                session: Arc::new(AsyncMutex::new(Session::new(
                    session_id,
                    resume_text,
                    anchor,
                ))),
                last_active: now,
            },
        );
        session_id
    }

    /// Waits for exclusive access to a session and marks it active.
    pub async fn acquire(&self, session_id: SessionId) -> Result<SessionHandle, SessionError> {
        let session = {
            let now = Instant::now();
            let mut slots = self.lock_slots();
            let expired = slots
                .get(&session_id)
                .map(|slot| now.duration_since(slot.last_active) > self.config.ttl)
                .ok_or(SessionError::NotFound(session_id))?;
            if expired {
                slots.remove(&session_id);
                debug!("Session {session_id} expired after inactivity");
                return Err(SessionError::NotFound(session_id));
            }
            let slot = slots
                .get_mut(&session_id)
                .ok_or(SessionError::NotFound(session_id))?;
            slot.last_active = now;
            Arc::clone(&slot.session)
        };

        Ok(SessionHandle {
            guard: session.lock_owned().await,
            history_cap: self.config.history_cap.max(1),
        })
    }

    /// Appends one turn through a held handle. The session must still be
    /// live: a handle outlives removal or expiry, its turns do not.
    pub fn append_turn(
        &self,
        handle: &mut SessionHandle,
        role: Role,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        let session_id = handle.session_id();
        let mut slots = self.lock_slots();
        let slot = slots
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        slot.last_active = Instant::now();
        handle.push(role, text);
        Ok(())
    }

    pub async fn get_context(&self, session_id: SessionId) -> Result<ChatContext, SessionError> {
        Ok(self.acquire(session_id).await?.context())
    }

    /// Explicit expiry.
    pub fn remove(&self, session_id: SessionId) -> Result<(), SessionError> {
        self.lock_slots()
            .remove(&session_id)
            .map(|_| ())
            .ok_or(SessionError::NotFound(session_id))
    }

    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    fn purge_expired(&self, slots: &mut HashMap<SessionId, SessionSlot>, now: Instant) {
        let before = slots.len();
        slots.retain(|_, slot| now.duration_since(slot.last_active) <= self.config.ttl);
        if slots.len() < before {
            debug!("Purged {} expired session(s)", before - slots.len());
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<SessionId, SessionSlot>> {
        // The table holds no invariants a panicking holder could break.
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
