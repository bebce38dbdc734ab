//! Per-user session store with a keyed concurrency contract.
//!
//! All operations mutating one user's session are serialized through a
//! per-user turn lock; turns for different users proceed independently.
//! The store is the sole owner of session state.

use super::message::MessageRole;
use super::model::{Session, SessionSummary};
use crate::error::{Result, SlatedError};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

struct SessionSlot {
    data: RwLock<Session>,
    /// Turn lock: held for the whole duration of one workflow turn so a
    /// second concurrent request for the same user queues behind it.
    turn: Arc<Mutex<()>>,
}

impl SessionSlot {
    fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            data: RwLock::new(Session::new(user_id, now)),
            turn: Arc::new(Mutex::new(())),
        }
    }
}

/// Exclusive access to one user's session for the duration of a turn.
///
/// Holding the guard serializes turns for that user id. Dropped at the
/// end of the turn, releasing the next queued request if any.
pub struct TurnGuard {
    slot: Arc<SessionSlot>,
    _permit: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for TurnGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnGuard").finish_non_exhaustive()
    }
}

impl TurnGuard {
    /// A clone of the current session state.
    pub async fn snapshot(&self) -> Session {
        self.slot.data.read().await.clone()
    }

    /// Appends one message to the history.
    pub async fn append(&self, role: MessageRole, content: impl Into<String>, now: DateTime<Utc>) {
        self.slot.data.write().await.append(role, content, now);
    }

    /// Records that a tool was invoked during this turn.
    pub async fn record_tool_call(&self, name: impl Into<String>) {
        self.slot.data.write().await.tool_calls_made.push(name.into());
    }

    /// Marks whether the turn ended waiting on the user for details.
    pub async fn set_pending_clarification(&self, pending: bool) {
        self.slot.data.write().await.pending_clarification = pending;
    }
}

/// Keyed-lock store holding one [`Session`] per user id.
#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<String, Arc<SessionSlot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, user_id: &str, now: DateTime<Utc>) -> Arc<SessionSlot> {
        {
            let slots = self.slots.read().await;
            if let Some(slot) = slots.get(user_id) {
                return slot.clone();
            }
        }
        let mut slots = self.slots.write().await;
        slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(SessionSlot::new(user_id, now)))
            .clone()
    }

    /// Begins a turn for the user, creating the session on first access.
    /// Queues behind any in-flight turn for the same user id.
    pub async fn begin_turn(&self, user_id: &str, now: DateTime<Utc>) -> TurnGuard {
        let slot = self.slot(user_id, now).await;
        let permit = slot.turn.clone().lock_owned().await;
        TurnGuard {
            slot,
            _permit: permit,
        }
    }

    /// Non-blocking variant of [`begin_turn`](Self::begin_turn):
    /// rejects with `SessionBusy` instead of queueing.
    pub async fn try_begin_turn(&self, user_id: &str, now: DateTime<Utc>) -> Result<TurnGuard> {
        let slot = self.slot(user_id, now).await;
        let permit = slot
            .turn
            .clone()
            .try_lock_owned()
            .map_err(|_| SlatedError::SessionBusy {
                user_id: user_id.to_string(),
            })?;
        Ok(TurnGuard {
            slot,
            _permit: permit,
        })
    }

    /// Removes one user's session. Returns whether a session existed.
    /// An in-flight turn keeps writing to its detached state, which is
    /// dropped when the turn finishes.
    pub async fn clear(&self, user_id: &str) -> bool {
        self.slots.write().await.remove(user_id).is_some()
    }

    /// Removes every session.
    pub async fn clear_all(&self) -> usize {
        let mut slots = self.slots.write().await;
        let count = slots.len();
        slots.clear();
        count
    }

    /// Summaries of all sessions, ordered by most recent activity first.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let slots = self.slots.read().await;
        let mut summaries = Vec::with_capacity(slots.len());
        for slot in slots.values() {
            summaries.push(slot.data.read().await.summary());
        }
        summaries.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        summaries
    }

    /// Evicts sessions idle longer than `ttl`. Sessions with a turn in
    /// progress are never evicted. Returns the number removed.
    pub async fn evict_idle(&self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let mut slots = self.slots.write().await;
        let mut stale = Vec::new();
        for (user_id, slot) in slots.iter() {
            if slot.turn.try_lock().is_err() {
                continue;
            }
            let last_active = slot.data.read().await.last_active;
            if now - last_active > ttl {
                stale.push(user_id.clone());
            }
        }
        for user_id in &stale {
            slots.remove(user_id);
        }
        stale.len()
    }
}
