//! In-memory dialogue sessions.
//!
//! A session holds at most one `DialogueCursor` and runs at most one turn at a time.
//! A turn claims the session with `begin_turn`; a second claim while the first is
//! running is rejected. The new cursor is written only once the turn has finished,
//! so a turn that errors or is dropped mid-call leaves the session as it was.
//!
//! Nothing here is persisted. Sessions disappear on reset, after sitting idle longer
//! than the store's TTL, or on process exit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::noa::dialogue::{DialogueCursor, DialogueState};
use crate::noa::models::{ChatMessage, Recommendation};

#[derive(Debug)]
struct SessionData {
    cursor: Option<DialogueCursor>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// One conversation's state plus its in-flight marker.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    in_flight: AtomicBool,
    data: Mutex<SessionData>,
}

/// Snapshot of a session returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub dialogue: DialogueState,
    pub turn_in_progress: bool,
    pub recommendation: Option<Recommendation>,
    pub next_question: Option<String>,
    pub history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

type Registry = Arc<RwLock<HashMap<Uuid, Arc<Session>>>>;

/// Releases the session's in-flight marker when dropped.
pub struct TurnGuard {
    session: Arc<Session>,
    registry: Registry,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.session.in_flight.store(false, Ordering::Release);
    }
}

impl TurnGuard {
    /// The cursor the turn starts from.
    pub async fn cursor(&self) -> Option<DialogueCursor> {
        self.session.data.lock().await.cursor.clone()
    }

    /// Drops the current cursor ahead of a first pass on a new scenario.
    pub async fn discard_cursor(&self) {
        let mut data = self.session.data.lock().await;
        data.cursor = None;
        data.updated_at = Utc::now();
    }

    /// Stores the cursor produced by a completed turn.
    ///
    /// Fails with `NotFound` when the session was reset while the turn ran.
    pub async fn commit(self, cursor: DialogueCursor) -> Result<SessionView, AppError> {
        let id = self.session.id;
        // Held until the write lands so a concurrent reset cannot slip in between.
        let registry = self.registry.read().await;
        if !registry
            .get(&id)
            .is_some_and(|current| Arc::ptr_eq(current, &self.session))
        {
            return Err(AppError::NotFound(format!("Session {id} was reset")));
        }

        let mut data = self.session.data.lock().await;
        data.cursor = Some(cursor);
        data.updated_at = Utc::now();
        Ok(view_of(id, &data, false))
    }
}

impl Session {
    fn new(id: Uuid, cursor: Option<DialogueCursor>) -> Self {
        let now = Utc::now();
        Self {
            id,
            in_flight: AtomicBool::new(false),
            data: Mutex::new(SessionData {
                cursor,
                created_at: now,
                updated_at: now,
            }),
        }
    }

    pub async fn view(&self) -> SessionView {
        let data = self.data.lock().await;
        view_of(self.id, &data, self.in_flight.load(Ordering::Acquire))
    }
}

fn view_of(id: Uuid, data: &SessionData, in_flight: bool) -> SessionView {
    let state = match &data.cursor {
        Some(cursor) => cursor.state(),
        None if in_flight => DialogueState::AwaitingFirstQuestion,
        None => DialogueState::NoSession,
    };

    SessionView {
        session_id: id,
        dialogue: state,
        turn_in_progress: in_flight,
        recommendation: data.cursor.as_ref().map(|c| c.recommendation().clone()),
        next_question: data
            .cursor
            .as_ref()
            .and_then(|c| c.pending_question().map(str::to_string)),
        history: data
            .cursor
            .as_ref()
            .map(|c| c.history().to_vec())
            .unwrap_or_default(),
        created_at: data.created_at,
        updated_at: data.updated_at,
    }
}

/// Idle time after which a session is swept when no TTL is configured.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 60;

/// Process-local registry of dialogue sessions. Sessions never share state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Registry,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    /// Registers a session that already completed its first turn.
    pub async fn insert(&self, cursor: DialogueCursor) -> SessionView {
        let id = Uuid::new_v4();
        let session = Arc::new(Session::new(id, Some(cursor)));
        let view = session.view().await;
        self.sessions.write().await.insert(id, session);
        info!("Session {id} created");
        view
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>, AppError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    /// Claims the session for one turn.
    pub async fn begin_turn(&self, id: Uuid) -> Result<TurnGuard, AppError> {
        let session = self.get(id).await?;
        session
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                AppError::Conflict(format!("A turn is already in progress for session {id}"))
            })?;
        Ok(TurnGuard {
            session,
            registry: Arc::clone(&self.sessions),
        })
    }

    /// Discards the session and everything it held.
    pub async fn reset(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!("Session {id} reset"))
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    /// Removes sessions idle for longer than the TTL. Sessions mid-turn are kept.
    /// Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let candidates: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for session in candidates {
            if session.in_flight.load(Ordering::Acquire) {
                continue;
            }
            if session.data.lock().await.updated_at <= cutoff {
                expired.push(session);
            }
        }
        if expired.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        let mut removed = 0;
        for session in expired {
            // A turn may have claimed the session since it was checked.
            if session.in_flight.load(Ordering::Acquire) {
                continue;
            }
            if sessions.remove(&session.id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Expired {removed} idle session(s)");
        }
        removed
    }

    /// Sweeps idle sessions on a fixed period for the life of the process.
    pub fn spawn_sweeper(&self, period: std::time::Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(period);
            loop {
                interval.tick().await;
                store.purge_expired().await;
            }
        })
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
