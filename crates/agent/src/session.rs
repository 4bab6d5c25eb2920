//! Session Management
//!
//! Each session owns its conversation state. Turns on one session are
//! serialized by an async turn lock held for the whole turn; the state
//! itself sits behind a `parking_lot` lock that is never held across an
//! `.await`.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, MutexGuard};

use bank_assistant_config::SessionConfig;
use bank_assistant_core::{Intent, Slot};

use crate::conversation::{ConversationPhase, ConversationState};
use crate::AgentError;

/// Session state
pub struct Session {
    /// Session ID
    pub id: String,
    /// Creation time
    pub created_at: Instant,
    /// Last activity
    last_activity: RwLock<Instant>,
    /// Is active
    active: RwLock<bool>,
    turn_lock: Mutex<()>,
    state: RwLock<ConversationState>,
}

/// Externally visible view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub phase: ConversationPhase,
    pub pending_intent: Option<Intent>,
    pub missing: Vec<Slot>,
    pub turn_count: usize,
    pub age_secs: u64,
    pub idle_secs: u64,
}

impl Session {
    pub fn new(id: impl Into<String>, transcript_limit: usize) -> Self {
        let now = Instant::now();
        Self {
            id: id.into(),
            created_at: now,
            last_activity: RwLock::new(now),
            active: RwLock::new(true),
            turn_lock: Mutex::new(()),
            state: RwLock::new(ConversationState::new(transcript_limit)),
        }
    }

    /// Wait for the previous turn of this session to finish
    pub async fn lock_turn(&self) -> MutexGuard<'_, ()> {
        self.turn_lock.lock().await
    }

    /// Copy of the state, taken before any suspension point
    pub fn snapshot(&self) -> ConversationState {
        self.state.read().clone()
    }

    /// Replace the state with the outcome of a turn
    pub fn commit(&self, state: ConversationState) {
        *self.state.write() = state;
    }

    /// Explicit reset: back to IDLE, transcript cleared
    pub async fn reset(&self) {
        let _turn = self.lock_turn().await;
        self.state.write().reset();
        tracing::info!(session_id = %self.id, "Session reset");
    }

    pub fn summary(&self) -> SessionSummary {
        let state = self.state.read();
        let pending = state.pending();
        SessionSummary {
            id: self.id.clone(),
            phase: state.phase(),
            pending_intent: pending.map(|p| p.intent),
            missing: pending.map(|p| p.missing.clone()).unwrap_or_default(),
            turn_count: state.turn_count(),
            age_secs: self.created_at.elapsed().as_secs(),
            idle_secs: self.last_activity.read().elapsed().as_secs(),
        }
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Check if session is expired
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }

    /// Close session and drop its conversation state
    pub fn close(&self) {
        *self.active.write() = false;
        self.state.write().reset();
    }

    /// Is session active
    pub fn is_active(&self) -> bool {
        *self.active.read()
    }
}

/// Session registry keyed by session id
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
    transcript_limit: usize,
}

impl SessionRegistry {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: config.max_sessions,
            session_timeout: Duration::from_secs(config.session_timeout_secs),
            cleanup_interval: Duration::from_secs(config.cleanup_interval_secs.max(1)),
            transcript_limit: config.transcript_limit,
        }
    }

    /// Start a background task that periodically evicts expired sessions.
    ///
    /// Returns the shutdown sender; send `true` to stop the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(self);
        let interval = registry.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = registry.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                "Session cleanup: removed {} expired sessions ({} remaining)",
                                removed,
                                registry.count()
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Create a new session
    pub fn create(&self) -> Result<Arc<Session>, AgentError> {
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);

            if sessions.len() >= self.max_sessions {
                return Err(AgentError::CapacityReached(self.max_sessions));
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new(&id, self.transcript_limit));
        sessions.insert(id.clone(), session.clone());
        metrics::gauge!("assistant_sessions_active").set(sessions.len() as f64);

        tracing::info!(session_id = %id, "Created session");
        Ok(session)
    }

    /// Get a session by ID
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// End a session; returns whether it existed
    pub fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write();
        let removed = sessions.remove(id);
        metrics::gauge!("assistant_sessions_active").set(sessions.len() as f64);
        match removed {
            Some(session) => {
                session.close();
                tracing::info!(session_id = %id, "Removed session");
                true
            }
            None => false,
        }
    }

    /// Get active session count
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Evict expired sessions; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions)
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) -> usize {
        let timeout = self.session_timeout;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(session) = sessions.remove(id) {
                session.close();
                tracing::info!(session_id = %id, "Expired session");
            }
        }
        metrics::gauge!("assistant_sessions_active").set(sessions.len() as f64);
        expired.len()
    }

    /// List all session IDs
    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().values().cloned().collect();
        sessions.iter().map(|s| s.summary()).collect()
    }
}
