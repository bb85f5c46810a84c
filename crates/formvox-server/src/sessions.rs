//! Hosted sessions: the controller of each live form session, its update
//! channel, and the turn timer that bounds open capture.

use formvox_db::{insert_submission, DbPool};
use formvox_engine::{Effect, EngineError, SessionController, SessionEvent, SubmissionSink};
use formvox_types::{SessionSnapshot, SessionStatus};
use formvox_voice::VoiceConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Capacity of each session's update broadcast channel.
const DEFAULT_UPDATE_BROADCAST_CAPACITY: usize = 64;

/// The outcome of one event: the new snapshot and the effects the browser
/// must execute (speak, cancel speech, open or close capture).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub snapshot: SessionSnapshot,
    pub effects: Vec<Effect>,
}

/// One live session.
#[derive(Debug)]
pub struct HostedSession {
    pub controller: SessionController,
    pub updates: broadcast::Sender<SessionUpdate>,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the timer is re-armed so a stale expiry is ignored.
    timer_generation: u64,
    /// Last event from the host. Timer expiries do not count.
    last_activity: Instant,
}

pub type SharedSession = Arc<Mutex<HostedSession>>;

/// Live sessions by id.
///
/// `std::sync::Mutex` on purpose: no lock is held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, SharedSession>>>,
}

impl HostedSession {
    pub fn new(controller: SessionController) -> Self {
        let (updates, _) = broadcast::channel(DEFAULT_UPDATE_BROADCAST_CAPACITY);
        Self {
            controller,
            updates,
            timer: None,
            timer_generation: 0,
            last_activity: Instant::now(),
        }
    }

    fn disarm(&mut self) {
        self.timer_generation += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl SessionRegistry {
    pub fn insert(&self, id: Uuid, session: HostedSession) -> SharedSession {
        let shared = Arc::new(Mutex::new(session));
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::clone(&shared));
        shared
    }

    pub fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Removes the session, stops its timer and discards its state.
    pub fn cancel(&self, id: &Uuid) -> bool {
        let removed = self.discard(id);
        if removed {
            tracing::info!(session_id = %id, "session cancelled");
        }
        removed
    }

    /// Drops a session whose answers were handed to the submission sink.
    pub fn close(&self, id: &Uuid) {
        if self.discard(id) {
            tracing::debug!(session_id = %id, "submitted session released");
        }
    }

    fn discard(&self, id: &Uuid) -> bool {
        let removed = self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        let Some(shared) = removed else {
            return false;
        };
        // Other handles may still be alive; the state goes with the last one.
        shared.lock().unwrap_or_else(|e| e.into_inner()).disarm();
        true
    }

    /// Removes every session the host has not touched for `idle` and
    /// returns how many went.
    pub fn prune_idle(&self, idle: Duration) -> usize {
        let mut sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|id, shared| {
            let mut session = shared.lock().unwrap_or_else(|e| e.into_inner());
            if session.last_activity.elapsed() < idle {
                return true;
            }
            session.disarm();
            tracing::info!(session_id = %id, "idle session expired");
            false
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applies `event` to the session, publishes the update and re-arms the
/// turn timer.
pub fn apply_event(
    shared: &SharedSession,
    session_id: Uuid,
    event: SessionEvent,
    voice: &VoiceConfig,
) -> Result<SessionUpdate, EngineError> {
    let mut session = shared.lock().unwrap_or_else(|e| e.into_inner());
    apply_locked(shared, &mut session, session_id, event, voice)
}

fn apply_locked(
    shared: &SharedSession,
    session: &mut HostedSession,
    session_id: Uuid,
    event: SessionEvent,
    voice: &VoiceConfig,
) -> Result<SessionUpdate, EngineError> {
    if event != SessionEvent::TurnTimeout {
        session.last_activity = Instant::now();
    }
    let effects = session.controller.handle(event)?;
    let update = SessionUpdate {
        snapshot: session.controller.snapshot(),
        effects,
    };
    tracing::debug!(
        %session_id,
        status = %update.snapshot.status,
        index = update.snapshot.index,
        progress = update.snapshot.progress(),
        "session event applied"
    );
    // No subscribers is fine.
    let _ = session.updates.send(update.clone());
    arm_timer(shared, session, session_id, voice);
    Ok(update)
}

/// Arms the turn timer while capture is open; its expiry is delivered as a
/// `TurnTimeout` event.
fn arm_timer(
    shared: &SharedSession,
    session: &mut HostedSession,
    session_id: Uuid,
    voice: &VoiceConfig,
) {
    session.disarm();
    let state = session.controller.state();
    if !state.is_capturing() || state.is_submitted() {
        return;
    }
    let timeout = if state.status() == SessionStatus::Confirming {
        voice.confirm_timeout()
    } else {
        voice.listen_timeout()
    };

    let generation = session.timer_generation;
    let weak = Arc::downgrade(shared);
    let voice = voice.clone();
    session.timer = Some(tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        // Checked under the same lock the event is applied with, so an event
        // that re-armed the timer in between wins.
        let mut session = shared.lock().unwrap_or_else(|e| e.into_inner());
        if session.timer_generation != generation {
            return;
        }
        tracing::debug!(%session_id, "turn timed out");
        if let Err(e) = apply_locked(
            &shared,
            &mut session,
            session_id,
            SessionEvent::TurnTimeout,
            &voice,
        ) {
            tracing::debug!(%session_id, error = %e, "turn timeout not applied");
        }
    }));
}

/// Persists a session's answers to the `submissions` tables.
pub struct SqliteSubmissionSink {
    pool: DbPool,
    session_id: String,
    field_count: usize,
}

impl SqliteSubmissionSink {
    pub fn new(pool: DbPool, session_id: Uuid, field_count: usize) -> Self {
        Self {
            pool,
            session_id: session_id.to_string(),
            field_count,
        }
    }
}

impl SubmissionSink for SqliteSubmissionSink {
    fn submit(&mut self, values: &BTreeMap<String, String>) -> Result<(), EngineError> {
        let conn = self
            .pool
            .get()
            .map_err(|e| EngineError::Submission(format!("db connection failed: {}", e)))?;
        insert_submission(&conn, &self.session_id, self.field_count, values)
            .map_err(|e| EngineError::Submission(e.to_string()))
    }
}
