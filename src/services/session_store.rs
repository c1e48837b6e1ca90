// src/services/session_store.rs
use crate::errors::HeadshotError;
use crate::styles::StyleCatalog;
use crate::workflow::WorkflowController;
use chrono::{DateTime, Duration, Utc};
use log::info;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub type SharedController = Arc<Mutex<WorkflowController>>;

struct Session {
    controller: SharedController,
    last_seen: DateTime<Utc>,
}

/// In-memory workflows, one per browser session. Nothing outlives the process,
/// and a session untouched for longer than the idle TTL is dropped.
pub struct SessionStore {
    catalog: Arc<StyleCatalog>,
    idle_ttl: Duration,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new(catalog: Arc<StyleCatalog>, idle_ttl: std::time::Duration) -> Self {
        Self {
            catalog,
            idle_ttl: Duration::from_std(idle_ttl).unwrap_or_else(|_| Duration::days(36_500)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self) -> (Uuid, SharedController) {
        let now = Utc::now();
        self.prune_idle(now);

        let session_id = Uuid::new_v4();
        let controller = Arc::new(Mutex::new(WorkflowController::new(self.catalog.clone())));

        self.sessions.write().insert(
            session_id,
            Session {
                controller: controller.clone(),
                last_seen: now,
            },
        );
        info!("Created session {}", session_id);
        (session_id, controller)
    }

    /// Looks up a session and marks it as seen.
    pub fn get(&self, session_id: &Uuid) -> Result<SharedController, HeadshotError> {
        self.touch(session_id, Utc::now())
    }

    fn touch(&self, session_id: &Uuid, now: DateTime<Utc>) -> Result<SharedController, HeadshotError> {
        let mut sessions = self.sessions.write();
        let expired = match sessions.get_mut(session_id) {
            Some(session) if !self.is_idle(session, now) => {
                session.last_seen = now;
                return Ok(session.controller.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(session_id);
            info!("Session {} expired", session_id);
        }
        Err(HeadshotError::NotFound(format!("session {}", session_id)))
    }

    pub fn remove(&self, session_id: &Uuid) -> Result<(), HeadshotError> {
        self.sessions
            .write()
            .remove(session_id)
            .map(|_| info!("Ended session {}", session_id))
            .ok_or_else(|| HeadshotError::NotFound(format!("session {}", session_id)))
    }

    /// Drops every session idle at `now`. Returns how many were dropped.
    pub fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_idle(session, now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            info!("Pruned {} idle sessions", pruned);
        }
        pruned
    }

    fn is_idle(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(session.last_seen) > self.idle_ttl
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }
}
