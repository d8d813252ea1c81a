//! Per-client session state.
//!
//! Each WebSocket connection owns one [`ClientState`] in the shared
//! [`ClientRegistry`]. The state is mutated only by inbound updates from
//! that same connection and is dropped when the connection closes; nothing
//! here persists or is shared across connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::message::ClientIdUpdate;

/// The timetable subset a client has selected, most specific id winning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    WorkGroup(String),
    Work(String),
    Train(String),
}

/// Mutable per-connection record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientState {
    pub work_group_id: Option<String>,
    pub work_id: Option<String>,
    pub train_id: Option<String>,
    /// Simulated time of the last sync push, informational only.
    pub last_synced_data_time_ms: Option<i64>,
}

impl ClientState {
    /// Merge non-empty fields of an update into the state. Absent or empty
    /// fields leave the existing value untouched: this is a partial
    /// update, not a replace.
    pub fn apply_update(&mut self, update: &ClientIdUpdate) {
        if let Some(id) = non_empty(&update.work_group_id) {
            self.work_group_id = Some(id);
        }
        if let Some(id) = non_empty(&update.work_id) {
            self.work_id = Some(id);
        }
        if let Some(id) = non_empty(&update.train_id) {
            self.train_id = Some(id);
        }
    }

    /// Resolve the effective scope: train > work > work-group > all.
    pub fn scope(&self) -> Scope {
        if let Some(id) = non_empty(&self.train_id) {
            Scope::Train(id)
        } else if let Some(id) = non_empty(&self.work_id) {
            Scope::Work(id)
        } else if let Some(id) = non_empty(&self.work_group_id) {
            Scope::WorkGroup(id)
        } else {
            Scope::All
        }
    }
}

fn non_empty(id: &Option<String>) -> Option<String> {
    id.as_deref().filter(|s| !s.is_empty()).map(str::to_string)
}

/// Concurrency-safe map of active sessions, keyed by a generated id.
///
/// Sessions are created and removed while other sessions' loops run, so
/// all access goes through the lock.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    next_id: AtomicU64,
    clients: RwLock<HashMap<String, ClientState>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry::default()
    }

    /// Register a fresh, zero-initialized session and return its id.
    pub fn create(&self) -> String {
        let id = format!("client-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.clients
            .write()
            .unwrap()
            .insert(id.clone(), ClientState::default());
        id
    }

    /// Remove a session. Idempotent.
    pub fn remove(&self, client_id: &str) {
        self.clients.write().unwrap().remove(client_id);
    }

    /// Apply a scope update to a session. Returns false if the session is
    /// unknown (already removed).
    pub fn apply_update(&self, client_id: &str, update: &ClientIdUpdate) -> bool {
        match self.clients.write().unwrap().get_mut(client_id) {
            Some(state) => {
                state.apply_update(update);
                true
            }
            None => false,
        }
    }

    /// Snapshot of a session's state.
    pub fn get(&self, client_id: &str) -> Option<ClientState> {
        self.clients.read().unwrap().get(client_id).cloned()
    }

    /// Record the simulated time of the last sync push.
    pub fn record_sync_time(&self, client_id: &str, time_ms: Option<i64>) {
        if let Some(state) = self.clients.write().unwrap().get_mut(client_id) {
            state.last_synced_data_time_ms = time_ms;
        }
    }

    pub fn len(&self) -> usize {
        self.clients.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
