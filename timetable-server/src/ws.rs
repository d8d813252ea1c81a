//! WebSocket session handling.
//!
//! [`WebSocketCore`] translates between the bridge and the wire message
//! schema and owns the per-client scope registry. [`client_session`] is
//! the per-connection state machine (one task per accepted upgrade): a
//! single `select!` loop over the adaptive sync timer, the bridge's
//! train-changed broadcast, inbound frames and shutdown. Every outbound
//! frame goes through the one send point of that loop, so sends are
//! serialized and delivered in order without a separate lock.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use log::{debug, trace, warn};
use tokio::sync::broadcast;
use tokio::time::Instant;

use timetable_core::message::{ClientIdUpdate, ServerMessage};
use timetable_core::model::SyncedData;
use timetable_core::session::{ClientRegistry, Scope};
use timetable_core::timing::next_sync_delay;

use crate::bridge::{TimetableBridge, TrainChanged};

pub struct WebSocketCore {
    bridge: Arc<dyn TimetableBridge>,
    clients: ClientRegistry,
}

impl WebSocketCore {
    pub fn new(bridge: Arc<dyn TimetableBridge>) -> Self {
        WebSocketCore {
            bridge,
            clients: ClientRegistry::new(),
        }
    }

    pub fn bridge(&self) -> &dyn TimetableBridge {
        self.bridge.as_ref()
    }

    /// Register a fresh session; called once per accepted upgrade.
    pub fn create_client_state(&self) -> String {
        self.clients.create()
    }

    /// Remove a session. Idempotent.
    pub fn unregister_client_state(&self, client_id: &str) {
        self.clients.remove(client_id);
    }

    /// Merge a scope update into the session. Returns false for an
    /// unknown (already removed) session.
    pub fn handle_client_id_update(&self, client_id: &str, update: &ClientIdUpdate) -> bool {
        self.clients.apply_update(client_id, update)
    }

    /// The periodic position/time message, together with the snapshot it
    /// was built from (the caller records the snapshot's time). Infallible:
    /// the bridge returns the all-empty form when nothing is loaded.
    pub fn generate_synced_data_message(&self) -> (ServerMessage, SyncedData) {
        let data = self.bridge.synced_data();
        let msg = ServerMessage::synced_data(&data);
        (msg, data)
    }

    /// Timetable message for the session's current scope, tagged with
    /// whichever scope id was actually used. `None` when the bridge has
    /// no matching data (or the session is gone).
    pub fn generate_timetable_message(&self, client_id: &str) -> Option<ServerMessage> {
        let state = self.clients.get(client_id)?;
        match state.scope() {
            Scope::Train(id) => {
                let data = self.bridge.work_group_by_train_id(&id)?;
                Some(ServerMessage::Timetable {
                    work_group_id: None,
                    work_id: None,
                    train_id: Some(id),
                    data,
                })
            }
            Scope::Work(id) => {
                let data = self.bridge.work_group_by_work_id(&id)?;
                Some(ServerMessage::Timetable {
                    work_group_id: None,
                    work_id: Some(id),
                    train_id: None,
                    data,
                })
            }
            Scope::WorkGroup(id) => {
                let data = self.bridge.work_group_by_work_group_id(&id)?;
                Some(ServerMessage::Timetable {
                    work_group_id: Some(id),
                    work_id: None,
                    train_id: None,
                    data,
                })
            }
            Scope::All => self.generate_full_timetable_message(),
        }
    }

    /// The unscoped full-snapshot message (initial push, new-scenario push).
    pub fn generate_full_timetable_message(&self) -> Option<ServerMessage> {
        let data = self.bridge.work_group()?;
        Some(ServerMessage::full_timetable(data))
    }

    fn record_sync_time(&self, client_id: &str, time_ms: Option<i64>) {
        self.clients.record_sync_time(client_id, time_ms);
    }
}

/// Serialize and send one message. `Ok(false)` means the message could
/// not be serialized and was skipped; `Err` means the connection is dead.
async fn send_message(
    socket: &mut WebSocket,
    msg: &ServerMessage,
) -> Result<bool, axum::Error> {
    let json = match msg.to_json() {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize outbound message: {}", e);
            return Ok(false);
        }
    };
    trace!("Sending {}", json);
    socket.send(Message::Text(json.into())).await.map(|_| true)
}

/// Per-connection state machine (one spawned per accepted upgrade).
pub async fn client_session(
    mut socket: WebSocket,
    core: Arc<WebSocketCore>,
    mut train_changed_rx: broadcast::Receiver<TrainChanged>,
    mut shutdown_rx: broadcast::Receiver<()>,
    sync_interval: Duration,
) {
    let client_id = core.create_client_state();
    debug!("WebSocket client connected: {}", client_id);

    let mut loaded = core.bridge().is_scenario_loaded();

    // Initial push: the full snapshot, so a client has data before it
    // ever selects a scope.
    if loaded {
        if let Some(msg) = core.generate_full_timetable_message() {
            if let Err(e) = send_message(&mut socket, &msg).await {
                warn!("Error on send to websocket: {}", e);
                core.unregister_client_state(&client_id);
                return;
            }
        }
    }

    let sleep = tokio::time::sleep(next_sync_delay(
        core.bridge().synced_data().time_ms,
        sync_interval,
    ));
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Shutdown of websocket {}", client_id);
                let _ = socket.send(Message::Close(None)).await;
                break;
            },
            () = &mut sleep => {
                let now_loaded = core.bridge().is_scenario_loaded();
                if now_loaded && !loaded {
                    // New scenario: push the fresh snapshot unsolicited
                    if let Some(msg) = core.generate_full_timetable_message() {
                        if let Err(e) = send_message(&mut socket, &msg).await {
                            warn!("Error on send to websocket: {}", e);
                            break;
                        }
                    }
                }
                loaded = now_loaded;

                let (msg, data) = core.generate_synced_data_message();
                if let Err(e) = send_message(&mut socket, &msg).await {
                    warn!("Error on send to websocket: {}", e);
                    break;
                }
                core.record_sync_time(&client_id, data.time_ms);
                sleep.as_mut().reset(
                    Instant::now() + next_sync_delay(data.time_ms, sync_interval),
                );
            },
            r = train_changed_rx.recv() => {
                match r {
                    Ok(event) => {
                        trace!("Train changed ({:?}) for {}", event.train_id, client_id);
                        if let Some(msg) = core.generate_timetable_message(&client_id) {
                            if let Err(e) = send_message(&mut socket, &msg).await {
                                warn!("Error sending train-changed update to {}: {}", client_id, e);
                                break;
                            }
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Missed events collapse into the next one
                        warn!("Train-changed receiver lagged, skipped {} events", n);
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Train-changed channel closed");
                        break;
                    }
                }
            },
            r = socket.recv() => {
                match r {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(msg) = handle_text_message(&core, &client_id, text.as_str()) {
                            if let Err(e) = send_message(&mut socket, &msg).await {
                                warn!("Error on send to websocket: {}", e);
                                break;
                            }
                        }
                    },
                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket closed by client {}", client_id);
                        break;
                    },
                    Some(Ok(other)) => {
                        trace!("Dropping unexpected message {:?}", other);
                    },
                    Some(Err(e)) => {
                        warn!("Error reading websocket: {}", e);
                        break;
                    },
                    None => {
                        debug!("WebSocket stream ended for {}", client_id);
                        break;
                    }
                }
            }
        }
    }

    debug!("WebSocket client disconnected: {}", client_id);
    core.unregister_client_state(&client_id);
    // Dropping train_changed_rx is the unsubscribe.
}

/// Process one inbound text frame; the returned message, if any, is the
/// scoped-timetable acknowledgement of a scope update. Malformed input is
/// logged and dropped, never fatal to the connection.
fn handle_text_message(
    core: &WebSocketCore,
    client_id: &str,
    text: &str,
) -> Option<ServerMessage> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("JSON parse error from {}: {}", client_id, e);
            return None;
        }
    };

    // Typed messages are server-shaped echoes; clients do not send them.
    if value.get("MessageType").is_some() {
        trace!("Ignoring typed message from {}", client_id);
        return None;
    }

    let update: ClientIdUpdate = match serde_json::from_value(value) {
        Ok(update) => update,
        Err(e) => {
            warn!("Invalid id-update message from {}: {}", client_id, e);
            return None;
        }
    };

    core.handle_client_id_update(client_id, &update);
    // Acknowledge the scope change with data rather than a bare ack
    core.generate_timetable_message(client_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use timetable_core::model::{ScenarioInfo, SyncedData, TrainData, WorkData, WorkGroupData};

    struct FakeBridge {
        snapshot: Option<Vec<WorkGroupData>>,
        tx: broadcast::Sender<TrainChanged>,
    }

    impl FakeBridge {
        fn with_trains(train_ids: &[&str]) -> Self {
            let (tx, _) = broadcast::channel(4);
            let trains = train_ids
                .iter()
                .map(|id| TrainData {
                    id: Some(id.to_string()),
                    train_number: id.to_uppercase(),
                    ..Default::default()
                })
                .collect();
            FakeBridge {
                snapshot: Some(vec![WorkGroupData {
                    id: Some("wg-1".to_string()),
                    name: "Test".to_string(),
                    works: vec![WorkData {
                        id: Some("w-1".to_string()),
                        name: "Test".to_string(),
                        trains,
                        ..Default::default()
                    }],
                    ..Default::default()
                }]),
                tx,
            }
        }
    }

    impl TimetableBridge for FakeBridge {
        fn is_scenario_loaded(&self) -> bool {
            self.snapshot.is_some()
        }
        fn current_scenario(&self) -> Option<ScenarioInfo> {
            self.snapshot
                .as_ref()
                .map(|_| ScenarioInfo::new("Test", "Test", "Test"))
        }
        fn work_group(&self) -> Option<Vec<WorkGroupData>> {
            self.snapshot.clone()
        }
        fn synced_data(&self) -> SyncedData {
            match self.snapshot {
                Some(_) => SyncedData::new(Some(100.0), Some(1000), true),
                None => SyncedData::not_loaded(),
            }
        }
        fn subscribe_train_changed(&self) -> broadcast::Receiver<TrainChanged> {
            self.tx.subscribe()
        }
    }

    fn core_with_trains(train_ids: &[&str]) -> WebSocketCore {
        WebSocketCore::new(Arc::new(FakeBridge::with_trains(train_ids)))
    }

    #[test]
    fn test_synced_data_message_wraps_bridge() {
        let core = core_with_trains(&["t-1"]);
        let (msg, data) = core.generate_synced_data_message();
        assert_eq!(
            msg,
            ServerMessage::SyncedData {
                location_m: Some(100.0),
                time_ms: 1000,
                can_start: true,
            }
        );
        // The snapshot travels with the message so callers can record
        // the time that was pushed
        assert_eq!(data.time_ms, Some(1000));
    }

    #[test]
    fn test_timetable_message_unscoped_by_default() {
        let core = core_with_trains(&["t-1"]);
        let id = core.create_client_state();
        match core.generate_timetable_message(&id).unwrap() {
            ServerMessage::Timetable {
                work_group_id,
                work_id,
                train_id,
                data,
            } => {
                assert_eq!(work_group_id, None);
                assert_eq!(work_id, None);
                assert_eq!(train_id, None);
                assert_eq!(data.len(), 1);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_timetable_message_tags_used_scope() {
        let core = core_with_trains(&["t-1", "t-2"]);
        let id = core.create_client_state();
        // work id and train id both set: train wins
        core.handle_client_id_update(
            &id,
            &ClientIdUpdate {
                work_id: Some("w-1".to_string()),
                train_id: Some("t-2".to_string()),
                ..Default::default()
            },
        );
        match core.generate_timetable_message(&id).unwrap() {
            ServerMessage::Timetable {
                train_id, work_id, ..
            } => {
                assert_eq!(train_id.as_deref(), Some("t-2"));
                assert_eq!(work_id, None);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_timetable_message_none_for_unknown_scope() {
        let core = core_with_trains(&["t-1"]);
        let id = core.create_client_state();
        core.handle_client_id_update(
            &id,
            &ClientIdUpdate {
                train_id: Some("no-such-train".to_string()),
                ..Default::default()
            },
        );
        assert!(core.generate_timetable_message(&id).is_none());
    }

    #[test]
    fn test_handle_text_message_paths() {
        let core = core_with_trains(&["t-1"]);
        let id = core.create_client_state();

        // Malformed JSON: dropped
        assert!(handle_text_message(&core, &id, "{not json").is_none());
        // Typed message: ignored
        assert!(handle_text_message(&core, &id, "{\"MessageType\":\"SyncedData\"}").is_none());
        // Scope update: acknowledged with scoped data
        let msg = handle_text_message(&core, &id, "{\"trainId\":\"t-1\"}").unwrap();
        match msg {
            ServerMessage::Timetable { train_id, .. } => {
                assert_eq!(train_id.as_deref(), Some("t-1"))
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_unregister_is_idempotent_and_ends_generation() {
        let core = core_with_trains(&["t-1"]);
        let id = core.create_client_state();
        core.unregister_client_state(&id);
        core.unregister_client_state(&id);
        assert!(core.generate_timetable_message(&id).is_none());
    }
}
