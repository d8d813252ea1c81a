//! HTTP listener, port negotiation and routing.
//!
//! The listener binds the preferred port and walks forward over
//! consecutive ports on bind conflicts, so several simulators on one
//! machine can each host their own server. Snapshot resources are plain
//! GETs; `/ws` upgrades into the long-lived session loop in [`crate::ws`].
//! Every response is fully buffered and carries the any-origin CORS
//! header, since the companion app's embedded browser runs on a
//! different origin.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::{debug, info, warn};
use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};
use rust_embed::RustEmbed;
use serde::Serialize;
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_graceful_shutdown::SubsystemHandle;
use tower_http::cors::{Any, CorsLayer};

use crate::bridge::TimetableBridge;
use crate::ws::{client_session, WebSocketCore};
use crate::Cli;

const INDEX_URI: &str = "/index.html";
const TIMETABLE_URI: &str = "/timetable.json";
const SCENARIO_INFO_URI: &str = "/scenario-info.json";
const SYNC_URI: &str = "/sync";
const WS_URI: &str = "/ws";

const JSON_MIME: &str = "application/json";

/// How many consecutive ports are tried before startup fails.
pub const PORT_RETRY_MAX: u16 = 10;

#[derive(RustEmbed, Clone)]
#[folder = "assets/"]
struct Assets;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Socket operation failed")]
    Io(#[from] io::Error),
    #[error("All {attempts} ports starting at {base} are in use")]
    PortsExhausted { base: u16, attempts: u16 },
}

#[derive(Clone)]
pub struct Web {
    ws_core: Arc<WebSocketCore>,
    shutdown_tx: broadcast::Sender<()>,
    preferred_port: u16,
    sync_interval: Duration,
}

impl Web {
    pub fn new(bridge: Arc<dyn TimetableBridge>, args: &Cli) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Web {
            ws_core: Arc::new(WebSocketCore::new(bridge)),
            shutdown_tx,
            preferred_port: args.port,
            sync_interval: Duration::from_millis(args.sync_interval_ms),
        }
    }

    /// The route table; exposed separately so tests can drive it without
    /// a socket.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root_redirect))
            .route(INDEX_URI, get(index_page))
            .route(SYNC_URI, get(get_sync))
            .route(TIMETABLE_URI, get(get_timetable))
            .route(SCENARIO_INFO_URI, get(get_scenario_info))
            .route(WS_URI, get(ws_handler))
            .fallback(not_found)
            .layer(CorsLayer::new().allow_origin(Any))
            .with_state(self.clone())
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), WebError> {
        let (listener, port) = bind_listener(self.preferred_port).await?;

        let host = local_ipv4_addresses()
            .first()
            .map(Ipv4Addr::to_string)
            .unwrap_or_else(|| "localhost".to_string());
        info!("Starting timetable server on port {}", port);
        info!(
            "Open this link to connect the companion app: http://localhost:{}{}?host={}&port={}",
            port, INDEX_URI, host, port
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown_tx = self.shutdown_tx.clone();

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        tokio::select! { biased;
            _ = subsys.on_shutdown_requested() => {
                let _ = shutdown_tx.send(());
            },
            r = axum::serve(listener, app)
                    .with_graceful_shutdown(
                        async move {
                            _ = shutdown_rx.recv().await;
                        }
                    ) => {
                return r.map_err(WebError::Io);
            }
        }
        Ok(())
    }
}

/// Bind the preferred port, retrying on consecutive ports when it is
/// already in use. Any other bind failure is fatal.
pub async fn bind_listener(preferred_port: u16) -> Result<(TcpListener, u16), WebError> {
    bind_listener_with_retry(preferred_port, PORT_RETRY_MAX).await
}

pub async fn bind_listener_with_retry(
    preferred_port: u16,
    attempts: u16,
) -> Result<(TcpListener, u16), WebError> {
    for i in 0..attempts {
        let port = match preferred_port.checked_add(i) {
            Some(port) => port,
            None => break,
        };
        match TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)).await {
            Ok(listener) => {
                // The OS resolves port 0; always report what was bound
                let bound = listener.local_addr()?.port();
                if i > 0 {
                    debug!("Port {} was busy, bound {} instead", preferred_port, bound);
                }
                return Ok((listener, bound));
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                debug!("Port {} in use", port);
            }
            Err(e) => return Err(WebError::Io(e)),
        }
    }
    Err(WebError::PortsExhausted {
        base: preferred_port,
        attempts,
    })
}

/// Non-loopback IPv4 addresses of this host, for link/QR construction.
pub fn local_ipv4_addresses() -> Vec<Ipv4Addr> {
    match NetworkInterface::show() {
        Ok(interfaces) => interfaces
            .iter()
            .flat_map(|itf| itf.addr.iter())
            .filter_map(|addr| match addr {
                Addr::V4(v4) if !v4.ip.is_loopback() => Some(v4.ip),
                _ => None,
            })
            .collect(),
        Err(e) => {
            warn!("Could not enumerate network interfaces: {}", e);
            Vec::new()
        }
    }
}

async fn root_redirect() -> Response {
    // axum's Redirect only offers 303/307/308; the page is fetched by
    // plain browsers, keep the classic 302.
    (
        StatusCode::FOUND,
        [(header::LOCATION, INDEX_URI)],
        "Found",
    )
        .into_response()
}

async fn index_page() -> Response {
    match Assets::get("index.html") {
        Some(file) => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            file.data.into_owned(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Resource not found").into_response(),
    }
}

/// Serialize a snapshot; a failure surfaces as 500 with the detail.
fn json_snapshot<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => ([(header::CONTENT_TYPE, JSON_MIME)], body).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal Server Error: {}", e),
        )
            .into_response(),
    }
}

/// One-shot position/time snapshot; 200 even while nothing is loaded
/// (the body is then the all-empty form).
async fn get_sync(State(state): State<Web>) -> Response {
    json_snapshot(&state.ws_core.bridge().synced_data())
}

async fn get_timetable(State(state): State<Web>) -> Response {
    match state.ws_core.bridge().work_group() {
        Some(data) => json_snapshot(&data),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn get_scenario_info(State(state): State<Web>) -> Response {
    match state.ws_core.bridge().current_scenario() {
        Some(info) => json_snapshot(&info),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

async fn ws_handler(
    State(state): State<Web>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    debug!("WebSocket upgrade request from {}", addr);

    let shutdown_rx = state.shutdown_tx.subscribe();
    let train_changed_rx = state.ws_core.bridge().subscribe_train_changed();
    let core = state.ws_core.clone();
    let sync_interval = state.sync_interval;

    ws.on_upgrade(move |socket| {
        client_session(socket, core, train_changed_rx, shutdown_rx, sync_interval)
    })
}
