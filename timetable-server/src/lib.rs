//! # Timetable Server
//!
//! Embedded data-sync server for a local train simulator. It exposes the
//! running scenario's timetable to a companion timetable app on the same
//! machine or LAN:
//!
//! - One-shot JSON snapshots over HTTP (timetable, scenario info, sync)
//! - A WebSocket channel that pushes position/time updates and scoped
//!   timetable data
//! - An embedded connect page a browser can open to hand host and port
//!   to the app
//!
//! ## Architecture
//!
//! The crate is built on top of [`timetable_core`] for the wire model,
//! filtering and session bookkeeping, with [`tokio`] providing the async
//! runtime.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                   timetable-server                    │
//! │  ┌─────────────┐  ┌─────────────┐  ┌───────────────┐  │
//! │  │ HTTP routes │  │ WebSocket   │  │ Connect page  │  │
//! │  │ (axum)      │  │ sessions    │  │ (rust-embed)  │  │
//! │  └──────┬──────┘  └──────┬──────┘  └───────────────┘  │
//! │         │                │                            │
//! │         ▼                ▼                            │
//! │  ┌─────────────────────────────────────────────────┐  │
//! │  │          dyn TimetableBridge (Arc)              │  │
//! │  │  - scenario + timetable snapshots               │  │
//! │  │  - live position/time (SyncedData)              │  │
//! │  │  - train-changed broadcast                      │  │
//! │  └─────────────────────────────────────────────────┘  │
//! │         │                                             │
//! │         ▼                                             │
//! │    simulator state (here: the built-in DemoBridge)    │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`bridge::TimetableBridge`] - The seam between simulator and server
//! - [`web::Web`] - Listener, port negotiation and route table
//! - [`ws::WebSocketCore`] - Shared per-client scope state and message
//!   generation
//! - [`demo::DemoBridge`] - A self-driving bridge used when no simulator
//!   is attached
//!
//! ## HTTP API
//!
//! | Endpoint | Description |
//! |----------|-------------|
//! | `GET /` | 302 redirect to the connect page |
//! | `GET /index.html` | Embedded connect page |
//! | `GET /timetable.json` | Full timetable, 204 while nothing is loaded |
//! | `GET /scenario-info.json` | Scenario metadata, 204 while nothing is loaded |
//! | `GET /sync` | Current position/time snapshot |
//! | `WS /ws` | Push channel for sync and timetable messages |
//!
//! ## Command-Line Interface
//!
//! See [`Cli`]. Key options:
//!
//! - `-p, --port` - Preferred HTTP port (default: 58600, walks forward
//!   when taken)
//! - `-v` - Increase verbosity (use multiple times)
//! - `--sync-interval-ms` - Base period of the periodic sync push

use clap::Parser;

pub mod bridge;
pub mod demo;
pub mod web;
pub mod ws;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Preferred port for the webserver; consecutive ports are tried
    /// when it is already in use
    #[arg(short, long, default_value_t = 58600)]
    pub port: u16,

    /// Base period of the periodic sync push, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub sync_interval_ms: u64,

    /// Start without a scenario loaded; snapshots answer 204 until one is
    #[arg(long, default_value_t = false)]
    pub start_unloaded: bool,
}
