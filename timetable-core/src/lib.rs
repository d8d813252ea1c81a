//! # Timetable Core
//!
//! Platform-independent data model and session logic for the local
//! timetable sync server.
//!
//! This crate contains the wire schema and pure session/scheduling logic
//! with **zero I/O dependencies**: no sockets, no async runtime. The
//! server crate supplies the listener, the WebSocket plumbing and the
//! simulator bridges; any bridge can reuse the types and the mandatory
//! filter semantics from here.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  timetable-core (no tokio, no sockets)                  │
//! │  ├── model/    (work group / work / train / row,        │
//! │  │              ScenarioInfo, SyncedData)               │
//! │  ├── filter/   (scope filtering, shared semantics)      │
//! │  ├── message/  (MessageType-tagged wire messages)       │
//! │  ├── session/  (per-client scope state, registry)       │
//! │  └── timing/   (simulated-second sync alignment)        │
//! └─────────────────────────────────────────────────────────┘
//!                        ▲
//!             ┌──────────┴──────────┐
//!             │  timetable-server   │
//!             │  (axum + tokio)     │
//!             └─────────────────────┘
//! ```
//!
//! ## Example: scoped filtering
//!
//! ```rust
//! use timetable_core::filter;
//! use timetable_core::model::WorkGroupData;
//!
//! let snapshot: Option<Vec<WorkGroupData>> = Some(vec![]);
//! // Empty ids and missing ids both yield None
//! assert!(filter::by_train_id(snapshot, "no-such-train").is_none());
//! ```

pub mod filter;
pub mod message;
pub mod model;
pub mod session;
pub mod timing;

// Re-export commonly used types
pub use message::{ClientIdUpdate, ServerMessage};
pub use model::{
    ScenarioInfo, SyncedData, TimetableRowData, TrainData, WorkData, WorkGroupData,
};
pub use session::{ClientRegistry, ClientState, Scope};
