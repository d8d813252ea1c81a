//! WebSocket wire messages.
//!
//! Outbound messages carry a `MessageType` discriminator; inbound
//! messages from the client are untyped scope-selection updates. Both
//! directions omit absent fields instead of writing `null`.

use serde::{Deserialize, Serialize};

use crate::model::{SyncedData, WorkGroupData};

/// Server-to-client message, discriminated by the `MessageType` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "MessageType")]
pub enum ServerMessage {
    /// Periodic position/time push.
    SyncedData {
        #[serde(rename = "Location_m", skip_serializing_if = "Option::is_none")]
        location_m: Option<f64>,
        #[serde(rename = "Time_ms")]
        time_ms: i64,
        #[serde(rename = "CanStart")]
        can_start: bool,
    },
    /// Timetable snapshot, tagged with whichever scope id produced it.
    Timetable {
        #[serde(rename = "WorkGroupId", skip_serializing_if = "Option::is_none")]
        work_group_id: Option<String>,
        #[serde(rename = "WorkId", skip_serializing_if = "Option::is_none")]
        work_id: Option<String>,
        #[serde(rename = "TrainId", skip_serializing_if = "Option::is_none")]
        train_id: Option<String>,
        #[serde(rename = "Data")]
        data: Vec<WorkGroupData>,
    },
}

impl ServerMessage {
    pub fn synced_data(data: &SyncedData) -> Self {
        ServerMessage::SyncedData {
            location_m: data.location_m,
            time_ms: data.time_ms.unwrap_or(0),
            can_start: data.can_start,
        }
    }

    /// A timetable message with no scope tag (full snapshot).
    pub fn full_timetable(data: Vec<WorkGroupData>) -> Self {
        ServerMessage::Timetable {
            work_group_id: None,
            work_id: None,
            train_id: None,
            data,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Client-to-server scope-selection update.
///
/// Any subset of the three ids may be present; keys are camelCase but
/// PascalCase is tolerated, and unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientIdUpdate {
    #[serde(
        rename = "workGroupId",
        alias = "WorkGroupId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub work_group_id: Option<String>,

    #[serde(
        rename = "workId",
        alias = "WorkId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub work_id: Option<String>,

    #[serde(
        rename = "trainId",
        alias = "TrainId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub train_id: Option<String>,
}
