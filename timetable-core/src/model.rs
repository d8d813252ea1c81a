//! Timetable wire data model.
//!
//! These records are the JSON schema shared with the companion app: one
//! work group contains ordered works, each work contains ordered trains,
//! each train an ordered sequence of timetable rows (one per stop).
//!
//! Field names on the wire are fixed (PascalCase with unit suffixes such
//! as `Location_m`); every optional field is *omitted* from the output
//! when absent, never emitted as `null`, to keep payloads small on a
//! constrained mobile link.

use serde::{Deserialize, Serialize};

/// One scheduled stop (or pass) of a train at a station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimetableRowData {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "StationName")]
    pub station_name: String,

    /// Position of the station along the route, in meters.
    #[serde(rename = "Location_m")]
    pub location_m: f64,

    #[serde(rename = "Longitude_deg", skip_serializing_if = "Option::is_none")]
    pub longitude_deg: Option<f64>,

    #[serde(rename = "Latitude_deg", skip_serializing_if = "Option::is_none")]
    pub latitude_deg: Option<f64>,

    /// Radius around the station location within which the train is
    /// considered "at this station".
    #[serde(
        rename = "OnStationDetectRadius_m",
        skip_serializing_if = "Option::is_none"
    )]
    pub on_station_detect_radius_m: Option<f64>,

    #[serde(rename = "FullName", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(rename = "RecordType", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<i32>,

    #[serde(rename = "TrackName", skip_serializing_if = "Option::is_none")]
    pub track_name: Option<String>,

    #[serde(rename = "DriveTime_MM", skip_serializing_if = "Option::is_none")]
    pub drive_time_mm: Option<i32>,

    #[serde(rename = "DriveTime_SS", skip_serializing_if = "Option::is_none")]
    pub drive_time_ss: Option<i32>,

    /// Stop for operational reasons only; doors stay closed.
    #[serde(rename = "IsOperationOnlyStop", default)]
    pub is_operation_only_stop: bool,

    #[serde(rename = "IsPass", default)]
    pub is_pass: bool,

    /// Display hint: the first row's arrival time is shown bracketed.
    #[serde(rename = "HasBracket", default)]
    pub has_bracket: bool,

    #[serde(rename = "IsLastStop", default)]
    pub is_last_stop: bool,

    /// Arrival time text, e.g. `12:34:56` or `↓` for a pass.
    #[serde(rename = "Arrive", skip_serializing_if = "Option::is_none")]
    pub arrive: Option<String>,

    #[serde(rename = "Departure", skip_serializing_if = "Option::is_none")]
    pub departure: Option<String>,

    #[serde(rename = "RunInLimit", skip_serializing_if = "Option::is_none")]
    pub run_in_limit: Option<i32>,

    #[serde(rename = "RunOutLimit", skip_serializing_if = "Option::is_none")]
    pub run_out_limit: Option<i32>,

    #[serde(rename = "Remarks", skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(rename = "MarkerColor", skip_serializing_if = "Option::is_none")]
    pub marker_color: Option<String>,

    #[serde(rename = "MarkerText", skip_serializing_if = "Option::is_none")]
    pub marker_text: Option<String>,

    #[serde(rename = "WorkType", skip_serializing_if = "Option::is_none")]
    pub work_type: Option<i32>,
}

/// One train of a work: identity, consist description and its rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainData {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "TrainNumber")]
    pub train_number: String,

    #[serde(rename = "MaxSpeed", skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<String>,

    #[serde(rename = "SpeedType", skip_serializing_if = "Option::is_none")]
    pub speed_type: Option<String>,

    /// Rolling-stock description, e.g. car model plus motor/trailer split.
    #[serde(
        rename = "NominalTractiveCapacity",
        skip_serializing_if = "Option::is_none"
    )]
    pub nominal_tractive_capacity: Option<String>,

    #[serde(rename = "CarCount", skip_serializing_if = "Option::is_none")]
    pub car_count: Option<i32>,

    #[serde(rename = "Destination", skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    #[serde(rename = "BeginRemarks", skip_serializing_if = "Option::is_none")]
    pub begin_remarks: Option<String>,

    #[serde(rename = "AfterRemarks", skip_serializing_if = "Option::is_none")]
    pub after_remarks: Option<String>,

    #[serde(rename = "Remarks", skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(rename = "BeforeDeparture", skip_serializing_if = "Option::is_none")]
    pub before_departure: Option<String>,

    #[serde(rename = "TrainInfo", skip_serializing_if = "Option::is_none")]
    pub train_info: Option<String>,

    /// 1 for forward along the listed rows, -1 for reverse.
    #[serde(rename = "Direction", default = "default_direction")]
    pub direction: i32,

    #[serde(rename = "WorkType", skip_serializing_if = "Option::is_none")]
    pub work_type: Option<i32>,

    #[serde(rename = "AfterArrive", skip_serializing_if = "Option::is_none")]
    pub after_arrive: Option<String>,

    #[serde(
        rename = "BeforeDeparture_OnStationTrackCol",
        skip_serializing_if = "Option::is_none"
    )]
    pub before_departure_on_station_track_col: Option<String>,

    #[serde(
        rename = "AfterArrive_OnStationTrackCol",
        skip_serializing_if = "Option::is_none"
    )]
    pub after_arrive_on_station_track_col: Option<String>,

    #[serde(rename = "DayCount", default)]
    pub day_count: i32,

    #[serde(rename = "IsRideOnMoving", skip_serializing_if = "Option::is_none")]
    pub is_ride_on_moving: Option<bool>,

    #[serde(rename = "Color", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(rename = "TimetableRows", default)]
    pub timetable_rows: Vec<TimetableRowData>,
}

fn default_direction() -> i32 {
    1
}

/// One work (duty): an ordered set of trains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkData {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "AffectDate", skip_serializing_if = "Option::is_none")]
    pub affect_date: Option<String>,

    #[serde(rename = "AffixContentType", skip_serializing_if = "Option::is_none")]
    pub affix_content_type: Option<i32>,

    #[serde(rename = "AffixContent", skip_serializing_if = "Option::is_none")]
    pub affix_content: Option<String>,

    #[serde(rename = "Remarks", skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(
        rename = "HasETrainTimetable",
        skip_serializing_if = "Option::is_none"
    )]
    pub has_e_train_timetable: Option<bool>,

    #[serde(
        rename = "ETrainTimetableContentType",
        skip_serializing_if = "Option::is_none"
    )]
    pub e_train_timetable_content_type: Option<i32>,

    #[serde(
        rename = "ETrainTimetableContent",
        skip_serializing_if = "Option::is_none"
    )]
    pub e_train_timetable_content: Option<String>,

    #[serde(rename = "Trains", default)]
    pub trains: Vec<TrainData>,
}

/// Top level of one timetable snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkGroupData {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "DBVersion", skip_serializing_if = "Option::is_none")]
    pub db_version: Option<i32>,

    #[serde(rename = "Works", default)]
    pub works: Vec<WorkData>,
}

/// Information about the currently loaded scenario.
///
/// Serialized with camelCase keys (unlike the timetable records, which
/// keep their fixed PascalCase wire names). Equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInfo {
    pub route_name: String,
    /// Scenario / train-diagram name (train number, service class, ...).
    pub scenario_name: String,
    pub car_name: String,
}

impl ScenarioInfo {
    pub fn new(route_name: &str, scenario_name: &str, car_name: &str) -> Self {
        ScenarioInfo {
            route_name: route_name.to_string(),
            scenario_name: scenario_name.to_string(),
            car_name: car_name.to_string(),
        }
    }
}

/// The lightweight, frequently-pushed position+time snapshot.
///
/// All three fields are in their empty form together exactly when no
/// scenario is loaded. `time_ms` is milliseconds on a bridge-defined
/// simulated-time epoch, monotonic within one loaded scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncedData {
    #[serde(rename = "Location_m", skip_serializing_if = "Option::is_none")]
    pub location_m: Option<f64>,

    #[serde(rename = "Time_ms", skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<i64>,

    #[serde(rename = "CanStart", default)]
    pub can_start: bool,
}

impl SyncedData {
    /// The form returned while no scenario is loaded.
    pub fn not_loaded() -> Self {
        SyncedData::default()
    }

    pub fn new(location_m: Option<f64>, time_ms: Option<i64>, can_start: bool) -> Self {
        SyncedData {
            location_m,
            time_ms,
            can_start,
        }
    }
}

/// Check the row-ordering invariant: `location_m` must be non-decreasing
/// over adjacent rows (the train moves forward in one direction along the
/// listed stops within one snapshot).
pub fn rows_in_location_order(rows: &[TimetableRowData]) -> bool {
    rows.windows(2).all(|w| w[0].location_m <= w[1].location_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(station: &str, location_m: f64) -> TimetableRowData {
        TimetableRowData {
            station_name: station.to_string(),
            location_m,
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let r = row("Midway", 1200.0);
        let json = serde_json::to_string(&r).unwrap();

        assert!(json.contains("\"StationName\":\"Midway\""));
        assert!(json.contains("\"Location_m\":1200.0"));
        // No nulls, no keys for unset optionals
        assert!(!json.contains("null"));
        assert!(!json.contains("TrackName"));
        assert!(!json.contains("Longitude_deg"));
    }

    #[test]
    fn test_work_group_round_trip() {
        let wg = WorkGroupData {
            id: Some("wg-1".to_string()),
            name: "Morning".to_string(),
            db_version: Some(1),
            works: vec![WorkData {
                id: Some("w-1".to_string()),
                name: "Line A".to_string(),
                trains: vec![TrainData {
                    id: Some("t-1".to_string()),
                    train_number: "1234M".to_string(),
                    car_count: Some(8),
                    timetable_rows: vec![row("Origin", 0.0), row("Terminus", 5600.0)],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };

        let json = serde_json::to_string(&vec![wg.clone()]).unwrap();
        let parsed: Vec<WorkGroupData> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![wg]);
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_synced_data_not_loaded_form() {
        let sync = SyncedData::not_loaded();
        assert_eq!(sync.location_m, None);
        assert_eq!(sync.time_ms, None);
        assert!(!sync.can_start);

        let json = serde_json::to_string(&sync).unwrap();
        assert_eq!(json, "{\"CanStart\":false}");
    }

    #[test]
    fn test_synced_data_wire_names() {
        let sync = SyncedData::new(Some(1523.5), Some(45_296_000), true);
        let json = serde_json::to_string(&sync).unwrap();
        assert_eq!(
            json,
            "{\"Location_m\":1523.5,\"Time_ms\":45296000,\"CanStart\":true}"
        );
    }

    #[test]
    fn test_scenario_info_camel_case_and_equality() {
        let info = ScenarioInfo::new("Coast Line", "1234M Local", "EMU 8 cars");
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(
            json,
            "{\"routeName\":\"Coast Line\",\"scenarioName\":\"1234M Local\",\"carName\":\"EMU 8 cars\"}"
        );
        assert_eq!(info, ScenarioInfo::new("Coast Line", "1234M Local", "EMU 8 cars"));
        assert_ne!(info, ScenarioInfo::new("Coast Line", "1234M Local", "EMU 10 cars"));
    }

    #[test]
    fn test_row_ordering_invariant() {
        assert!(rows_in_location_order(&[]));
        assert!(rows_in_location_order(&[row("A", 0.0)]));
        assert!(rows_in_location_order(&[
            row("A", 0.0),
            row("B", 1000.0),
            row("B'", 1000.0),
            row("C", 2500.0),
        ]));
        assert!(!rows_in_location_order(&[
            row("A", 0.0),
            row("C", 2500.0),
            row("B", 1000.0),
        ]));
    }
}
