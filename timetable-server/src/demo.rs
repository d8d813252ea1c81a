//! Built-in demo bridge.
//!
//! Serves a fixed sample timetable with a simulated clock derived from
//! wall-clock elapsed time, so the binary runs end-to-end without any
//! simulator attached. Loaded state and the current train can be toggled
//! at runtime, which also makes this a convenient test double.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use tokio::sync::broadcast;

use timetable_core::model::{
    ScenarioInfo, SyncedData, TimetableRowData, TrainData, WorkData, WorkGroupData,
};

use crate::bridge::{TimetableBridge, TrainChanged};

const WORK_GROUP_ID: &str = "demo-wg";
const WORK_ID: &str = "demo-w1";
/// Simulated departure time of the demo run: 06:00:00.
const START_TIME_MS: i64 = 6 * 3600 * 1000;
/// Cruising speed used to derive the simulated position, m/s.
const DEMO_SPEED_MPS: f64 = 15.0;

struct Inner {
    loaded: bool,
    current_train: usize,
    epoch: Instant,
}

pub struct DemoBridge {
    inner: Arc<RwLock<Inner>>,
    train_changed_tx: broadcast::Sender<TrainChanged>,
}

impl DemoBridge {
    pub fn new() -> Self {
        let (train_changed_tx, _) = broadcast::channel(8);
        DemoBridge {
            inner: Arc::new(RwLock::new(Inner {
                loaded: true,
                current_train: 0,
                epoch: Instant::now(),
            })),
            train_changed_tx,
        }
    }

    pub fn set_loaded(&self, loaded: bool) {
        let mut inner = self.inner.write().unwrap();
        if loaded && !inner.loaded {
            inner.epoch = Instant::now();
        }
        inner.loaded = loaded;
    }

    /// Switch to the other demo train and raise the train-changed event.
    pub fn switch_train(&self) {
        let train_id = {
            let mut inner = self.inner.write().unwrap();
            inner.current_train = (inner.current_train + 1) % TRAIN_NUMBERS.len();
            train_id_for(inner.current_train)
        };
        let _ = self.train_changed_tx.send(TrainChanged {
            train_id: Some(train_id),
        });
    }

    fn elapsed_ms(&self) -> i64 {
        self.inner.read().unwrap().epoch.elapsed().as_millis() as i64
    }
}

impl Default for DemoBridge {
    fn default() -> Self {
        Self::new()
    }
}

const TRAIN_NUMBERS: [&str; 2] = ["1201M", "1204M"];

fn train_id_for(index: usize) -> String {
    format!("demo-t{}", index + 1)
}

/// Stations of the demo line: name, location (m), track.
const STATIONS: [(&str, f64, &str); 5] = [
    ("Harborside", 0.0, "1"),
    ("Mill Park", 2100.0, "2"),
    ("Crossfield", 4650.0, "1"),
    ("North Gate", 7200.0, "3"),
    ("Summit", 9400.0, "1"),
];

fn route_length_m() -> f64 {
    STATIONS[STATIONS.len() - 1].1
}

fn time_text(ms: i64) -> String {
    let s = ms / 1000;
    format!("{:02}:{:02}:{:02}", s / 3600, (s / 60) % 60, s % 60)
}

fn sample_rows(reverse: bool) -> Vec<TimetableRowData> {
    let count = STATIONS.len();
    let mut rows = Vec::with_capacity(count);
    for i in 0..count {
        let (name, location, track) = if reverse {
            let (name, location, track) = STATIONS[count - 1 - i];
            (name, route_length_m() - location, track)
        } else {
            STATIONS[i]
        };
        // Two minutes between stops, one minute dwell
        let arrive_ms = START_TIME_MS + (i as i64) * 180_000;
        let is_last = i == count - 1;
        rows.push(TimetableRowData {
            id: Some(format!("row-{i}")),
            station_name: name.to_string(),
            location_m: location,
            on_station_detect_radius_m: Some(150.0),
            track_name: Some(track.to_string()),
            is_last_stop: is_last,
            has_bracket: i == 0,
            arrive: (i != 0).then(|| time_text(arrive_ms)),
            departure: (!is_last).then(|| time_text(arrive_ms + 60_000)),
            ..Default::default()
        });
    }
    rows
}

fn sample_snapshot() -> Vec<WorkGroupData> {
    let trains = TRAIN_NUMBERS
        .iter()
        .enumerate()
        .map(|(i, number)| TrainData {
            id: Some(train_id_for(i)),
            train_number: number.to_string(),
            nominal_tractive_capacity: Some("EMU 4 cars\n2M2T".to_string()),
            car_count: Some(4),
            destination: Some(if i % 2 == 0 { "Summit" } else { "Harborside" }.to_string()),
            direction: 1,
            timetable_rows: sample_rows(i % 2 == 1),
            ..Default::default()
        })
        .collect();

    vec![WorkGroupData {
        id: Some(WORK_GROUP_ID.to_string()),
        name: "Demo Line".to_string(),
        db_version: Some(1),
        works: vec![WorkData {
            id: Some(WORK_ID.to_string()),
            name: "Demo Line shuttle".to_string(),
            remarks: Some("Generated demo data; not a real service.".to_string()),
            trains,
            ..Default::default()
        }],
    }]
}

impl TimetableBridge for DemoBridge {
    fn is_scenario_loaded(&self) -> bool {
        self.inner.read().unwrap().loaded
    }

    fn current_scenario(&self) -> Option<ScenarioInfo> {
        let inner = self.inner.read().unwrap();
        if !inner.loaded {
            return None;
        }
        Some(ScenarioInfo::new(
            "Demo Line",
            TRAIN_NUMBERS[inner.current_train],
            "EMU 4 cars",
        ))
    }

    fn work_group(&self) -> Option<Vec<WorkGroupData>> {
        if !self.is_scenario_loaded() {
            return None;
        }
        Some(sample_snapshot())
    }

    fn synced_data(&self) -> SyncedData {
        if !self.is_scenario_loaded() {
            return SyncedData::not_loaded();
        }
        let elapsed_ms = self.elapsed_ms();
        let location = (elapsed_ms as f64 / 1000.0 * DEMO_SPEED_MPS).min(route_length_m());
        SyncedData::new(Some(location), Some(START_TIME_MS + elapsed_ms), true)
    }

    fn subscribe_train_changed(&self) -> broadcast::Receiver<TrainChanged> {
        self.train_changed_tx.subscribe()
    }
}
