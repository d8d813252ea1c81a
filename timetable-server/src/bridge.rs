//! The seam between the server core and simulator-specific adapters.
//!
//! One `TimetableBridge` instance exists per process, owned by whatever
//! hosts the server (a simulator plugin, or the demo binary). The server
//! only ever reads snapshots through this trait; the bridge's own polling
//! or event glue against the simulator lives entirely behind it, so a new
//! simulator needs a new adapter and nothing else.
//!
//! Snapshot reads must be copy-on-read consistent: a caller never observes
//! a half-updated scenario. All data-returning operations yield the
//! empty/`None` form while no scenario is loaded.

use tokio::sync::broadcast;

use timetable_core::filter;
use timetable_core::model::{ScenarioInfo, SyncedData, WorkGroupData};

/// Raised when the identity of the "current" train changes (scenario
/// reload, detected train-number change). Consumers push fresh timetable
/// data instead of polling for it.
#[derive(Debug, Clone, Default)]
pub struct TrainChanged {
    pub train_id: Option<String>,
}

pub trait TimetableBridge: Send + Sync {
    /// True iff a scenario/run is currently active.
    fn is_scenario_loaded(&self) -> bool;

    /// `None` when no scenario is loaded.
    fn current_scenario(&self) -> Option<ScenarioInfo>;

    /// Full timetable snapshot, internally consistent within one call;
    /// `None` when no scenario is loaded.
    fn work_group(&self) -> Option<Vec<WorkGroupData>>;

    /// Subtree containing the given work-group id. A bridge may override
    /// this for efficiency but must keep the semantics of
    /// [`filter::by_work_group_id`] (empty id or no match yields `None`).
    fn work_group_by_work_group_id(&self, work_group_id: &str) -> Option<Vec<WorkGroupData>> {
        filter::by_work_group_id(self.work_group(), work_group_id)
    }

    /// Subtree containing the given work id.
    fn work_group_by_work_id(&self, work_id: &str) -> Option<Vec<WorkGroupData>> {
        filter::by_work_id(self.work_group(), work_id)
    }

    /// Subtree containing the given train id.
    fn work_group_by_train_id(&self, train_id: &str) -> Option<Vec<WorkGroupData>> {
        filter::by_train_id(self.work_group(), train_id)
    }

    /// Never fails: returns the all-empty form when not loaded.
    fn synced_data(&self) -> SyncedData;

    /// Subscribe to train-identity changes. Dropping the receiver is the
    /// unsubscribe; each connection holds its receiver for exactly the
    /// connection lifetime.
    fn subscribe_train_changed(&self) -> broadcast::Receiver<TrainChanged>;
}
