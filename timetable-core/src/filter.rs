//! Snapshot filtering by client-selected scope.
//!
//! Every bridge must expose the same filter semantics: an empty id or an
//! id with no match yields `None`, otherwise the snapshot narrowed to the
//! subtree carrying the id. Bridges that can filter at the source
//! may do so, but the observable behavior has to match these functions.

use crate::model::WorkGroupData;

fn non_empty(groups: Vec<WorkGroupData>) -> Option<Vec<WorkGroupData>> {
    if groups.is_empty() {
        None
    } else {
        Some(groups)
    }
}

/// Work groups whose own id matches.
pub fn by_work_group_id(
    snapshot: Option<Vec<WorkGroupData>>,
    work_group_id: &str,
) -> Option<Vec<WorkGroupData>> {
    if work_group_id.is_empty() {
        return None;
    }
    let groups = snapshot?
        .into_iter()
        .filter(|wg| wg.id.as_deref() == Some(work_group_id))
        .collect();
    non_empty(groups)
}

/// Work groups narrowed to the work with the given id.
pub fn by_work_id(
    snapshot: Option<Vec<WorkGroupData>>,
    work_id: &str,
) -> Option<Vec<WorkGroupData>> {
    if work_id.is_empty() {
        return None;
    }
    let groups = snapshot?
        .into_iter()
        .filter_map(|mut wg| {
            wg.works.retain(|w| w.id.as_deref() == Some(work_id));
            if wg.works.is_empty() {
                None
            } else {
                Some(wg)
            }
        })
        .collect();
    non_empty(groups)
}

/// Work groups narrowed to the train with the given id: every train in
/// the result carries that id.
pub fn by_train_id(
    snapshot: Option<Vec<WorkGroupData>>,
    train_id: &str,
) -> Option<Vec<WorkGroupData>> {
    if train_id.is_empty() {
        return None;
    }
    let groups = snapshot?
        .into_iter()
        .filter_map(|mut wg| {
            wg.works.retain_mut(|w| {
                w.trains.retain(|t| t.id.as_deref() == Some(train_id));
                !w.trains.is_empty()
            });
            if wg.works.is_empty() {
                None
            } else {
                Some(wg)
            }
        })
        .collect();
    non_empty(groups)
}
