// SPDX-License-Identifier: MIT

use super::DependencyGraph;
use crate::flow::state::StatusTracker;
use crate::flow::types::{RunStatus, UnitId};
use std::collections::HashSet;

/// Pending units whose every dependency has succeeded, in registration order
///
/// Dependencies on ids outside the graph are never satisfied.
pub fn ready_units(
    graph: &DependencyGraph,
    tracker: &StatusTracker,
    pending: &HashSet<UnitId>,
) -> Vec<UnitId> {
    graph
        .all_ids()
        .iter()
        .filter(|id| pending.contains(*id))
        .filter(|id| {
            graph
                .dependencies_of(id)
                .iter()
                .all(|dep| tracker.status(dep) == Some(RunStatus::Success))
        })
        .cloned()
        .collect()
}
