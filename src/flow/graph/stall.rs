// SPDX-License-Identifier: MIT

//! Diagnostics for runs where pending units remain but none is ready

use super::DependencyGraph;
use crate::adk::error::{StallCause, StallError};
use crate::flow::state::StatusTracker;
use crate::flow::types::{RunStatus, UnitId};
use std::collections::HashSet;

/// One diagnostic per pending unit, in registration order
///
/// Unknown dependencies take precedence over failed ones, which take
/// precedence over waits on other pending units.
pub fn diagnose_stall(
    graph: &DependencyGraph,
    tracker: &StatusTracker,
    pending: &HashSet<UnitId>,
) -> Vec<StallError> {
    graph
        .all_ids()
        .iter()
        .filter(|id| pending.contains(*id))
        .map(|id| StallError {
            unit: id.clone(),
            cause: classify(graph, tracker, id),
        })
        .collect()
}

fn classify(graph: &DependencyGraph, tracker: &StatusTracker, id: &str) -> StallCause {
    let missing = graph.missing_dependencies_of(id);
    if !missing.is_empty() {
        return StallCause::MissingDependencies(missing);
    }

    let deps = graph.dependencies_of(id);
    let failed: Vec<UnitId> = deps
        .iter()
        .filter(|d| {
            matches!(
                tracker.status(d),
                Some(RunStatus::Error) | Some(RunStatus::Skipped)
            )
        })
        .cloned()
        .collect();
    if !failed.is_empty() {
        return StallCause::FailedDependencies(failed);
    }

    StallCause::Unresolved(
        deps.iter()
            .filter(|d| tracker.status(d) != Some(RunStatus::Success))
            .cloned()
            .collect(),
    )
}
