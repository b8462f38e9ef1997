// SPDX-License-Identifier: MIT

//! Per-unit status bookkeeping for a run

use crate::flow::types::{RunStatus, StatusEntry, UnitId, WorkUnit};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

/// A requested state change for one unit
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Running,
    Success { output: String },
    Error { message: String },
    Skipped { blocked_by: UnitId },
}

impl StatusUpdate {
    fn target(&self) -> RunStatus {
        match self {
            StatusUpdate::Running => RunStatus::Running,
            StatusUpdate::Success { .. } => RunStatus::Success,
            StatusUpdate::Error { .. } => RunStatus::Error,
            StatusUpdate::Skipped { .. } => RunStatus::Skipped,
        }
    }
}

/// Outcome of [`StatusTracker::set`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Illegal transition or unknown id; nothing changed
    Ignored,
}

/// Number of entries in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub scheduled: usize,
    pub running: usize,
    pub success: usize,
    pub error: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a StatusEntry>) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            match entry.status {
                RunStatus::Scheduled => counts.scheduled += 1,
                RunStatus::Running => counts.running += 1,
                RunStatus::Success => counts.success += 1,
                RunStatus::Error => counts.error += 1,
                RunStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.scheduled + self.running + self.success + self.error + self.skipped
    }

    pub fn terminal(&self) -> usize {
        self.success + self.error + self.skipped
    }
}

/// Terminal entries as a percentage of all entries; 0 when there are none
pub fn progress_percent(entries: &[StatusEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let terminal = entries.iter().filter(|e| e.is_terminal()).count();
    terminal as f64 / entries.len() as f64 * 100.0
}

/// Status map for one run, in registration order
///
/// Only the engine holds a tracker. Terminal entries are never rewritten.
#[derive(Debug)]
pub struct StatusTracker {
    entries: Vec<StatusEntry>,
    index: HashMap<UnitId, usize>,
    started: HashMap<UnitId, Instant>,
}

impl StatusTracker {
    /// Every unit starts `scheduled`; ids are assumed unique
    pub fn new(units: &[WorkUnit], prompt: &str) -> Self {
        let entries: Vec<StatusEntry> = units
            .iter()
            .enumerate()
            .map(|(i, unit)| StatusEntry::scheduled(unit, i + 1, prompt))
            .collect();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.unit_id.clone(), i))
            .collect();
        Self {
            entries,
            index,
            started: HashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&StatusEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn status(&self, id: &str) -> Option<RunStatus> {
        self.get(id).map(|e| e.status)
    }

    pub fn set(&mut self, id: &str, update: StatusUpdate) -> Transition {
        let Some(&i) = self.index.get(id) else {
            log::warn!("Ignoring {} for unknown unit '{}'", update.target(), id);
            return Transition::Ignored;
        };

        let from = self.entries[i].status;
        let to = update.target();
        let legal = matches!(
            (from, to),
            (RunStatus::Scheduled, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Success)
                | (RunStatus::Running, RunStatus::Error)
                | (RunStatus::Scheduled, RunStatus::Error)
                | (RunStatus::Scheduled, RunStatus::Skipped)
        );
        if !legal {
            log::warn!("Ignoring transition {} -> {} for unit '{}'", from, to, id);
            return Transition::Ignored;
        }

        if to == RunStatus::Running {
            self.started.insert(id.to_string(), Instant::now());
            let entry = &mut self.entries[i];
            entry.status = RunStatus::Running;
            entry.started_at = Some(Utc::now());
            return Transition::Applied;
        }

        let elapsed = self
            .started
            .remove(id)
            .map(|t| round2(t.elapsed().as_secs_f64()))
            .unwrap_or(0.0);

        let entry = &mut self.entries[i];
        entry.status = to;
        entry.elapsed_s = Some(elapsed);
        match update {
            StatusUpdate::Success { output } => entry.output = Some(output),
            StatusUpdate::Error { message } => entry.error = Some(message),
            StatusUpdate::Skipped { blocked_by } => entry.blocked_by = Some(blocked_by),
            StatusUpdate::Running => {}
        }
        Transition::Applied
    }

    /// Owned copy of every entry, in registration order
    pub fn snapshot(&self) -> Vec<StatusEntry> {
        self.entries.clone()
    }

    pub fn progress_percent(&self) -> f64 {
        progress_percent(&self.entries)
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::from_entries(&self.entries)
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(StatusEntry::is_terminal)
    }
}

fn round2(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
