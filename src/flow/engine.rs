// SPDX-License-Identifier: MIT

//! Execution engine - round-based concurrent scheduler
//!
//! Each round dispatches every ready unit as its own tokio task. Tasks
//! report back over a per-round channel and the engine applies every status
//! change itself, so the status map never needs a lock. A round ends only
//! when all of its units are terminal.
//!
//! A failed unit eagerly skips all of its pending descendants. When units
//! remain pending but none is ready, they are finalized as stalled and the
//! run ends.

use super::executor::{ProviderExecutor, WorkExecutor};
use super::graph::{diagnose_stall, ready_units, DependencyGraph};
use super::state::{progress_percent, StatusTracker, StatusUpdate};
use super::types::{StatusEntry, UnitId, WorkUnit};
use crate::adk::credentials::{CredentialStore, Credentials, EnvCredentialStore};
use crate::adk::error::{CredentialError, ExecutionError, FlowError, Result};
use crate::config::Settings;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

type Completion = (UnitId, std::result::Result<String, ExecutionError>);

pub struct Engine {
    executor: Arc<dyn WorkExecutor>,
    credentials: Arc<dyn CredentialStore>,
}

impl Engine {
    pub fn new(executor: Arc<dyn WorkExecutor>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            executor,
            credentials,
        }
    }

    /// Built-in providers with credentials read from the environment
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let executor = ProviderExecutor::from_settings(settings)
            .map_err(|e| FlowError::Config(format!("failed to build providers: {}", e)))?;
        Ok(Self::new(
            Arc::new(executor),
            Arc::new(EnvCredentialStore::new()),
        ))
    }

    /// Validate, check credentials and start the run in the background
    ///
    /// Must be called from within a tokio runtime. Nothing is dispatched if
    /// this returns an error.
    pub fn start_run(&self, units: Vec<WorkUnit>, prompt: impl Into<String>) -> Result<RunHandle> {
        let graph = DependencyGraph::build(&units)?;
        let providers = self.check_credentials(&units)?;
        let credentials = Credentials::collect(
            self.credentials.as_ref(),
            providers.iter().map(String::as_str),
        );

        let prompt: Arc<str> = Arc::from(prompt.into());
        let tracker = StatusTracker::new(&units, &prompt);
        let (updates, receiver) = watch::channel(tracker.snapshot());
        let run_id = Uuid::new_v4();

        log::info!(
            "Run {} starting: {} unit(s), providers [{}]",
            run_id,
            units.len(),
            providers.join(", ")
        );

        let scheduler = Scheduler {
            run_id,
            pending: graph.all_ids().iter().cloned().collect(),
            units: units
                .into_iter()
                .map(|u| (u.id.clone(), Arc::new(u)))
                .collect(),
            graph,
            tracker,
            executor: Arc::clone(&self.executor),
            credentials: Arc::new(credentials),
            prompt,
            updates,
        };
        let task = tokio::spawn(scheduler.drive());

        Ok(RunHandle {
            run_id,
            receiver,
            task,
        })
    }

    /// Start a run and wait for its final snapshot
    pub async fn run(&self, units: Vec<WorkUnit>, prompt: impl Into<String>) -> Result<Vec<StatusEntry>> {
        self.start_run(units, prompt)?.wait().await
    }

    /// Distinct providers in first-use order, or every one that lacks a key
    fn check_credentials(&self, units: &[WorkUnit]) -> std::result::Result<Vec<String>, CredentialError> {
        let mut providers: Vec<String> = Vec::new();
        for unit in units {
            let provider = unit.provider.to_ascii_lowercase();
            if !providers.contains(&provider) {
                providers.push(provider);
            }
        }

        let missing: Vec<String> = providers
            .iter()
            .filter(|p| !self.credentials.has_credential(p))
            .cloned()
            .collect();
        if !missing.is_empty() {
            log::error!("Missing credentials for: {}", missing.join(", "));
            return Err(CredentialError { missing });
        }
        Ok(providers)
    }
}

/// Observer side of a running (or finished) run
pub struct RunHandle {
    run_id: Uuid,
    receiver: watch::Receiver<Vec<StatusEntry>>,
    task: JoinHandle<Vec<StatusEntry>>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Latest published status map, in registration order
    pub fn snapshot(&self) -> Vec<StatusEntry> {
        self.receiver.borrow().clone()
    }

    pub fn progress_percent(&self) -> f64 {
        progress_percent(&self.receiver.borrow())
    }

    /// Wait for the next published update; false once the run has ended
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end and return its final snapshot
    pub async fn wait(self) -> Result<Vec<StatusEntry>> {
        self.task
            .await
            .map_err(|e| FlowError::Runtime(format!("run {}: {}", self.run_id, e)))
    }
}

/// Sole owner of the status map for one run
struct Scheduler {
    run_id: Uuid,
    graph: DependencyGraph,
    tracker: StatusTracker,
    pending: HashSet<UnitId>,
    units: HashMap<UnitId, Arc<WorkUnit>>,
    executor: Arc<dyn WorkExecutor>,
    credentials: Arc<Credentials>,
    prompt: Arc<str>,
    updates: watch::Sender<Vec<StatusEntry>>,
}

impl Scheduler {
    async fn drive(mut self) -> Vec<StatusEntry> {
        let mut round = 0;

        while !self.pending.is_empty() {
            let ready = ready_units(&self.graph, &self.tracker, &self.pending);
            if ready.is_empty() {
                self.finalize_stalled();
                break;
            }

            round += 1;
            log::info!(
                "Run {} round {}: dispatching {} unit(s): {:?}",
                self.run_id,
                round,
                ready.len(),
                ready
            );
            self.run_round(ready).await;
        }

        let counts = self.tracker.counts();
        log::info!(
            "Run {} finished after {} round(s): {} succeeded, {} failed, {} skipped",
            self.run_id,
            round,
            counts.success,
            counts.error,
            counts.skipped
        );
        self.tracker.snapshot()
    }

    async fn run_round(&mut self, ready: Vec<UnitId>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let mut outstanding: Vec<(UnitId, JoinHandle<()>)> = Vec::with_capacity(ready.len());

        for id in ready {
            self.pending.remove(&id);
            // Graph and unit table come from the same list
            let Some(unit) = self.units.get(&id).cloned() else {
                log::error!("Unit '{}' is in the graph but has no definition", id);
                self.complete(
                    &id,
                    Err(ExecutionError::failed(format!(
                        "Unit '{}' has no definition in this run",
                        id
                    ))),
                );
                continue;
            };
            self.tracker.set(&id, StatusUpdate::Running);

            let tx = tx.clone();
            let executor = Arc::clone(&self.executor);
            let credentials = Arc::clone(&self.credentials);
            let prompt = Arc::clone(&self.prompt);
            let handle = tokio::spawn(async move {
                let result = executor.run(&unit, &prompt, &credentials).await;
                // Receiver outlives every task of the round
                let _ = tx.send((unit.id.clone(), result));
            });
            outstanding.push((id, handle));
        }
        drop(tx);
        self.publish();

        let mut reported: HashSet<UnitId> = HashSet::new();
        while let Some((id, result)) = rx.recv().await {
            reported.insert(id.clone());
            self.complete(&id, result);
        }

        // Channel closed: every task has ended. Anything unreported panicked.
        for (id, handle) in outstanding {
            if reported.contains(&id) {
                continue;
            }
            let message = match handle.await {
                Err(e) if e.is_panic() => format!("Unit task panicked: {}", e),
                Err(e) => format!("Unit task aborted: {}", e),
                Ok(()) => "Unit task ended without reporting a result".to_string(),
            };
            self.complete(&id, Err(ExecutionError::failed(message)));
        }
    }

    fn complete(&mut self, id: &str, result: std::result::Result<String, ExecutionError>) {
        match result {
            Ok(output) => {
                log::info!("Unit '{}' succeeded", id);
                self.tracker.set(id, StatusUpdate::Success { output });
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("Unit '{}' failed: {}", id, message);
                self.tracker.set(id, StatusUpdate::Error { message });
                self.cascade(id);
            }
        }
        self.publish();
    }

    /// Skip every pending descendant of a failed unit
    fn cascade(&mut self, failed: &str) {
        let mut skipped = Vec::new();
        for id in self.graph.descendants_of(failed) {
            if self.pending.remove(&id) {
                self.tracker.set(
                    &id,
                    StatusUpdate::Skipped {
                        blocked_by: failed.to_string(),
                    },
                );
                skipped.push(id);
            }
        }
        if !skipped.is_empty() {
            log::warn!(
                "Skipping {} unit(s) blocked by '{}': {:?}",
                skipped.len(),
                failed,
                skipped
            );
        }
    }

    fn finalize_stalled(&mut self) {
        let stalls = diagnose_stall(&self.graph, &self.tracker, &self.pending);
        log::warn!(
            "Run {} stalled with {} pending unit(s)",
            self.run_id,
            stalls.len()
        );
        for stall in stalls {
            let message = stall.to_string();
            log::warn!("Unit '{}': {}", stall.unit, message);
            self.pending.remove(&stall.unit);
            self.tracker.set(&stall.unit, StatusUpdate::Error { message });
        }
        self.publish();
    }

    fn publish(&self) {
        self.updates.send_replace(self.tracker.snapshot());
    }
}
