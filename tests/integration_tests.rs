//! Integration tests for unit loading and run execution
//!
//! These tests drive the engine end to end with a mock executor.

use agentflow_rs::adk::credentials::{CredentialStore, Credentials, StaticCredentialStore};
use agentflow_rs::adk::error::{ExecutionError, FlowError, ValidationError};
use agentflow_rs::flow::{Engine, RunStatus, StatusEntry, UnitLoader, WorkExecutor, WorkUnit};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

// ============================================================================
// Mock Components
// ============================================================================

static ALL_KEYS: Lazy<Arc<StaticCredentialStore>> = Lazy::new(|| {
    Arc::new(
        StaticCredentialStore::new()
            .with("gemini", "g-key")
            .with("openai", "o-key")
            .with("grok", "x-key"),
    )
});

#[derive(Debug, Clone)]
struct Dispatch {
    id: String,
    started: Instant,
    finished: Instant,
}

/// Executor whose behaviour is scripted per unit id
#[derive(Default)]
struct MockExecutor {
    failures: HashSet<String>,
    delays: HashMap<String, Duration>,
    gates: HashMap<String, Arc<Notify>>,
    log: Mutex<Vec<Dispatch>>,
}

impl MockExecutor {
    fn new() -> Self {
        Self::default()
    }

    fn failing(mut self, id: &str) -> Self {
        self.failures.insert(id.to_string());
        self
    }

    fn slow(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    fn gated(mut self, id: &str, gate: Arc<Notify>) -> Self {
        self.gates.insert(id.to_string(), gate);
        self
    }

    fn dispatches(&self) -> Vec<Dispatch> {
        self.log.lock().unwrap().clone()
    }

    fn dispatch_of(&self, id: &str) -> Dispatch {
        self.dispatches()
            .into_iter()
            .find(|d| d.id == id)
            .unwrap_or_else(|| panic!("{} was never dispatched", id))
    }
}

#[async_trait]
impl WorkExecutor for MockExecutor {
    async fn run(
        &self,
        unit: &WorkUnit,
        prompt: &str,
        credentials: &Credentials,
    ) -> Result<String, ExecutionError> {
        let started = Instant::now();
        if let Some(gate) = self.gates.get(&unit.id) {
            gate.notified().await;
        }
        if let Some(delay) = self.delays.get(&unit.id) {
            tokio::time::sleep(*delay).await;
        }
        self.log.lock().unwrap().push(Dispatch {
            id: unit.id.clone(),
            started,
            finished: Instant::now(),
        });

        if self.failures.contains(&unit.id) {
            return Err(ExecutionError::api("Mock", format!("{} failed", unit.id)));
        }
        let key = credentials
            .get(&unit.provider)
            .ok_or_else(|| ExecutionError::CredentialMissing(unit.provider.clone()))?;
        Ok(format!("{}|{}|{}", unit.id, prompt, key))
    }
}

fn unit(id: &str, deps: &[&str]) -> WorkUnit {
    WorkUnit::new(id, "gemini", "gemini-2.5-flash").depends_on(deps.iter().copied())
}

fn engine(executor: Arc<MockExecutor>) -> Engine {
    engine_with_keys(executor, ALL_KEYS.clone())
}

fn engine_with_keys(executor: Arc<MockExecutor>, keys: Arc<dyn CredentialStore>) -> Engine {
    Engine::new(executor, keys)
}

fn entry<'a>(snapshot: &'a [StatusEntry], id: &str) -> &'a StatusEntry {
    snapshot
        .iter()
        .find(|e| e.unit_id == id)
        .unwrap_or_else(|| panic!("no entry for {}", id))
}

fn statuses(snapshot: &[StatusEntry]) -> Vec<(String, RunStatus)> {
    snapshot
        .iter()
        .map(|e| (e.unit_id.clone(), e.status))
        .collect()
}

// ============================================================================
// Scheduling Tests
// ============================================================================

#[tokio::test]
async fn test_failed_unit_skips_dependent() {
    let executor = Arc::new(MockExecutor::new().failing("a"));
    let result = engine(executor.clone())
        .run(vec![unit("a", &[]), unit("b", &["a"])], "doc")
        .await
        .unwrap();

    assert_eq!(
        statuses(&result),
        vec![
            ("a".to_string(), RunStatus::Error),
            ("b".to_string(), RunStatus::Skipped)
        ]
    );
    assert_eq!(
        entry(&result, "a").error.as_deref(),
        Some("Mock API Error: a failed")
    );
    assert_eq!(entry(&result, "b").blocked_by.as_deref(), Some("a"));
    assert!(entry(&result, "b").output.is_none());
    assert_eq!(executor.dispatches().len(), 1);
}

#[tokio::test]
async fn test_independent_units_share_one_round() {
    let executor = Arc::new(
        MockExecutor::new()
            .slow("a", Duration::from_millis(100))
            .slow("b", Duration::from_millis(100)),
    );
    let result = engine(executor.clone())
        .run(vec![unit("a", &[]), unit("b", &[])], "doc")
        .await
        .unwrap();

    assert!(result.iter().all(|e| e.status == RunStatus::Success));
    let a = executor.dispatch_of("a");
    let b = executor.dispatch_of("b");
    // Overlapping execution windows
    assert!(a.started < b.finished && b.started < a.finished);
    assert_eq!(entry(&result, "a").output.as_deref(), Some("a|doc|g-key"));
}

#[tokio::test]
async fn test_two_unit_cycle_stalls() {
    let executor = Arc::new(MockExecutor::new());
    let result = engine(executor.clone())
        .run(vec![unit("a", &["b"]), unit("b", &["a"])], "doc")
        .await
        .unwrap();

    for e in &result {
        assert_eq!(e.status, RunStatus::Error);
        assert!(e
            .error
            .as_deref()
            .unwrap()
            .starts_with("Circular dependency or stalled graph"));
        assert_eq!(e.elapsed_s, Some(0.0));
    }
    assert!(executor.dispatches().is_empty());
}

#[tokio::test]
async fn test_diamond_failure_skips_all_descendants() {
    let executor = Arc::new(MockExecutor::new().failing("a"));
    let result = engine(executor)
        .run(
            vec![
                unit("a", &[]),
                unit("b", &["a"]),
                unit("c", &["a"]),
                unit("d", &["b", "c"]),
            ],
            "doc",
        )
        .await
        .unwrap();

    assert_eq!(entry(&result, "a").status, RunStatus::Error);
    for id in ["b", "c", "d"] {
        assert_eq!(entry(&result, id).status, RunStatus::Skipped);
        assert_eq!(entry(&result, id).blocked_by.as_deref(), Some("a"));
    }
}

#[tokio::test]
async fn test_mid_graph_failure_leaves_siblings_running() {
    let executor = Arc::new(MockExecutor::new().failing("b"));
    let result = engine(executor)
        .run(
            vec![
                unit("a", &[]),
                unit("b", &["a"]),
                unit("c", &["a"]),
                unit("d", &["b"]),
                unit("e", &["c"]),
            ],
            "doc",
        )
        .await
        .unwrap();

    assert_eq!(
        statuses(&result),
        vec![
            ("a".to_string(), RunStatus::Success),
            ("b".to_string(), RunStatus::Error),
            ("c".to_string(), RunStatus::Success),
            ("d".to_string(), RunStatus::Skipped),
            ("e".to_string(), RunStatus::Success),
        ]
    );
}

#[tokio::test]
async fn test_unknown_dependency_stalls_with_its_name() {
    let executor = Arc::new(MockExecutor::new());
    let result = engine(executor)
        .run(vec![unit("a", &[]), unit("b", &["ghost"])], "doc")
        .await
        .unwrap();

    assert_eq!(entry(&result, "a").status, RunStatus::Success);
    let b = entry(&result, "b");
    assert_eq!(b.status, RunStatus::Error);
    let message = b.error.as_deref().unwrap();
    assert!(message.starts_with("Circular dependency or stalled graph"));
    assert!(message.contains("ghost"));
}

#[tokio::test]
async fn test_downstream_of_cycle_also_stalls() {
    let executor = Arc::new(MockExecutor::new());
    let result = engine(executor)
        .run(
            vec![
                unit("root", &[]),
                unit("a", &["b"]),
                unit("b", &["a"]),
                unit("c", &["a", "root"]),
            ],
            "doc",
        )
        .await
        .unwrap();

    assert_eq!(entry(&result, "root").status, RunStatus::Success);
    for id in ["a", "b", "c"] {
        assert_eq!(entry(&result, id).status, RunStatus::Error);
    }
    assert!(entry(&result, "c")
        .error
        .as_deref()
        .unwrap()
        .contains("waiting on unit(s) a that can never run"));
}

#[tokio::test]
async fn test_round_barrier_holds_unrelated_units() {
    let executor = Arc::new(MockExecutor::new().slow("slow", Duration::from_millis(150)));
    let result = engine(executor.clone())
        .run(
            vec![
                unit("slow", &[]),
                unit("fast", &[]),
                unit("next", &["fast"]),
            ],
            "doc",
        )
        .await
        .unwrap();

    assert!(result.iter().all(|e| e.status == RunStatus::Success));
    let slow = executor.dispatch_of("slow");
    let next = executor.dispatch_of("next");
    assert!(next.started >= slow.finished);
}

#[tokio::test]
async fn test_every_unit_dispatched_once() {
    let executor = Arc::new(MockExecutor::new().failing("c"));
    let units = vec![
        unit("a", &[]),
        unit("b", &["a"]),
        unit("c", &["a"]),
        unit("d", &["b"]),
        unit("e", &["b", "d"]),
        unit("f", &["c"]),
    ];
    let result = engine(executor.clone()).run(units, "doc").await.unwrap();

    let mut seen = HashSet::new();
    for d in executor.dispatches() {
        assert!(seen.insert(d.id.clone()), "{} dispatched twice", d.id);
    }
    assert_eq!(seen.len(), 5);
    assert!(!seen.contains("f"));
    assert!(result.iter().all(|e| e.is_terminal()));
}

// ============================================================================
// Observation Tests
// ============================================================================

#[tokio::test]
async fn test_snapshot_polling_during_run() {
    let gate = Arc::new(Notify::new());
    let executor = Arc::new(MockExecutor::new().gated("a", gate.clone()));
    let mut handle = engine(executor)
        .start_run(vec![unit("a", &[]), unit("b", &["a"])], "doc")
        .unwrap();

    // Wait until "a" is visibly running
    loop {
        let snapshot = handle.snapshot();
        if entry(&snapshot, "a").status == RunStatus::Running {
            assert_eq!(entry(&snapshot, "b").status, RunStatus::Scheduled);
            assert!(entry(&snapshot, "a").started_at.is_some());
            break;
        }
        assert!(handle.changed().await);
    }
    assert_eq!(handle.progress_percent(), 0.0);
    assert!(!handle.is_finished());

    gate.notify_one();
    let result = handle.wait().await.unwrap();
    assert!(result.iter().all(|e| e.status == RunStatus::Success));
}

#[tokio::test]
async fn test_progress_and_elapsed() {
    let executor = Arc::new(MockExecutor::new().slow("a", Duration::from_millis(30)));
    let handle = engine(executor)
        .start_run(vec![unit("a", &[]), unit("b", &["a"])], "doc")
        .unwrap();
    let run_id = handle.run_id();
    assert!(!run_id.is_nil());

    let result = handle.wait().await.unwrap();
    for e in &result {
        let elapsed = e.elapsed_s.unwrap();
        assert!(elapsed >= 0.0);
        assert_eq!((elapsed * 100.0).round() / 100.0, elapsed);
        assert!(e.started_at.unwrap() >= e.created_at);
    }
    assert!(entry(&result, "a").elapsed_s.unwrap() >= 0.02);
    assert_eq!(
        agentflow_rs::flow::state::progress_percent(&result),
        100.0
    );
}

#[tokio::test]
async fn test_snapshot_preserves_registration_order_and_labels() {
    let executor = Arc::new(MockExecutor::new());
    let units = vec![
        unit("z", &["y"]).with_name("Last"),
        unit("y", &[]).with_name("First"),
    ];
    let result = engine(executor).run(units, "doc").await.unwrap();
    assert_eq!(result[0].label(), "Agent 1: Last");
    assert_eq!(result[1].label(), "Agent 2: First");
    assert_eq!(result[0].prompt, "doc");
}

// ============================================================================
// Pre-run Error Tests
// ============================================================================

#[tokio::test]
async fn test_missing_credentials_abort_before_dispatch() {
    let executor = Arc::new(MockExecutor::new());
    let keys: Arc<dyn CredentialStore> = Arc::new(StaticCredentialStore::new().with("gemini", "g"));
    let units = vec![
        WorkUnit::new("a", "grok", "grok-3-mini"),
        WorkUnit::new("b", "gemini", "gemini-2.5-flash"),
        WorkUnit::new("c", "OpenAI", "gpt-4o-mini"),
        WorkUnit::new("d", "Grok", "grok-3-mini"),
    ];

    let err = engine_with_keys(executor.clone(), keys)
        .start_run(units, "doc")
        .err()
        .unwrap();
    match err {
        FlowError::Credential(e) => {
            assert_eq!(e.missing, vec!["grok", "openai"]);
            assert_eq!(
                e.to_string(),
                "Missing API keys for providers: grok, openai"
            );
        }
        other => panic!("expected credential error, got {}", other),
    }
    assert!(executor.dispatches().is_empty());
}

#[tokio::test]
async fn test_validation_errors_abort_before_dispatch() {
    let cases = vec![
        (
            vec![unit("a", &[]), unit("a", &[])],
            ValidationError::DuplicateId("a".to_string()),
        ),
        (
            vec![unit("a", &["a"])],
            ValidationError::SelfDependency("a".to_string()),
        ),
        (
            vec![unit("", &[])],
            ValidationError::EmptyId { position: 1 },
        ),
    ];

    for (units, expected) in cases {
        let executor = Arc::new(MockExecutor::new());
        let err = engine(executor.clone())
            .start_run(units, "doc")
            .err()
            .unwrap();
        match err {
            FlowError::Validation(e) => assert_eq!(e, expected),
            other => panic!("expected validation error, got {}", other),
        }
        assert!(executor.dispatches().is_empty());
    }
}

// ============================================================================
// Loader Tests
// ============================================================================

#[tokio::test]
async fn test_yaml_units_run_end_to_end() {
    let yaml = r#"
name: Review
agents:
  - id: extract
    name: Extractor
    provider: gemini
  - id: critique
    name: Critic
    model: gpt-4.1-mini
    depends_on: extract
  - name: Describer
    provider: grok
    image_url: https://example.com/page.png
    dependencies: [extract, critique]
"#;
    let units = UnitLoader::parse_yaml(yaml).unwrap();
    assert_eq!(units[2].id, "agent_3");
    assert_eq!(units[2].model, "grok-4-fast-reasoning");

    let executor = Arc::new(MockExecutor::new());
    let result = engine(executor).run(units, "contract").await.unwrap();

    assert!(result.iter().all(|e| e.status == RunStatus::Success));
    assert_eq!(
        entry(&result, "critique").output.as_deref(),
        Some("critique|contract|o-key")
    );
    assert_eq!(
        entry(&result, "agent_3").output.as_deref(),
        Some("agent_3|contract|x-key")
    );
    assert_eq!(entry(&result, "agent_3").label(), "Agent 3: Describer");
}

#[test]
fn test_load_units_from_file() {
    let dir = std::env::temp_dir().join(format!("agentflow-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("units.yaml");
    std::fs::write(
        &path,
        "agents:\n  - id: one\n    provider: openai\n  - id: two\n    provider: openai\n    depends_on: [one]\n",
    )
    .unwrap();

    let units = UnitLoader::new().load_units(&path).unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[1].dependencies, vec!["one"]);

    std::fs::remove_dir_all(&dir).unwrap();
}
