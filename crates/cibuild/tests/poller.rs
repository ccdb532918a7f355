use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use cibuild::{
    Artifact, ArtifactLinks, BuildRequest, CiApi, CiError, PollOutcome, PollPolicy, RepoRef, RunPoller, RunStatus,
    Tick, WorkflowRun,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Replays a fixed list of `latest_run` answers, then reports "no run".
#[derive(Default)]
struct ScriptedApi {
    runs: Mutex<VecDeque<cibuild::Result<Option<WorkflowRun>>>>,
    artifacts: Vec<Artifact>,
    branches: Mutex<Vec<String>>,
    run_calls: AtomicU32,
    artifact_calls: AtomicU32,
}

impl ScriptedApi {
    fn new(runs: Vec<cibuild::Result<Option<WorkflowRun>>>, artifacts: Vec<Artifact>) -> Arc<Self> {
        Arc::new(Self {
            runs: Mutex::new(runs.into()),
            artifacts,
            ..Default::default()
        })
    }

    fn run_calls(&self) -> u32 {
        self.run_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CiApi for ScriptedApi {
    async fn dispatch(&self, _repo: &RepoRef, _req: &BuildRequest) -> cibuild::Result<()> {
        Ok(())
    }

    async fn latest_run(&self, _repo: &RepoRef, branch: &str) -> cibuild::Result<Option<WorkflowRun>> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        self.branches.lock().unwrap().push(branch.to_string());
        self.runs.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn list_artifacts(&self, _run: &WorkflowRun) -> cibuild::Result<Vec<Artifact>> {
        self.artifact_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.artifacts.clone())
    }
}

fn run(id: u64, status: &str) -> WorkflowRun {
    WorkflowRun {
        id,
        status: RunStatus::from(status.to_string()),
        conclusion: None,
        artifacts_url: format!("https://api.github.com/repos/acme/app/actions/runs/{id}/artifacts"),
        html_url: None,
        created_at: None,
    }
}

fn artifact(id: u64) -> Artifact {
    Artifact {
        id,
        name: "app-release".into(),
        expired: false,
    }
}

fn acme() -> RepoRef {
    RepoRef::new("acme", "app")
}

fn fast_policy(max_attempts: Option<u32>) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_secs(10),
        max_attempts,
    }
}

#[tokio::test(start_paused = true)]
async fn test_completed_run_resolves_first_artifact() {
    let api = ScriptedApi::new(vec![Ok(Some(run(1, "completed")))], vec![artifact(555), artifact(556)]);
    let poller = RunPoller::new(api.clone(), acme());

    let outcome = poller.run(&CancellationToken::new(), |_, _| {}).await;

    let PollOutcome::Completed { completion: done, attempts } = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(attempts, 1);
    assert_eq!(done.artifact.map(|a| a.id), Some(555));
    assert_eq!(
        done.download_url.as_deref(),
        Some("https://nightly.link/acme/app/actions/artifacts/555.zip")
    );
    assert_eq!(api.run_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_completed_run_without_artifacts_has_no_link() {
    let api = ScriptedApi::new(vec![Ok(Some(run(1, "completed")))], vec![]);
    let poller = RunPoller::new(api.clone(), acme());

    match poller.run(&CancellationToken::new(), |_, _| {}).await {
        PollOutcome::Completed { completion: done, .. } => {
            assert_eq!(done.artifact, None);
            assert_eq!(done.download_url, None);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(api.artifact_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pending_tick_reports_run_without_link() {
    let api = ScriptedApi::new(vec![Ok(Some(run(9, "in_progress")))], vec![artifact(1)]);
    let poller = RunPoller::new(api.clone(), acme());

    let tick = poller.tick().await.unwrap();
    assert_eq!(tick, Tick::Pending { run: Some(run(9, "in_progress")) });
    assert_eq!(api.artifact_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_pending_run_schedules_exactly_one_more_check() {
    let api = ScriptedApi::new(
        vec![Ok(Some(run(1, "queued"))), Ok(Some(run(1, "completed")))],
        vec![artifact(7)],
    );
    let poller = RunPoller::new(api.clone(), acme()).policy(fast_policy(None));

    let mut seen = Vec::new();
    let started = Instant::now();
    let outcome = poller
        .run(&CancellationToken::new(), |attempt, r| seen.push((attempt, r.map(|r| r.status.clone()))))
        .await;

    assert!(matches!(outcome, PollOutcome::Completed { .. }));
    assert_eq!(seen, vec![(1, Some(RunStatus::Queued))]);
    assert_eq!(api.run_calls(), 2);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(10) && waited < Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn test_missing_run_is_rescheduled() {
    let api = ScriptedApi::new(
        vec![Ok(None), Ok(None), Ok(Some(run(3, "completed")))],
        vec![artifact(1)],
    );
    let poller = RunPoller::new(api.clone(), acme()).policy(fast_policy(None));

    let outcome = poller.run(&CancellationToken::new(), |_, _| {}).await;

    assert!(matches!(outcome, PollOutcome::Completed { .. }));
    assert_eq!(outcome.attempts(), 3);
    assert_eq!(api.run_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_check_errors_are_retried() {
    let api = ScriptedApi::new(
        vec![
            Err(CiError::Decode("rate limited".into())),
            Ok(Some(run(3, "completed"))),
        ],
        vec![artifact(1)],
    );
    let poller = RunPoller::new(api.clone(), acme()).policy(fast_policy(None));

    let mut pending = 0;
    let outcome = poller.run(&CancellationToken::new(), |_, _| pending += 1).await;

    assert!(matches!(outcome, PollOutcome::Completed { .. }));
    assert_eq!(pending, 1);
}

#[tokio::test(start_paused = true)]
async fn test_attempt_budget_times_out() {
    let api = ScriptedApi::new(
        vec![
            Ok(Some(run(1, "in_progress"))),
            Ok(Some(run(1, "in_progress"))),
            Ok(Some(run(1, "in_progress"))),
            Ok(Some(run(1, "completed"))),
        ],
        vec![],
    );
    let poller = RunPoller::new(api.clone(), acme()).policy(fast_policy(Some(3)));

    let outcome = poller.run(&CancellationToken::new(), |_, _| {}).await;

    assert_eq!(outcome, PollOutcome::TimedOut { attempts: 3 });
    assert_eq!(api.run_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_polling() {
    let api = ScriptedApi::new(vec![], vec![]);
    let poller = RunPoller::new(api.clone(), acme()).policy(fast_policy(None));
    let cancel = CancellationToken::new();

    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { poller.run(&cancel, |_, _| {}).await })
    };

    tokio::time::sleep(Duration::from_secs(25)).await;
    cancel.cancel();
    let outcome = task.await.unwrap();

    assert_eq!(outcome, PollOutcome::Cancelled { attempts: 3 });
    assert_eq!(api.run_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_runs_older_than_dispatch_are_skipped() {
    let dispatched_at = Utc::now();
    let mut old = run(1, "completed");
    old.created_at = Some(dispatched_at - TimeDelta::hours(1));
    let mut fresh = run(2, "completed");
    fresh.created_at = Some(dispatched_at + TimeDelta::seconds(3));

    let api = ScriptedApi::new(vec![Ok(Some(old)), Ok(Some(fresh))], vec![artifact(20)]);
    let poller = RunPoller::new(api.clone(), acme())
        .policy(fast_policy(None))
        .not_before(dispatched_at);

    match poller.run(&CancellationToken::new(), |_, _| {}).await {
        PollOutcome::Completed { completion, .. } => assert_eq!(completion.run.id, 2),
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(api.artifact_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_branch_and_link_base_are_used() {
    let api = ScriptedApi::new(vec![Ok(Some(run(1, "completed")))], vec![artifact(4)]);
    let poller = RunPoller::new(api.clone(), acme())
        .branch("release")
        .links(ArtifactLinks::new("https://links.example"));

    let outcome = poller.run(&CancellationToken::new(), |_, _| {}).await;

    let PollOutcome::Completed { completion: done, .. } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(
        done.download_url.as_deref(),
        Some("https://links.example/acme/app/actions/artifacts/4.zip")
    );
    assert_eq!(*api.branches.lock().unwrap(), vec!["release".to_string()]);
}
