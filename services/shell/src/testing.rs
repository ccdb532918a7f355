use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use cibuild::{Artifact, BuildRequest, CiApi, CiError, RepoRef, RunStatus, WorkflowRun};
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::session::{BuildPhase, BuildSnapshot};
use crate::state::{AppState, SharedState};

/// In-memory CI service. Answers `latest_run` from a queue, then "no run".
#[derive(Default)]
pub struct FakeCi {
    pub fail_dispatch: bool,
    pub dispatches: Mutex<Vec<(RepoRef, BuildRequest)>>,
    pub runs: Mutex<VecDeque<WorkflowRun>>,
    pub artifacts: Vec<Artifact>,
}

impl FakeCi {
    pub fn completing(artifacts: Vec<Artifact>) -> Arc<Self> {
        Arc::new(Self {
            runs: Mutex::new(VecDeque::from([completed_run(1)])),
            artifacts,
            ..Default::default()
        })
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatches.lock().unwrap().len()
    }
}

#[async_trait]
impl CiApi for FakeCi {
    async fn dispatch(&self, repo: &RepoRef, req: &BuildRequest) -> cibuild::Result<()> {
        self.dispatches.lock().unwrap().push((repo.clone(), req.clone()));
        if self.fail_dispatch {
            return Err(CiError::Decode("HTTP 404 Not Found".into()));
        }
        Ok(())
    }

    async fn latest_run(&self, _repo: &RepoRef, _branch: &str) -> cibuild::Result<Option<WorkflowRun>> {
        Ok(self.runs.lock().unwrap().pop_front())
    }

    async fn list_artifacts(&self, _run: &WorkflowRun) -> cibuild::Result<Vec<Artifact>> {
        Ok(self.artifacts.clone())
    }
}

pub fn completed_run(id: u64) -> WorkflowRun {
    WorkflowRun {
        id,
        status: RunStatus::Completed,
        conclusion: Some("success".into()),
        artifacts_url: format!("https://api.github.com/repos/acme/app/actions/runs/{id}/artifacts"),
        html_url: Some(format!("https://github.com/acme/app/actions/runs/{id}")),
        created_at: None,
    }
}

pub fn test_state(ci: Arc<FakeCi>) -> SharedState {
    let cfg = AppConfig::from_lookup(|k| (k == "GITHUB_TOKEN").then(|| "test-token".to_string()))
        .expect("test config");
    Arc::new(AppState::new(cfg, ci))
}

pub async fn send(
    state: &SharedState,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let resp = crate::app::router(state.clone())
        .oneshot(req.body(body).unwrap())
        .await
        .unwrap();

    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

pub async fn wait_for_phase(state: &SharedState, phase: BuildPhase) -> BuildSnapshot {
    for _ in 0..100 {
        let snapshot = state.builds.lock().await.snapshot();
        if snapshot.phase == phase {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("build never reached {phase:?}");
}
