use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BuildRequest, RepoRef, Result};

/// Status string of a workflow run. Only `completed` is terminal for us.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Other(String),
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            _ => RunStatus::Other(s),
        }
    }
}

impl From<RunStatus> for String {
    fn from(s: RunStatus) -> Self {
        match s {
            RunStatus::Queued => "queued".to_string(),
            RunStatus::InProgress => "in_progress".to_string(),
            RunStatus::Completed => "completed".to_string(),
            RunStatus::Other(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    #[serde(default)]
    pub id: u64,
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<String>,
    pub artifacts_url: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WorkflowRunList {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub expired: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ArtifactList {
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// The three calls the build flow needs from the CI service.
#[async_trait]
pub trait CiApi: Send + Sync {
    /// Ask the CI service to start the workflow. The response body is ignored.
    async fn dispatch(&self, repo: &RepoRef, req: &BuildRequest) -> Result<()>;

    /// Newest run of the workflow on `branch`, if any.
    async fn latest_run(&self, repo: &RepoRef, branch: &str) -> Result<Option<WorkflowRun>>;

    async fn list_artifacts(&self, run: &WorkflowRun) -> Result<Vec<Artifact>>;
}
