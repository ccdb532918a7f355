use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::debug;

use crate::{Artifact, ArtifactList, BuildRequest, CiApi, CiError, RepoRef, Result, WorkflowRun, WorkflowRunList};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_WORKFLOW: &str = "build-apk.yml";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const GITHUB_JSON: &str = "application/vnd.github+json";
const AGENT: &str = concat!("site-shell/", env!("CARGO_PKG_VERSION"));

/// HTTP client for GitHub calls. `timeout` bounds a whole request; the
/// connect phase gets at most [`CONNECT_TIMEOUT`] of it.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(CONNECT_TIMEOUT))
        .user_agent(AGENT)
        .build()?;
    Ok(client)
}

/// GitHub Actions REST client for a single workflow file.
pub struct GitHubActions {
    api_url: String,
    workflow: String,
    token: String,
    client: reqwest::Client,
}

impl GitHubActions {
    pub fn new(api_url: impl Into<String>, workflow: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_url, workflow, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        api_url: impl Into<String>,
        workflow: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            workflow: workflow.into(),
            token: token.into(),
            client: http_client(timeout)?,
        })
    }

    fn workflow_url(&self, repo: &RepoRef, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/actions/workflows/{}/{}",
            self.api_url, repo.owner, repo.name, self.workflow, tail
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_JSON)
    }
}

#[async_trait]
impl CiApi for GitHubActions {
    async fn dispatch(&self, repo: &RepoRef, req: &BuildRequest) -> Result<()> {
        let url = self.workflow_url(repo, "dispatches");
        debug!(%repo, git_ref=%req.git_ref, build_type=%req.build_type, "github: dispatch");

        self.client
            .post(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_JSON)
            .json(&req.dispatch_body())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn latest_run(&self, repo: &RepoRef, branch: &str) -> Result<Option<WorkflowRun>> {
        let url = self.workflow_url(repo, "runs");
        let body = self
            .get(&url)
            .query(&[("branch", branch), ("per_page", "1")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let list: WorkflowRunList = decode(&body)?;
        Ok(list.workflow_runs.into_iter().next())
    }

    async fn list_artifacts(&self, run: &WorkflowRun) -> Result<Vec<Artifact>> {
        let body = self
            .get(&run.artifacts_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let list: ArtifactList = decode(&body)?;
        Ok(list.artifacts)
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| CiError::Decode(e.to_string()))
}
