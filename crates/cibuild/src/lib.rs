//! Remote CI builds
//!
//! Starts a GitHub Actions workflow for a repository, waits for its newest
//! run to complete and resolves a download link for the produced artifact.

mod api;
mod artifact;
mod build;
mod github;
mod poller;
mod repo_ref;

pub use api::{Artifact, ArtifactList, CiApi, RunStatus, WorkflowRun, WorkflowRunList};
pub use artifact::{ArtifactLinks, DEFAULT_LINK_BASE};
pub use build::{BuildRequest, BuildType, DEFAULT_BRANCH};
pub use github::{http_client, GitHubActions, DEFAULT_API_URL, DEFAULT_TIMEOUT, DEFAULT_WORKFLOW};
pub use poller::{Completion, PollOutcome, PollPolicy, RunPoller, Tick};
pub use repo_ref::{parse_repo_url, RepoRef};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CiError {
    #[error("paste the GitHub repository URL first")]
    EmptyRepoUrl,

    #[error("not a GitHub repository URL: {0}")]
    InvalidRepoUrl(String),

    #[error("unknown build type: {0}")]
    UnknownBuildType(String),

    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, CiError>;
