use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Artifact, ArtifactLinks, CiApi, RepoRef, Result, WorkflowRun, DEFAULT_BRANCH};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_MAX_ATTEMPTS: u32 = 360;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until cancelled.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
        }
    }
}

/// A completed run and what was resolved from it.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub run: WorkflowRun,
    pub artifact: Option<Artifact>,
    pub download_url: Option<String>,
}

/// Result of a single check.
#[derive(Clone, Debug, PartialEq)]
pub enum Tick {
    /// Not done yet; `run` is the newest matching run if one exists.
    Pending { run: Option<WorkflowRun> },
    Completed(Completion),
}

/// How a poll loop ended and how many checks it made.
#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    Completed { completion: Completion, attempts: u32 },
    Cancelled { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Completed { attempts, .. }
            | PollOutcome::Cancelled { attempts }
            | PollOutcome::TimedOut { attempts } => *attempts,
        }
    }
}

/// Watches the newest run of a workflow until it completes.
pub struct RunPoller {
    api: Arc<dyn CiApi>,
    repo: RepoRef,
    branch: String,
    links: ArtifactLinks,
    policy: PollPolicy,
    not_before: Option<DateTime<Utc>>,
}

impl RunPoller {
    pub fn new(api: Arc<dyn CiApi>, repo: RepoRef) -> Self {
        Self {
            api,
            repo,
            branch: DEFAULT_BRANCH.to_string(),
            links: ArtifactLinks::default(),
            policy: PollPolicy::default(),
            not_before: None,
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn links(mut self, links: ArtifactLinks) -> Self {
        self.links = links;
        self
    }

    pub fn policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ignore runs created before `ts`, so a finished run from an earlier
    /// dispatch is not picked up as this one.
    pub fn not_before(mut self, ts: DateTime<Utc>) -> Self {
        self.not_before = Some(ts);
        self
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Perform exactly one check.
    pub async fn tick(&self) -> Result<Tick> {
        let Some(run) = self.api.latest_run(&self.repo, &self.branch).await? else {
            return Ok(Tick::Pending { run: None });
        };

        if self.is_stale(&run) {
            debug!(repo=%self.repo, run_id=run.id, "poller: newest run predates dispatch");
            return Ok(Tick::Pending { run: None });
        }

        if !run.status.is_completed() {
            return Ok(Tick::Pending { run: Some(run) });
        }

        let artifacts = self.api.list_artifacts(&run).await?;
        let artifact = artifacts.into_iter().next();
        let download_url = artifact
            .as_ref()
            .map(|a| self.links.download_url(&self.repo, a.id));

        Ok(Tick::Completed(Completion {
            run,
            artifact,
            download_url,
        }))
    }

    /// Tick until the run completes, the attempt budget runs out or `cancel`
    /// fires. `on_pending` sees the attempt number after every check that
    /// did not complete. Errors from a check are logged and retried.
    pub async fn run<F>(&self, cancel: &CancellationToken, mut on_pending: F) -> PollOutcome
    where
        F: FnMut(u32, Option<&WorkflowRun>) + Send,
    {
        let mut attempts: u32 = 0;
        info!(repo=%self.repo, branch=%self.branch, "poller: started");

        loop {
            attempts += 1;

            let tick = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(repo=%self.repo, attempts, "poller: cancelled");
                    return PollOutcome::Cancelled { attempts: attempts - 1 };
                }
                t = self.tick() => t,
            };

            match tick {
                Ok(Tick::Completed(done)) => {
                    let artifact_id = done.artifact.as_ref().map(|a| a.id);
                    info!(repo=%self.repo, run_id=done.run.id, attempts, ?artifact_id, "poller: run completed");
                    return PollOutcome::Completed { completion: done, attempts };
                }
                Ok(Tick::Pending { run }) => {
                    let status = run.as_ref().map(|r| &r.status);
                    debug!(repo=%self.repo, attempt=attempts, ?status, "poller: still pending");
                    on_pending(attempts, run.as_ref());
                }
                Err(e) => {
                    warn!(repo=%self.repo, attempt=attempts, "poller: check failed: {e}");
                    on_pending(attempts, None);
                }
            }

            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    warn!(repo=%self.repo, attempts, "poller: giving up");
                    return PollOutcome::TimedOut { attempts };
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(repo=%self.repo, attempts, "poller: cancelled");
                    return PollOutcome::Cancelled { attempts };
                }
                _ = sleep(self.policy.interval) => {}
            }
        }
    }

    fn is_stale(&self, run: &WorkflowRun) -> bool {
        match (self.not_before, run.created_at) {
            (Some(limit), Some(created)) => created < limit,
            _ => false,
        }
    }
}
