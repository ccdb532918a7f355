use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cibuild::{BuildType, PollOutcome, RepoRef};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Idle,
    Triggering,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

#[derive(Clone, Debug, Serialize)]
pub struct BuildSnapshot {
    pub generation: Option<Uuid>,
    pub phase: BuildPhase,
    pub in_flight: bool,
    pub repo: Option<RepoRef>,
    pub repo_url: Option<String>,
    pub build_type: BuildType,
    pub attempts: u32,
    pub run_url: Option<String>,
    pub download_url: Option<String>,
    pub message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
#[error("a build is already running")]
pub struct AlreadyInFlight;

/// Build screen state. One build at a time; every mutation from a poll task
/// names its generation and is dropped if the session has moved on.
#[derive(Debug)]
pub struct BuildSession {
    generation: Option<Uuid>,
    phase: BuildPhase,
    repo: Option<RepoRef>,
    build_type: BuildType,
    attempts: Arc<AtomicU32>,
    run_url: Option<String>,
    download_url: Option<String>,
    message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    cancel: Option<CancellationToken>,
}

impl Default for BuildSession {
    fn default() -> Self {
        Self {
            generation: None,
            phase: BuildPhase::Idle,
            repo: None,
            build_type: BuildType::default(),
            attempts: Arc::new(AtomicU32::new(0)),
            run_url: None,
            download_url: None,
            message: None,
            started_at: None,
            updated_at: None,
            cancel: None,
        }
    }
}

impl BuildSession {
    pub fn in_flight(&self) -> bool {
        matches!(self.phase, BuildPhase::Triggering | BuildPhase::Polling)
    }

    /// Take the in-flight slot for a new build.
    pub fn begin(&mut self, repo: RepoRef, build_type: BuildType) -> Result<Uuid, AlreadyInFlight> {
        if self.in_flight() {
            return Err(AlreadyInFlight);
        }

        let generation = Uuid::new_v4();
        let now = Utc::now();
        *self = Self {
            generation: Some(generation),
            phase: BuildPhase::Triggering,
            repo: Some(repo),
            build_type,
            started_at: Some(now),
            updated_at: Some(now),
            ..Self::default()
        };
        Ok(generation)
    }

    pub fn dispatch_failed(&mut self, generation: Uuid, message: String) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.phase = BuildPhase::Failed;
        self.message = Some(message);
        self.touch();
        true
    }

    /// Move to polling and keep the token that stops the poll task.
    /// Returns the attempt counter the task should report into.
    pub fn start_polling(&mut self, generation: Uuid, cancel: CancellationToken) -> Option<Arc<AtomicU32>> {
        if !self.is_current(generation) || self.phase != BuildPhase::Triggering {
            return None;
        }
        self.phase = BuildPhase::Polling;
        self.cancel = Some(cancel);
        self.touch();
        Some(self.attempts.clone())
    }

    /// Fold the end of a poll task into the session. A cancelled poll leaves
    /// nothing to record: only `reset` cancels, and it already moved on.
    pub fn finish(&mut self, generation: Uuid, outcome: &PollOutcome) -> bool {
        if !self.is_current(generation) || self.phase != BuildPhase::Polling {
            return false;
        }

        match outcome {
            PollOutcome::Cancelled { .. } => return false,
            PollOutcome::Completed { completion: done, .. } => {
                self.phase = BuildPhase::Completed;
                self.run_url = done.run.html_url.clone();
                self.download_url = done.download_url.clone();
                self.message = match &done.artifact {
                    Some(a) => Some(format!("artifact {} ready", a.name)),
                    None => Some("run completed without artifacts".to_string()),
                };
            }
            PollOutcome::TimedOut { attempts } => {
                self.phase = BuildPhase::TimedOut;
                self.message = Some(format!("no completed run after {attempts} checks"));
            }
        }
        self.attempts.store(outcome.attempts(), Ordering::Relaxed);
        self.cancel = None;
        self.touch();
        true
    }

    /// Leave the build screen: stop any poll task and forget the build.
    pub fn reset(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        *self = Self::default();
    }

    pub fn snapshot(&self) -> BuildSnapshot {
        BuildSnapshot {
            generation: self.generation,
            phase: self.phase,
            in_flight: self.in_flight(),
            repo: self.repo.clone(),
            repo_url: self.repo.as_ref().map(RepoRef::html_url),
            build_type: self.build_type,
            attempts: self.attempts.load(Ordering::Relaxed),
            run_url: self.run_url.clone(),
            download_url: self.download_url.clone(),
            message: self.message.clone(),
            started_at: self.started_at,
            updated_at: self.updated_at,
        }
    }

    fn is_current(&self, generation: Uuid) -> bool {
        self.generation == Some(generation)
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
