use std::sync::atomic::Ordering;

use chrono::{TimeDelta, Utc};
use cibuild::{parse_repo_url, BuildRequest, BuildType, CiError, RunPoller};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::session::{AlreadyInFlight, BuildSnapshot};
use crate::state::SharedState;

/// Slack for clock differences between us and the CI service when deciding
/// whether a run belongs to our dispatch.
const CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Input(CiError),

    #[error(transparent)]
    InFlight(#[from] AlreadyInFlight),

    #[error("could not start the build: {0}")]
    Dispatch(CiError),
}

/// Dispatch the workflow and hand polling to a background task.
///
/// Invalid input fails before any request is made. A failed dispatch is
/// reported and never retried.
pub async fn start_build(state: &SharedState, repo_url: &str, build_type: BuildType) -> Result<BuildSnapshot, BuildError> {
    let repo = parse_repo_url(repo_url).map_err(BuildError::Input)?;
    let generation = state.builds.lock().await.begin(repo.clone(), build_type)?;

    let request = BuildRequest::new(state.config.build_branch.clone(), build_type);
    let dispatched_at = Utc::now();
    info!(%repo, %build_type, %generation, "build: dispatching");

    if let Err(e) = state.ci.dispatch(&repo, &request).await {
        warn!(%repo, %generation, "build: dispatch failed: {e}");
        state.builds.lock().await.dispatch_failed(generation, e.to_string());
        return Err(BuildError::Dispatch(e));
    }

    let cancel = CancellationToken::new();
    let counter = {
        let mut session = state.builds.lock().await;
        match session.start_polling(generation, cancel.clone()) {
            Some(counter) => counter,
            None => {
                debug!(%generation, "build: session moved on before polling");
                return Ok(session.snapshot());
            }
        }
    };

    let poller = RunPoller::new(state.ci.clone(), repo)
        .branch(state.config.build_branch.clone())
        .links(state.links.clone())
        .policy(state.config.poll)
        .not_before(dispatched_at - TimeDelta::seconds(CLOCK_SKEW_SECS));

    let st = state.clone();
    tokio::spawn(async move {
        let outcome = poller
            .run(&cancel, |attempt, _| counter.store(attempt, Ordering::Relaxed))
            .await;

        if !st.builds.lock().await.finish(generation, &outcome) {
            debug!(%generation, "build: dropped stale poll result");
        }
    });

    let snapshot = state.builds.lock().await.snapshot();
    Ok(snapshot)
}
