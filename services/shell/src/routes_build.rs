use axum::{extract::State, http::StatusCode, Json};
use cibuild::BuildType;
use serde::Deserialize;
use tracing::info;

use crate::app::{api_error, ApiResult};
use crate::build_task::{start_build, BuildError};
use crate::session::BuildSnapshot;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct TriggerBuildReq {
    pub repo_url: String,
    #[serde(default)]
    pub build_type: BuildType,
}

pub async fn post_build(
    State(st): State<SharedState>,
    Json(req): Json<TriggerBuildReq>,
) -> ApiResult<(StatusCode, Json<BuildSnapshot>)> {
    match start_build(&st, &req.repo_url, req.build_type).await {
        Ok(snapshot) => Ok((StatusCode::ACCEPTED, Json(snapshot))),
        Err(e @ BuildError::Input(_)) => Err(api_error(StatusCode::BAD_REQUEST, e)),
        Err(e @ BuildError::InFlight(_)) => Err(api_error(StatusCode::CONFLICT, e)),
        Err(e @ BuildError::Dispatch(_)) => Err(api_error(StatusCode::BAD_GATEWAY, e)),
    }
}

pub async fn get_current_build(State(st): State<SharedState>) -> Json<BuildSnapshot> {
    Json(st.builds.lock().await.snapshot())
}

/// Leaving the build screen stops polling.
pub async fn delete_current_build(State(st): State<SharedState>) -> Json<BuildSnapshot> {
    let mut session = st.builds.lock().await;
    if session.in_flight() {
        info!("build: cancelled by user");
    }
    session.reset();
    Json(session.snapshot())
}
