use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use siteview::{NavCommand, RendererEvent, ViewerSnapshot};
use tracing::{debug, info};

use crate::app::{api_error, ApiResult};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct OpenSiteReq {
    pub url: String,
}

#[derive(Serialize)]
pub struct EventResp {
    pub applied: bool,
    pub viewer: ViewerSnapshot,
}

#[derive(Serialize)]
pub struct NavResp {
    pub command: NavCommand,
    pub viewer: ViewerSnapshot,
}

pub async fn get_site(State(st): State<SharedState>) -> Json<ViewerSnapshot> {
    Json(st.viewer.read().await.snapshot())
}

pub async fn post_site(
    State(st): State<SharedState>,
    Json(req): Json<OpenSiteReq>,
) -> ApiResult<Json<ViewerSnapshot>> {
    let mut viewer = st.viewer.write().await;
    let url = viewer
        .open(&req.url)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    info!(%url, "site: open");
    Ok(Json(viewer.snapshot()))
}

pub async fn delete_site(State(st): State<SharedState>) -> Json<ViewerSnapshot> {
    let mut viewer = st.viewer.write().await;
    viewer.close();
    Json(viewer.snapshot())
}

pub async fn post_event(
    State(st): State<SharedState>,
    Json(event): Json<RendererEvent>,
) -> Json<EventResp> {
    let mut viewer = st.viewer.write().await;
    let applied = viewer.apply(event);
    if !applied {
        debug!("site: renderer event with no open site");
    }
    Json(EventResp {
        applied,
        viewer: viewer.snapshot(),
    })
}

pub async fn post_back(State(st): State<SharedState>) -> ApiResult<Json<NavResp>> {
    let viewer = st.viewer.read().await;
    let command = viewer
        .go_back()
        .map_err(|e| api_error(StatusCode::CONFLICT, e))?;
    Ok(Json(NavResp {
        command,
        viewer: viewer.snapshot(),
    }))
}

pub async fn post_reload(State(st): State<SharedState>) -> ApiResult<Json<NavResp>> {
    let mut viewer = st.viewer.write().await;
    let command = viewer
        .reload()
        .map_err(|e| api_error(StatusCode::CONFLICT, e))?;
    Ok(Json(NavResp {
        command,
        viewer: viewer.snapshot(),
    }))
}
