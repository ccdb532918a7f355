use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::routes_build::{delete_current_build, get_current_build, post_build};
use crate::routes_site::{delete_site, get_site, post_back, post_event, post_reload, post_site};
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

pub fn api_error(status: StatusCode, e: impl std::fmt::Display) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { error: e.to_string() }))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/site", get(get_site).post(post_site).delete(delete_site))
        .route("/site/events", post(post_event))
        .route("/site/back", post(post_back))
        .route("/site/reload", post(post_reload))
        .route("/builds", post(post_build))
        .route("/builds/current", get(get_current_build).delete(delete_current_build))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
