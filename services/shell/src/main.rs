mod app;
mod build_task;
mod config;
mod routes_build;
mod routes_site;
mod session;
mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use cibuild::GitHubActions;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::state::{AppState, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;
    info!(?cfg, "config loaded");

    // --- Startup check (fail fast on a bad token) ---
    check_github(&cfg).await?;

    let ci = GitHubActions::with_timeout(
        cfg.github_api_url.clone(),
        cfg.build_workflow.clone(),
        cfg.github_token.clone(),
        cfg.github_timeout,
    )
    .context("Failed to build GitHub client")?;
    let app_state: SharedState = Arc::new(AppState::new(cfg.clone(), Arc::new(ci)));

    let app = app::router(app_state.clone());

    let addr = &cfg.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("site-shell listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown(app_state))
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown(state: SharedState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
    }
    info!("shutting down");
    state.teardown().await;
}

async fn check_github(cfg: &AppConfig) -> Result<()> {
    let url = format!("{}/rate_limit", cfg.github_api_url.trim_end_matches('/'));
    let resp = cibuild::http_client(cfg.github_timeout)
        .context("Failed to build GitHub client")?
        .get(&url)
        .bearer_auth(&cfg.github_token)
        .send()
        .await
        .context("GitHub API request failed")?;

    match resp.status() {
        StatusCode::OK => {
            info!("github: ok");
            Ok(())
        }
        StatusCode::UNAUTHORIZED => anyhow::bail!("GitHub rejected GITHUB_TOKEN (HTTP 401)"),
        other => {
            warn!(status=%other, "github: unexpected status from rate_limit, continuing");
            Ok(())
        }
    }
}
