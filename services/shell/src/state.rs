use std::sync::Arc;

use cibuild::{ArtifactLinks, CiApi};
use siteview::SiteViewer;
use tokio::sync::{Mutex, RwLock};

use crate::config::AppConfig;
use crate::session::BuildSession;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub viewer: RwLock<SiteViewer>,
    pub builds: Mutex<BuildSession>,
    pub ci: Arc<dyn CiApi>,
    pub links: ArtifactLinks,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, ci: Arc<dyn CiApi>) -> Self {
        Self {
            viewer: RwLock::new(SiteViewer::new()),
            builds: Mutex::new(BuildSession::default()),
            links: ArtifactLinks::new(config.artifact_link_base.clone()),
            ci,
            config,
        }
    }

    /// Stop whatever the build screen is doing.
    pub async fn teardown(&self) {
        self.builds.lock().await.reset();
    }
}
