use crate::RepoRef;

pub const DEFAULT_LINK_BASE: &str = "https://nightly.link";

/// Builds public download links for run artifacts through an unzipping
/// redirect service. Links are not checked for expiry or reachability.
#[derive(Clone, Debug)]
pub struct ArtifactLinks {
    base: String,
}

impl ArtifactLinks {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn download_url(&self, repo: &RepoRef, artifact_id: u64) -> String {
        format!(
            "{}/{}/{}/actions/artifacts/{}.zip",
            self.base, repo.owner, repo.name, artifact_id
        )
    }
}

impl Default for ArtifactLinks {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_BASE)
    }
}
