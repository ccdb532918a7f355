use std::time::Duration;

use anyhow::{bail, Context, Result};
use cibuild::{PollPolicy, DEFAULT_API_URL, DEFAULT_BRANCH, DEFAULT_LINK_BASE, DEFAULT_TIMEOUT, DEFAULT_WORKFLOW};

#[derive(Clone)]
pub struct AppConfig {
    pub github_token: String,
    pub github_api_url: String,
    /// Upper bound for a single GitHub request.
    pub github_timeout: Duration,
    pub build_workflow: String,
    pub build_branch: String,
    pub poll: PollPolicy,
    pub artifact_link_base: String,
    pub bind_addr: String,
}

// token stays out of logs
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("github_api_url", &self.github_api_url)
            .field("github_timeout", &self.github_timeout)
            .field("build_workflow", &self.build_workflow)
            .field("build_branch", &self.build_branch)
            .field("poll", &self.poll)
            .field("artifact_link_base", &self.artifact_link_base)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let github_token = lookup("GITHUB_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .context("Missing required env var: GITHUB_TOKEN")?;
        let github_api_url = or("GITHUB_API_URL", DEFAULT_API_URL);
        let build_workflow = or("BUILD_WORKFLOW", DEFAULT_WORKFLOW);
        let build_branch = or("BUILD_BRANCH", DEFAULT_BRANCH);
        let artifact_link_base = or("ARTIFACT_LINK_BASE", DEFAULT_LINK_BASE);
        let bind_addr = or("SHELL_BIND_ADDR", "0.0.0.0:8080");

        let interval_secs: u64 = parse_num(&lookup, "POLL_INTERVAL_SECS", 10)?;
        let max_attempts: u32 = parse_num(&lookup, "POLL_MAX_ATTEMPTS", 360)?;
        let timeout_secs: u64 = parse_num(&lookup, "GITHUB_TIMEOUT_SECS", DEFAULT_TIMEOUT.as_secs())?;

        if interval_secs == 0 {
            bail!("POLL_INTERVAL_SECS must be greater than 0");
        }
        if timeout_secs == 0 {
            bail!("GITHUB_TIMEOUT_SECS must be greater than 0");
        }
        if !github_api_url.starts_with("http://") && !github_api_url.starts_with("https://") {
            bail!("GITHUB_API_URL must start with http:// or https://");
        }
        if !artifact_link_base.starts_with("http://") && !artifact_link_base.starts_with("https://") {
            bail!("ARTIFACT_LINK_BASE must start with http:// or https://");
        }

        Ok(Self {
            github_token,
            github_api_url,
            github_timeout: Duration::from_secs(timeout_secs),
            build_workflow,
            build_branch,
            poll: PollPolicy {
                interval: Duration::from_secs(interval_secs),
                max_attempts: (max_attempts > 0).then_some(max_attempts),
            },
            artifact_link_base,
            bind_addr,
        })
    }
}

fn parse_num<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid number in env var {key}: {raw:?}")),
        None => Ok(default),
    }
}
