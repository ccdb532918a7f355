use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{CiError, Result};

/// Owner/name pair of a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn repo_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"github\.com/([^/?#\s]+)/([^/?#\s]+)").expect("repo pattern is valid")
    })
}

/// Pull `{owner, name}` out of anything containing `github.com/<owner>/<repo>`.
///
/// The first two path segments after the host win. Suffixes like `.git`
/// and letter case are left alone.
pub fn parse_repo_url(input: &str) -> Result<RepoRef> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CiError::EmptyRepoUrl);
    }

    let caps = repo_pattern()
        .captures(input)
        .ok_or_else(|| CiError::InvalidRepoUrl(input.to_string()))?;

    Ok(RepoRef::new(&caps[1], &caps[2]))
}
