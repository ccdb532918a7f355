use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CiError;

pub const DEFAULT_BRANCH: &str = "main";

/// Android package format the workflow should produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    #[default]
    Apk,
    Aab,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Apk => "apk",
            BuildType::Aab => "aab",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apk" => Ok(BuildType::Apk),
            "aab" => Ok(BuildType::Aab),
            other => Err(CiError::UnknownBuildType(other.to_string())),
        }
    }
}

/// One workflow dispatch. Sent once; a failed dispatch is never retried here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub build_type: BuildType,
}

impl BuildRequest {
    pub fn new(git_ref: impl Into<String>, build_type: BuildType) -> Self {
        Self {
            git_ref: git_ref.into(),
            build_type,
        }
    }

    /// Body of the `dispatches` call.
    pub fn dispatch_body(&self) -> serde_json::Value {
        serde_json::json!({
            "ref": self.git_ref,
            "inputs": { "buildType": self.build_type.as_str() }
        })
    }
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self::new(DEFAULT_BRANCH, BuildType::default())
    }
}
