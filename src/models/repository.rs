//! Repository models

use serde::{Deserialize, Serialize};

/// The repository and branch every remote operation targets
///
/// Immutable once selected; re-selection replaces the whole value and clears
/// all downstream workspace state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoRef {
    /// `owner/name`, as GitHub renders it
    pub full_name: String,
    pub branch: String,
}

impl RepoRef {
    pub fn new(full_name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            branch: branch.into(),
        }
    }
}

/// Repository entry for the repo picker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub default_branch: String,
}

/// Branch entry for the branch picker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchInfo {
    pub name: String,
    pub commit_sha: String,
    pub protected: bool,
}
