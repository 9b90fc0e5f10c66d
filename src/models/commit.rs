//! Commit models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in a file's commit history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub sha: String,
    pub short_id: String,
    pub message: String,
    pub author: CommitSignature,
    pub committer: CommitSignature,
}

/// Author/committer signature
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSignature {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

impl CommitInfo {
    pub fn new(
        sha: impl Into<String>,
        message: impl Into<String>,
        author: CommitSignature,
        committer: CommitSignature,
    ) -> Self {
        let sha = sha.into();
        let short_id = sha.chars().take(7).collect();
        Self {
            sha,
            short_id,
            message: message.into(),
            author,
            committer,
        }
    }
}
