//! GitHub-backed file store
//!
//! Stateless client over the Contents and Git Data APIs. Writes are guarded
//! by the caller-supplied blob SHA; renames are assembled from raw plumbing
//! calls because the Contents API has no atomic rename.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{InklineError, Result};
use crate::models::{
    build_file_tree, BranchInfo, CommitInfo, CommitSignature, FileNode, NodeKind, RepoRef,
    RepositoryInfo, TreeEntry,
};

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "Inkline-Diagram-Client";
const API_VERSION: &str = "2022-11-28";

/// Remote file storage as the workspace sees it
///
/// `GitHubStore` is the production implementation; tests substitute an
/// in-memory one.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Full recursive listing of the branch, as a hierarchy
    async fn list_tree(&self, repo: &RepoRef) -> Result<Vec<FileNode>>;

    /// Decoded content at the branch tip, or at `commit` when pinned
    async fn read_file(&self, repo: &RepoRef, path: &str, commit: Option<&str>) -> Result<String>;

    /// Current blob SHA; `None` means the file does not exist yet
    async fn current_sha(&self, repo: &RepoRef, path: &str) -> Result<Option<String>>;

    /// Create (`expected_sha` = None) or update the file; returns the new SHA
    ///
    /// The remote rejects the write when the live SHA no longer matches
    /// `expected_sha`; that surfaces as [`InklineError::Conflict`].
    async fn write_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &str,
        message: &str,
        expected_sha: Option<&str>,
    ) -> Result<String>;

    /// Delete a file; the caller must have fetched `sha` first
    async fn delete_file(&self, repo: &RepoRef, path: &str, sha: &str, message: &str)
        -> Result<()>;

    /// Rename a single file in one commit; returns the new path
    async fn rename_path(
        &self,
        repo: &RepoRef,
        old_path: &str,
        new_name: &str,
        message: &str,
    ) -> Result<String>;

    /// Commits that touched `path`, most recent first
    async fn list_commits(&self, repo: &RepoRef, path: &str, per_page: u32)
        -> Result<Vec<CommitInfo>>;
}

/// Client for the GitHub REST API
pub struct GitHubStore {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl GitHubStore {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, GITHUB_API_BASE)
    }

    /// Point the store at a different API host (tests, GitHub Enterprise)
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            token: token.into(),
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn contents_url(&self, repo: &RepoRef, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            repo.full_name,
            encode_path(path)
        )
    }

    /// List the authenticated user's repositories, most recently updated first
    pub async fn list_repositories(&self) -> Result<Vec<RepositoryInfo>> {
        #[derive(Deserialize)]
        struct ApiRepo {
            id: u64,
            name: String,
            full_name: String,
            private: bool,
            default_branch: String,
        }

        let response = self
            .request(
                reqwest::Method::GET,
                format!("{}/user/repos", self.api_base),
            )
            .query(&[("sort", "updated"), ("per_page", "100")])
            .send()
            .await?;
        let response = check_status(response).await?;

        let repos: Vec<ApiRepo> = response.json().await?;
        Ok(repos
            .into_iter()
            .map(|r| RepositoryInfo {
                id: r.id,
                name: r.name,
                full_name: r.full_name,
                private: r.private,
                default_branch: r.default_branch,
            })
            .collect())
    }

    /// List a repository's branches
    pub async fn list_branches(&self, full_name: &str) -> Result<Vec<BranchInfo>> {
        #[derive(Deserialize)]
        struct ApiBranch {
            name: String,
            commit: ApiBranchCommit,
            protected: bool,
        }

        #[derive(Deserialize)]
        struct ApiBranchCommit {
            sha: String,
        }

        let response = self
            .request(
                reqwest::Method::GET,
                format!("{}/repos/{}/branches", self.api_base, full_name),
            )
            .send()
            .await?;
        let response = check_status(response).await?;

        let branches: Vec<ApiBranch> = response.json().await?;
        Ok(branches
            .into_iter()
            .map(|b| BranchInfo {
                name: b.name,
                commit_sha: b.commit.sha,
                protected: b.protected,
            })
            .collect())
    }

    async fn get_ref_sha(&self, repo: &RepoRef) -> Result<String> {
        #[derive(Deserialize)]
        struct ApiRef {
            object: ApiRefObject,
        }

        #[derive(Deserialize)]
        struct ApiRefObject {
            sha: String,
        }

        let response = self
            .request(
                reqwest::Method::GET,
                format!(
                    "{}/repos/{}/git/refs/heads/{}",
                    self.api_base, repo.full_name, repo.branch
                ),
            )
            .send()
            .await?;
        let response = check_status(response).await?;
        let r: ApiRef = response.json().await?;
        Ok(r.object.sha)
    }

    async fn get_commit_tree_sha(&self, repo: &RepoRef, commit_sha: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct ApiCommit {
            tree: ApiCommitTree,
        }

        #[derive(Deserialize)]
        struct ApiCommitTree {
            sha: String,
        }

        let response = self
            .request(
                reqwest::Method::GET,
                format!(
                    "{}/repos/{}/git/commits/{}",
                    self.api_base, repo.full_name, commit_sha
                ),
            )
            .send()
            .await?;
        let response = check_status(response).await?;
        let c: ApiCommit = response.json().await?;
        Ok(c.tree.sha)
    }

    /// Locate a blob's mode and SHA inside a tree
    async fn find_blob(
        &self,
        repo: &RepoRef,
        tree_sha: &str,
        path: &str,
    ) -> Result<(String, String)> {
        #[derive(Deserialize)]
        struct ApiTree {
            tree: Vec<ApiTreeItem>,
        }

        #[derive(Deserialize)]
        struct ApiTreeItem {
            path: String,
            mode: String,
            #[serde(rename = "type")]
            kind: String,
            sha: Option<String>,
        }

        let response = self
            .request(
                reqwest::Method::GET,
                format!(
                    "{}/repos/{}/git/trees/{}",
                    self.api_base, repo.full_name, tree_sha
                ),
            )
            .query(&[("recursive", "1")])
            .send()
            .await?;
        let response = check_status(response).await?;
        let tree: ApiTree = response.json().await?;

        tree.tree
            .into_iter()
            .find(|item| item.kind == "blob" && item.path == path)
            .and_then(|item| item.sha.map(|sha| (item.mode, sha)))
            .ok_or_else(|| InklineError::FileNotFound(path.to_string()))
    }

    async fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree: &str,
        entries: &[TreeWriteEntry],
    ) -> Result<String> {
        #[derive(Serialize)]
        struct CreateTreeBody<'a> {
            base_tree: &'a str,
            tree: &'a [TreeWriteEntry],
        }

        #[derive(Deserialize)]
        struct ApiCreated {
            sha: String,
        }

        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/repos/{}/git/trees", self.api_base, repo.full_name),
            )
            .json(&CreateTreeBody { base_tree, tree: entries })
            .send()
            .await?;
        let response = check_status(response).await?;
        let created: ApiCreated = response.json().await?;
        Ok(created.sha)
    }

    async fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct CreateCommitBody<'a> {
            message: &'a str,
            tree: &'a str,
            parents: Vec<&'a str>,
        }

        #[derive(Deserialize)]
        struct ApiCreated {
            sha: String,
        }

        let response = self
            .request(
                reqwest::Method::POST,
                format!("{}/repos/{}/git/commits", self.api_base, repo.full_name),
            )
            .json(&CreateCommitBody {
                message,
                tree: tree_sha,
                parents: vec![parent_sha],
            })
            .send()
            .await?;
        let response = check_status(response).await?;
        let created: ApiCreated = response.json().await?;
        Ok(created.sha)
    }

    async fn update_ref(&self, repo: &RepoRef, commit_sha: &str) -> Result<()> {
        #[derive(Serialize)]
        struct UpdateRefBody<'a> {
            sha: &'a str,
        }

        let response = self
            .request(
                reqwest::Method::PATCH,
                format!(
                    "{}/repos/{}/git/refs/heads/{}",
                    self.api_base, repo.full_name, repo.branch
                ),
            )
            .json(&UpdateRefBody { sha: commit_sha })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl FileStore for GitHubStore {
    async fn list_tree(&self, repo: &RepoRef) -> Result<Vec<FileNode>> {
        #[derive(Deserialize)]
        struct ApiTree {
            tree: Option<Vec<ApiTreeItem>>,
        }

        #[derive(Deserialize)]
        struct ApiTreeItem {
            path: String,
            #[serde(rename = "type")]
            kind: String,
            sha: Option<String>,
        }

        tracing::debug!(repo = %repo.full_name, branch = %repo.branch, "listing tree");

        let response = self
            .request(
                reqwest::Method::GET,
                format!(
                    "{}/repos/{}/git/trees/{}",
                    self.api_base, repo.full_name, repo.branch
                ),
            )
            .query(&[("recursive", "1")])
            .send()
            .await?;
        let response = check_status(response).await?;

        let listing: ApiTree = response.json().await?;
        let Some(items) = listing.tree else {
            tracing::warn!(repo = %repo.full_name, "listing returned no tree; treating as empty");
            return Ok(Vec::new());
        };

        let entries = items
            .into_iter()
            .map(|item| TreeEntry {
                path: item.path,
                kind: if item.kind == "tree" {
                    NodeKind::Directory
                } else {
                    NodeKind::File
                },
                sha: item.sha,
            })
            .collect();
        Ok(build_file_tree(entries))
    }

    async fn read_file(&self, repo: &RepoRef, path: &str, commit: Option<&str>) -> Result<String> {
        #[derive(Deserialize)]
        struct ApiContents {
            content: Option<String>,
            encoding: Option<String>,
        }

        let git_ref = commit.unwrap_or(&repo.branch);
        tracing::debug!(path, git_ref, "reading file");

        let response = self
            .request(reqwest::Method::GET, self.contents_url(repo, path))
            .query(&[("ref", git_ref)])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(InklineError::FileNotFound(path.to_string()));
        }
        let response = check_status(response).await?;

        let contents: ApiContents = response.json().await?;
        match contents.encoding.as_deref() {
            Some("base64") => {
                let packed: String = contents
                    .content
                    .unwrap_or_default()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                let bytes = BASE64.decode(packed).map_err(|e| {
                    InklineError::OperationFailed(format!("invalid base64 content: {}", e))
                })?;
                String::from_utf8(bytes).map_err(|e| {
                    InklineError::OperationFailed(format!("content is not UTF-8: {}", e))
                })
            }
            other => Err(InklineError::OperationFailed(format!(
                "unexpected content encoding: {}",
                other.unwrap_or("none")
            ))),
        }
    }

    async fn current_sha(&self, repo: &RepoRef, path: &str) -> Result<Option<String>> {
        #[derive(Deserialize)]
        struct ApiContents {
            sha: String,
        }

        let response = self
            .request(reqwest::Method::GET, self.contents_url(repo, path))
            .query(&[("ref", repo.branch.as_str())])
            .send()
            .await?;

        // 404 is the "does not exist yet" signal, not a failure
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;

        let contents: ApiContents = response.json().await?;
        Ok(Some(contents.sha))
    }

    async fn write_file(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &str,
        message: &str,
        expected_sha: Option<&str>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct WriteBody<'a> {
            message: &'a str,
            content: String,
            branch: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            sha: Option<&'a str>,
        }

        #[derive(Deserialize)]
        struct ApiWritten {
            content: ApiWrittenContent,
        }

        #[derive(Deserialize)]
        struct ApiWrittenContent {
            sha: String,
        }

        tracing::debug!(path, guarded = expected_sha.is_some(), "writing file");

        let response = self
            .request(reqwest::Method::PUT, self.contents_url(repo, path))
            .json(&WriteBody {
                message,
                content: BASE64.encode(content.as_bytes()),
                branch: &repo.branch,
                sha: expected_sha,
            })
            .send()
            .await?;

        // The Contents API reports a stale guard SHA as 409
        if response.status() == reqwest::StatusCode::CONFLICT {
            let message = error_message(response).await;
            tracing::warn!(path, message = %message, "write rejected: stale SHA");
            return Err(InklineError::Conflict {
                path: path.to_string(),
            });
        }
        let response = check_status(response).await?;

        let written: ApiWritten = response.json().await?;
        Ok(written.content.sha)
    }

    async fn delete_file(
        &self,
        repo: &RepoRef,
        path: &str,
        sha: &str,
        message: &str,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct DeleteBody<'a> {
            message: &'a str,
            sha: &'a str,
            branch: &'a str,
        }

        tracing::debug!(path, "deleting file");

        let response = self
            .request(reqwest::Method::DELETE, self.contents_url(repo, path))
            .json(&DeleteBody {
                message,
                sha,
                branch: &repo.branch,
            })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn rename_path(
        &self,
        repo: &RepoRef,
        old_path: &str,
        new_name: &str,
        message: &str,
    ) -> Result<String> {
        tracing::info!(old_path, new_name, "renaming via git plumbing");

        // If anything past this first step fails, the branch ref is untouched
        // and nothing reachable references the staged objects.
        let tip_sha = self.get_ref_sha(repo).await?;
        let base_tree = self.get_commit_tree_sha(repo, &tip_sha).await?;
        let (mode, blob_sha) = self.find_blob(repo, &base_tree, old_path).await?;

        let (new_path, patch) = build_rename_patch(old_path, new_name, &mode, &blob_sha);
        let new_tree = self.create_tree(repo, &base_tree, &patch).await?;
        let new_commit = self.create_commit(repo, message, &new_tree, &tip_sha).await?;
        self.update_ref(repo, &new_commit).await?;

        Ok(new_path)
    }

    async fn list_commits(
        &self,
        repo: &RepoRef,
        path: &str,
        per_page: u32,
    ) -> Result<Vec<CommitInfo>> {
        #[derive(Deserialize)]
        struct ApiCommitEntry {
            sha: String,
            commit: ApiCommitDetail,
        }

        #[derive(Deserialize)]
        struct ApiCommitDetail {
            message: String,
            author: ApiSignature,
            committer: ApiSignature,
        }

        #[derive(Deserialize)]
        struct ApiSignature {
            name: String,
            email: String,
            date: chrono::DateTime<chrono::Utc>,
        }

        let per_page = per_page.to_string();
        let response = self
            .request(
                reqwest::Method::GET,
                format!("{}/repos/{}/commits", self.api_base, repo.full_name),
            )
            .query(&[
                ("path", path),
                ("sha", repo.branch.as_str()),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;

        let commits: Vec<ApiCommitEntry> = response.json().await?;
        Ok(commits
            .into_iter()
            .map(|c| {
                CommitInfo::new(
                    c.sha,
                    c.commit.message,
                    CommitSignature {
                        name: c.commit.author.name,
                        email: c.commit.author.email,
                        date: c.commit.author.date,
                    },
                    CommitSignature {
                        name: c.commit.committer.name,
                        email: c.commit.committer.email,
                        date: c.commit.committer.date,
                    },
                )
            })
            .collect())
    }
}

/// One entry of a tree write; `sha: None` serializes as `null` and removes
/// the path from the base tree
#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct TreeWriteEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: Option<String>,
}

/// The two-entry patch a rename needs: drop the old path, add the new one
/// pointing at the same blob
pub(crate) fn build_rename_patch(
    old_path: &str,
    new_name: &str,
    mode: &str,
    blob_sha: &str,
) -> (String, Vec<TreeWriteEntry>) {
    let new_path = match old_path.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, new_name),
        None => new_name.to_string(),
    };
    let patch = vec![
        TreeWriteEntry {
            path: old_path.to_string(),
            mode: mode.to_string(),
            kind: "blob".to_string(),
            sha: None,
        },
        TreeWriteEntry {
            path: new_path.clone(),
            mode: mode.to_string(),
            kind: "blob".to_string(),
            sha: Some(blob_sha.to_string()),
        },
    ];
    (new_path, patch)
}

/// Percent-encode each path segment, keeping the separators
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = error_message(response).await;
    Err(InklineError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Pull the remote-provided message out of an error body
async fn error_message(response: reqwest::Response) -> String {
    #[derive(Deserialize, Default)]
    struct ApiErrorBody {
        message: Option<String>,
    }

    match response.json::<ApiErrorBody>().await {
        Ok(body) => body.message.unwrap_or_default(),
        Err(_) => String::new(),
    }
}
