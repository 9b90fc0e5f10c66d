//! Workspace controller
//!
//! Owns all mutable state: the selected repository and branch, the file tree,
//! the open document, the dirty set, and any navigation held up behind a
//! save/discard/cancel prompt. The embedding shell calls these methods from
//! its gesture handlers and renders from the returned values and the event
//! channel.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;

use crate::error::{InklineError, Result};
use crate::events::WorkspaceEvent;
use crate::models::{
    ensure_diagram_extension, find_node, insert_file_node, parse_scene, remove_node, rename_node,
    CommitInfo, FileNode, OpenDocument, RepoRef, Scene, SceneSource,
};
use crate::services::github_store::FileStore;
use crate::services::modification_tracker::ModificationTracker;
use crate::services::navigation::{
    self, NavigationDecision, NavigationTarget, PendingNavigation,
};
use crate::services::save_coordinator;

/// Default number of history entries fetched per page
const HISTORY_PAGE: u32 = 30;

/// What happened to a navigation request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OpenOutcome {
    /// The target is now the open document
    Opened,
    /// The exact (path, commit) was already open
    AlreadyOpen,
    /// Not a diagram; the tree selection moved, the editor did not
    SelectedOnly,
    /// Dropped because a load was in flight
    Ignored,
    /// The open document has unsaved edits; a prompt must be resolved first
    PromptRequired,
    /// The result arrived after the workspace moved on and was discarded
    Superseded,
}

/// Result of a successful save
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub path: String,
    pub sha: String,
}

struct WorkspaceInner {
    repo: Option<RepoRef>,
    tree: Vec<FileNode>,
    selected_path: Option<String>,
    document: Option<OpenDocument>,
    pending: Option<PendingNavigation>,
    /// Gate: navigation is ignored, not queued, while a load is in flight
    loading: bool,
    /// Bumped on repo/branch selection; stale refreshes check it
    epoch: u64,
    /// Bumped per accepted load; stale completions check it
    load_seq: u64,
}

/// The application controller the shell drives
pub struct WorkspaceService {
    store: Arc<dyn FileStore>,
    canvas: Arc<dyn SceneSource>,
    tracker: ModificationTracker,
    inner: RwLock<WorkspaceInner>,
    events: UnboundedSender<WorkspaceEvent>,
}

/// Shared handle for the shell's command handlers
pub type WorkspaceState = Arc<WorkspaceService>;

/// Create the workspace state and its event stream
pub fn create_workspace_state(
    store: Arc<dyn FileStore>,
    canvas: Arc<dyn SceneSource>,
) -> (WorkspaceState, UnboundedReceiver<WorkspaceEvent>) {
    let (service, events) = WorkspaceService::new(store, canvas);
    (Arc::new(service), events)
}

impl WorkspaceService {
    pub fn new(
        store: Arc<dyn FileStore>,
        canvas: Arc<dyn SceneSource>,
    ) -> (Self, UnboundedReceiver<WorkspaceEvent>) {
        let (tx, rx) = unbounded_channel();
        let service = Self {
            store,
            canvas,
            tracker: ModificationTracker::new(tx.clone()),
            inner: RwLock::new(WorkspaceInner {
                repo: None,
                tree: Vec::new(),
                selected_path: None,
                document: None,
                pending: None,
                loading: false,
                epoch: 0,
                load_seq: 0,
            }),
            events: tx,
        };
        (service, rx)
    }

    fn emit(&self, event: WorkspaceEvent) {
        let _ = self.events.send(event);
    }

    /// Select a repository and branch, clearing all downstream state
    pub async fn select_repository(&self, repo: RepoRef) -> Result<()> {
        tracing::info!(repo = %repo.full_name, branch = %repo.branch, "selecting repository");

        let (old_path, epoch) = {
            let mut guard = self.inner.write().await;
            let old_path = guard.document.as_ref().map(|d| d.path.clone());
            guard.repo = Some(repo.clone());
            guard.tree.clear();
            guard.selected_path = None;
            guard.document = None;
            guard.pending = None;
            guard.loading = false;
            guard.epoch += 1;
            guard.load_seq += 1;
            (old_path, guard.epoch)
        };
        if let Some(path) = old_path {
            self.tracker.clear(&path);
        }

        let tree = self.store.list_tree(&repo).await?;
        let mut guard = self.inner.write().await;
        if guard.epoch != epoch {
            return Ok(());
        }
        guard.tree = tree;
        drop(guard);
        self.emit(WorkspaceEvent::TreeUpdated);
        Ok(())
    }

    /// Re-fetch the full tree from the remote
    pub async fn refresh_tree(&self) -> Result<()> {
        let (repo, epoch) = {
            let guard = self.inner.read().await;
            (self.require_repo(&guard.repo)?, guard.epoch)
        };

        let tree = self.store.list_tree(&repo).await?;
        let mut guard = self.inner.write().await;
        if guard.epoch != epoch {
            return Ok(());
        }
        guard.tree = tree;
        drop(guard);
        self.emit(WorkspaceEvent::TreeUpdated);
        Ok(())
    }

    pub async fn file_tree(&self) -> Vec<FileNode> {
        self.inner.read().await.tree.clone()
    }

    pub async fn selected_path(&self) -> Option<String> {
        self.inner.read().await.selected_path.clone()
    }

    pub async fn open_document(&self) -> Option<OpenDocument> {
        self.inner.read().await.document.clone()
    }

    pub async fn pending_navigation(&self) -> Option<NavigationTarget> {
        self.inner.read().await.pending.as_ref().map(|p| p.target.clone())
    }

    pub fn is_dirty(&self, path: &str) -> bool {
        self.tracker.is_dirty(path)
    }

    pub fn dirty_paths(&self) -> Vec<String> {
        self.tracker.dirty_paths()
    }

    /// Open a file at the branch tip
    pub async fn open_file(&self, path: &str) -> Result<OpenOutcome> {
        self.open_target(NavigationTarget::latest(path)).await
    }

    /// Open a historical revision of a file, read-only against the tip
    pub async fn open_version(&self, path: &str, commit_sha: &str) -> Result<OpenOutcome> {
        self.open_target(NavigationTarget::at_commit(path, commit_sha))
            .await
    }

    /// Commits that touched a path, newest first
    pub async fn list_versions(&self, path: &str) -> Result<Vec<CommitInfo>> {
        let repo = {
            let guard = self.inner.read().await;
            self.require_repo(&guard.repo)?
        };
        self.store.list_commits(&repo, path, HISTORY_PAGE).await
    }

    /// Gate and (when allowed) load a navigation target
    pub async fn open_target(&self, target: NavigationTarget) -> Result<OpenOutcome> {
        let (repo, seq) = {
            let mut guard = self.inner.write().await;
            let repo = self.require_repo(&guard.repo)?;

            let current = guard
                .document
                .as_ref()
                .map(|d| (d.path.clone(), d.commit.clone()));
            let dirty = current
                .as_ref()
                .map(|(p, _)| self.tracker.is_dirty(p))
                .unwrap_or(false);
            let decision = navigation::decide(
                current.as_ref().map(|(p, c)| (p.as_str(), c.as_deref())),
                guard.loading,
                dirty,
                &target,
            );

            match decision {
                NavigationDecision::Ignore => {
                    tracing::debug!(path = %target.path, "navigation ignored: load in flight");
                    return Ok(OpenOutcome::Ignored);
                }
                NavigationDecision::Noop => return Ok(OpenOutcome::AlreadyOpen),
                NavigationDecision::SelectOnly => {
                    guard.selected_path = Some(target.path.clone());
                    return Ok(OpenOutcome::SelectedOnly);
                }
                NavigationDecision::Prompt => {
                    tracing::debug!(path = %target.path, "navigation held behind save prompt");
                    guard.pending = Some(PendingNavigation { target });
                    return Ok(OpenOutcome::PromptRequired);
                }
                NavigationDecision::Load => {
                    guard.loading = true;
                    guard.load_seq += 1;
                    guard.selected_path = Some(target.path.clone());
                    (repo, guard.load_seq)
                }
            }
        };

        self.load_document(repo, target, seq).await
    }

    async fn load_document(
        &self,
        repo: RepoRef,
        target: NavigationTarget,
        seq: u64,
    ) -> Result<OpenOutcome> {
        let raw = match &target.prefetched {
            Some(content) => Ok(content.clone()),
            None => {
                self.store
                    .read_file(&repo, &target.path, target.commit.as_deref())
                    .await
            }
        };

        let mut guard = self.inner.write().await;
        if guard.load_seq != seq {
            // The workspace moved on (repo/branch switch) while this fetch
            // was in flight; its result must not land anywhere.
            tracing::debug!(path = %target.path, "discarding superseded load");
            return Ok(OpenOutcome::Superseded);
        }
        guard.loading = false;

        let scene = match raw.and_then(|content| parse_scene(&content)) {
            Ok(scene) => scene,
            Err(e) => {
                // Selection stays on the failed path so the user can see
                // which file went wrong.
                guard.document = None;
                tracing::warn!(path = %target.path, error = %e, "load failed");
                return Err(e);
            }
        };

        guard.document = Some(OpenDocument {
            path: target.path.clone(),
            commit: target.commit.clone(),
            scene: scene.clone(),
        });
        drop(guard);

        self.tracker.set_baseline(&target.path, &scene);
        self.tracker.clear(&target.path);
        self.emit(WorkspaceEvent::DocumentOpened {
            path: target.path,
            commit: target.commit,
        });
        Ok(OpenOutcome::Opened)
    }

    /// Feed a live editor change into dirty tracking
    pub async fn scene_changed(&self, elements: Vec<Value>) {
        let path = {
            let guard = self.inner.read().await;
            guard.document.as_ref().map(|d| d.path.clone())
        };
        if let Some(path) = path {
            self.tracker.record_change(&path, elements);
        }
    }

    /// Save the open document to the branch tip
    ///
    /// Pulls the live scene from the canvas, writes it guarded by the SHA
    /// fetched within this call, then resets the baseline, refreshes the
    /// tree, and resolves any navigation the save prompt was holding. On
    /// failure nothing is touched, so the user can retry.
    pub async fn save_open_document(&self, message: &str) -> Result<SaveReport> {
        let (repo, path) = {
            let guard = self.inner.read().await;
            let repo = self.require_repo(&guard.repo)?;
            let path = guard
                .document
                .as_ref()
                .map(|d| d.path.clone())
                .ok_or_else(|| {
                    InklineError::Validation("no document is open".to_string())
                })?;
            (repo, path)
        };

        let scene = self.canvas.current_scene().ok_or_else(|| {
            InklineError::Validation("editor content is unavailable".to_string())
        })?;

        let outcome =
            save_coordinator::commit_scene(self.store.as_ref(), &repo, &path, &scene, message)
                .await?;

        self.tracker.set_baseline(&path, &scene);
        self.tracker.clear(&path);
        self.emit(WorkspaceEvent::DocumentSaved {
            path: path.clone(),
            sha: outcome.new_sha.clone(),
        });

        // The tree must pick up the new blob SHA; a refresh failure does not
        // undo a save that already landed.
        if let Err(e) = self.refresh_tree().await {
            tracing::warn!(error = %e, "tree refresh after save failed");
        }

        let pending = {
            let mut guard = self.inner.write().await;
            guard.pending.take()
        };
        if let Some(pending) = pending {
            if let Err(e) = self.open_target(pending.target).await {
                tracing::warn!(error = %e, "failed to open pending target after save");
            }
        }

        Ok(SaveReport {
            path,
            sha: outcome.new_sha,
        })
    }

    /// Prompt resolution: abandon the edits and continue to the held target
    ///
    /// No content rollback happens; the in-memory editor state is simply
    /// replaced by the incoming document.
    pub async fn resolve_discard(&self) -> Result<OpenOutcome> {
        let (current, pending) = {
            let mut guard = self.inner.write().await;
            (
                guard.document.as_ref().map(|d| d.path.clone()),
                guard.pending.take(),
            )
        };
        let pending = pending.ok_or_else(|| {
            InklineError::Validation("no navigation is awaiting resolution".to_string())
        })?;

        if let Some(path) = current {
            tracing::debug!(path = %path, "discarding unsaved edits");
            self.tracker.clear(&path);
        }
        self.open_target(pending.target).await
    }

    /// Prompt resolution: keep everything as-is
    ///
    /// Also the path taken when the save dialog is dismissed: the held
    /// target is dropped and the user must re-initiate navigation.
    pub async fn resolve_cancel(&self) {
        let mut guard = self.inner.write().await;
        if guard.pending.take().is_some() {
            tracing::debug!("pending navigation cancelled");
        }
    }

    /// Create a new diagram file seeded with an empty scene, then open it
    pub async fn create_file(&self, raw_path: &str) -> Result<OpenOutcome> {
        let repo = {
            let guard = self.inner.read().await;
            self.require_repo(&guard.repo)?
        };

        let trimmed = raw_path.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('/')
            || trimmed.ends_with('/')
            || trimmed.contains("//")
        {
            return Err(InklineError::Validation(format!(
                "invalid file path: {}",
                raw_path
            )));
        }
        let path = ensure_diagram_extension(trimmed);
        let file_name = path.rsplit('/').next().unwrap_or(&path);

        let content = Scene::empty().to_document_json()?;
        let message = format!("feat: create Excalidraw file {}", file_name);
        let sha = self
            .store
            .write_file(&repo, &path, &content, &message, None)
            .await?;
        tracing::info!(path = %path, sha = %sha, "file created");

        {
            let mut guard = self.inner.write().await;
            insert_file_node(&mut guard.tree, &path, Some(sha));
        }
        self.emit(WorkspaceEvent::TreeUpdated);

        // Open what we just wrote; no need for a read round-trip
        self.open_target(NavigationTarget {
            path,
            commit: None,
            prefetched: Some(content),
        })
        .await
    }

    /// Rename a single file in place; directories need a real git client
    pub async fn rename_file(&self, old_path: &str, new_name: &str) -> Result<String> {
        let repo = {
            let guard = self.inner.read().await;
            let node = find_node(&guard.tree, old_path)
                .ok_or_else(|| InklineError::FileNotFound(old_path.to_string()))?;
            if node.is_directory() {
                return Err(InklineError::DirectoryUnsupported(old_path.to_string()));
            }
            self.require_repo(&guard.repo)?
        };

        let new_name = new_name.trim();
        if new_name.is_empty() || new_name.contains('/') {
            return Err(InklineError::Validation(format!(
                "invalid file name: {}",
                new_name
            )));
        }
        let old_name = old_path.rsplit('/').next().unwrap_or(old_path);
        if new_name == old_name {
            return Ok(old_path.to_string());
        }

        let message = format!("feat: rename {} to {}", old_name, new_name);
        let new_path = self
            .store
            .rename_path(&repo, old_path, new_name, &message)
            .await?;

        {
            let mut guard = self.inner.write().await;
            rename_node(&mut guard.tree, old_path, &new_path);
            if let Some(doc) = &mut guard.document {
                if doc.path == old_path {
                    doc.path = new_path.clone();
                }
            }
            if guard.selected_path.as_deref() == Some(old_path) {
                guard.selected_path = Some(new_path.clone());
            }
        }
        self.tracker.rekey(old_path, &new_path);
        self.emit(WorkspaceEvent::TreeUpdated);
        Ok(new_path)
    }

    /// Delete a single file; directories need a real git client
    pub async fn delete_file(&self, path: &str) -> Result<()> {
        let repo = {
            let guard = self.inner.read().await;
            let node = find_node(&guard.tree, path)
                .ok_or_else(|| InklineError::FileNotFound(path.to_string()))?;
            if node.is_directory() {
                return Err(InklineError::DirectoryUnsupported(path.to_string()));
            }
            self.require_repo(&guard.repo)?
        };

        let sha = self
            .store
            .current_sha(&repo, path)
            .await?
            .ok_or_else(|| InklineError::FileNotFound(path.to_string()))?;
        let file_name = path.rsplit('/').next().unwrap_or(path);
        self.store
            .delete_file(&repo, path, &sha, &format!("chore: delete file {}", file_name))
            .await?;
        tracing::info!(path, "file deleted");

        let closed = {
            let mut guard = self.inner.write().await;
            remove_node(&mut guard.tree, path);
            if guard.selected_path.as_deref() == Some(path) {
                guard.selected_path = None;
            }
            if guard.document.as_ref().map(|d| d.path.as_str()) == Some(path) {
                guard.document = None;
                true
            } else {
                false
            }
        };
        self.tracker.clear(path);
        self.emit(WorkspaceEvent::TreeUpdated);
        if closed {
            self.emit(WorkspaceEvent::DocumentClosed {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn require_repo(&self, repo: &Option<RepoRef>) -> Result<RepoRef> {
        repo.clone()
            .ok_or_else(|| InklineError::Validation("no repository selected".to_string()))
    }
}
