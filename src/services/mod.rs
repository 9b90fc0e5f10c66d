//! Service layer for Inkline
//!
//! This module contains the remote store, the dirty-tracking machinery, and
//! the workspace controller the embedding shell drives.

pub mod credentials_service;
pub mod github_store;
pub mod modification_tracker;
pub mod navigation;
pub mod save_coordinator;
pub mod workspace_service;

pub use github_store::{FileStore, GitHubStore};
pub use modification_tracker::ModificationTracker;
pub use navigation::{NavigationDecision, NavigationTarget, PendingNavigation};
pub use workspace_service::{
    create_workspace_state, OpenOutcome, SaveReport, WorkspaceService, WorkspaceState,
};
