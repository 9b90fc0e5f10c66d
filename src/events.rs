//! Events emitted to the embedding shell
//!
//! The workspace pushes these over an unbounded channel; the shell forwards
//! them to whatever event bus its UI uses (tree badges, editor chrome, etc.).

use serde::Serialize;

/// Workspace lifecycle events
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum WorkspaceEvent {
    /// A path entered or left the modified set
    DirtyChanged { path: String, dirty: bool },
    /// A document finished loading into the editor
    DocumentOpened {
        path: String,
        commit: Option<String>,
    },
    /// The open document was closed without a replacement
    DocumentClosed { path: String },
    /// A save landed on the remote
    DocumentSaved { path: String, sha: String },
    /// The file tree changed (refresh, optimistic rename/delete, create)
    TreeUpdated,
}
