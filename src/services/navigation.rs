//! Navigation gating
//!
//! Every request to open a file or version funnels through [`decide`] before
//! anything is fetched. The outcome depends only on what is open, whether a
//! load is in flight, and whether the open document has unsaved edits.

use serde::Serialize;

use crate::models::is_diagram_path;

/// What the user asked to open
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTarget {
    pub path: String,
    /// Pinned historical revision; `None` means the branch tip
    pub commit: Option<String>,
    /// Content already in hand (version picker, freshly created file);
    /// skips the remote read
    #[serde(skip_serializing)]
    pub prefetched: Option<String>,
}

impl NavigationTarget {
    pub fn latest(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            commit: None,
            prefetched: None,
        }
    }

    pub fn at_commit(path: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            commit: Some(commit.into()),
            prefetched: None,
        }
    }
}

/// Held while a save/discard/cancel prompt awaits the user
///
/// Cleared on every resolution path: save, discard, cancel, and a dismissed
/// save dialog.
#[derive(Debug, Clone)]
pub struct PendingNavigation {
    pub target: NavigationTarget,
}

/// Outcome of gating a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Fetch and open the target
    Load,
    /// Not a diagram: select it in the tree, leave the editor alone
    SelectOnly,
    /// The exact (path, commit) is already open
    Noop,
    /// A load is in flight; drop the request, do not queue it
    Ignore,
    /// The open document has unsaved edits; ask before switching
    Prompt,
}

/// Gate a navigation request
///
/// `current` is the open document's (path, commit), if any.
pub fn decide(
    current: Option<(&str, Option<&str>)>,
    loading: bool,
    current_dirty: bool,
    target: &NavigationTarget,
) -> NavigationDecision {
    if loading {
        return NavigationDecision::Ignore;
    }

    if let Some((open_path, open_commit)) = current {
        if open_path == target.path && open_commit == target.commit.as_deref() {
            return NavigationDecision::Noop;
        }
    }

    if !is_diagram_path(&target.path) {
        return NavigationDecision::SelectOnly;
    }

    if current.is_some() && current_dirty {
        return NavigationDecision::Prompt;
    }

    NavigationDecision::Load
}
