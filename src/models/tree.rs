//! File tree models
//!
//! The remote returns the branch tree as a flat recursive listing; the
//! hierarchy is rebuilt locally on every repo/branch change or refresh.
//! Between refreshes the tree is only patched optimistically after a
//! rename/delete/create, and the next full listing reconciles it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Node type in the file tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
}

/// A file or directory in the repository tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub kind: NodeKind,
    pub name: String,
    /// Slash-delimited path, unique within the tree
    pub path: String,
    /// Blob SHA; present for files only
    pub sha: Option<String>,
    pub children: Vec<FileNode>,
}

impl FileNode {
    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// One entry of the flat recursive listing
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub path: String,
    pub kind: NodeKind,
    pub sha: Option<String>,
}

fn leaf_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Build the hierarchy from a flat recursive listing
///
/// Entries whose parent is missing or is not a directory are surfaced at the
/// root with a warning; an inconsistent listing must degrade, not abort.
pub fn build_file_tree(entries: Vec<TreeEntry>) -> Vec<FileNode> {
    let mut nodes: HashMap<String, FileNode> = HashMap::with_capacity(entries.len());
    let mut paths: Vec<String> = Vec::with_capacity(entries.len());

    for entry in entries {
        paths.push(entry.path.clone());
        nodes.insert(
            entry.path.clone(),
            FileNode {
                kind: entry.kind,
                name: leaf_name(&entry.path),
                path: entry.path,
                sha: entry.sha,
                children: Vec::new(),
            },
        );
    }

    // Deepest first, so a node's own children are attached before the node
    // itself moves into its parent.
    paths.sort_by_key(|p| std::cmp::Reverse(p.matches('/').count()));

    for path in &paths {
        let Some(parent) = parent_path(path) else {
            continue;
        };
        let parent_is_dir = nodes
            .get(parent)
            .map(|n| n.is_directory())
            .unwrap_or(false);
        if parent_is_dir {
            if let Some(child) = nodes.remove(path) {
                if let Some(parent_node) = nodes.get_mut(parent) {
                    parent_node.children.push(child);
                }
            }
        } else {
            tracing::warn!(
                path = %path,
                parent = %parent,
                "tree entry has no directory parent; surfacing at root"
            );
        }
    }

    let mut roots: Vec<FileNode> = nodes.into_values().collect();
    sort_nodes(&mut roots);
    roots
}

/// Directories before files, then lexicographic by name, recursively
pub fn sort_nodes(nodes: &mut [FileNode]) {
    nodes.sort_by(|a, b| {
        b.is_directory()
            .cmp(&a.is_directory())
            .then_with(|| a.name.cmp(&b.name))
    });
    for node in nodes {
        sort_nodes(&mut node.children);
    }
}

/// Find a node by path
pub fn find_node<'a>(nodes: &'a [FileNode], path: &str) -> Option<&'a FileNode> {
    for node in nodes {
        if node.path == path {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, path) {
            return Some(found);
        }
    }
    None
}

/// Optimistic rename: move a node to `new_path` in place
///
/// Returns true if the node was found. The next full refresh reconciles any
/// drift with the remote.
pub fn rename_node(nodes: &mut Vec<FileNode>, old_path: &str, new_path: &str) -> bool {
    if let Some(index) = nodes.iter().position(|n| n.path == old_path) {
        nodes[index].path = new_path.to_string();
        nodes[index].name = leaf_name(new_path);
        sort_nodes(nodes);
        return true;
    }
    nodes
        .iter_mut()
        .any(|n| rename_node(&mut n.children, old_path, new_path))
}

/// Optimistic delete: remove a node in place
pub fn remove_node(nodes: &mut Vec<FileNode>, path: &str) -> bool {
    let before = nodes.len();
    nodes.retain(|n| n.path != path);
    if nodes.len() != before {
        return true;
    }
    nodes.iter_mut().any(|n| remove_node(&mut n.children, path))
}

/// Optimistic create: insert a file node under its parent directory
///
/// Falls back to the root when the parent directory is not in the tree yet.
pub fn insert_file_node(nodes: &mut Vec<FileNode>, path: &str, sha: Option<String>) {
    let node = FileNode {
        kind: NodeKind::File,
        name: leaf_name(path),
        path: path.to_string(),
        sha,
        children: Vec::new(),
    };
    if let Some(parent) = parent_path(path) {
        if let Some(dir) = find_dir_mut(nodes, parent) {
            dir.children.push(node);
            sort_nodes(&mut dir.children);
            return;
        }
    }
    nodes.push(node);
    sort_nodes(nodes);
}

fn find_dir_mut<'a>(nodes: &'a mut [FileNode], path: &str) -> Option<&'a mut FileNode> {
    for node in nodes {
        if node.path == path {
            return node.is_directory().then_some(node);
        }
        if path.starts_with(&format!("{}/", node.path)) {
            return find_dir_mut(&mut node.children, path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, kind: NodeKind) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind,
            sha: (kind == NodeKind::File).then(|| format!("sha-{}", path)),
        }
    }

    #[test]
    fn builds_nested_hierarchy() {
        let tree = build_file_tree(vec![
            entry("x", NodeKind::Directory),
            entry("x/y", NodeKind::File),
        ]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "x");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].path, "x/y");
    }

    #[test]
    fn deep_nesting_attaches_bottom_up() {
        let tree = build_file_tree(vec![
            entry("a", NodeKind::Directory),
            entry("a/b", NodeKind::Directory),
            entry("a/b/c.excalidraw", NodeKind::File),
            entry("a/d.excalidraw", NodeKind::File),
        ]);
        assert_eq!(tree.len(), 1);
        let a = &tree[0];
        assert_eq!(a.children.len(), 2);
        // directory before file
        assert_eq!(a.children[0].path, "a/b");
        assert_eq!(a.children[1].path, "a/d.excalidraw");
        assert_eq!(a.children[0].children[0].path, "a/b/c.excalidraw");
    }

    #[test]
    fn orphan_surfaces_at_root() {
        // parent never listed
        let tree = build_file_tree(vec![
            entry("top.excalidraw", NodeKind::File),
            entry("ghost/stray.excalidraw", NodeKind::File),
        ]);
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().any(|n| n.path == "ghost/stray.excalidraw"));
    }

    #[test]
    fn file_parent_does_not_adopt_children() {
        let tree = build_file_tree(vec![
            entry("weird", NodeKind::File),
            entry("weird/child", NodeKind::File),
        ]);
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn sorts_directories_first_then_names() {
        let tree = build_file_tree(vec![
            entry("zeta.excalidraw", NodeKind::File),
            entry("alpha.excalidraw", NodeKind::File),
            entry("docs", NodeKind::Directory),
        ]);
        let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["docs", "alpha.excalidraw", "zeta.excalidraw"]);
    }

    #[test]
    fn rename_and_remove_patch_in_place() {
        let mut tree = build_file_tree(vec![
            entry("a", NodeKind::Directory),
            entry("a/b.excalidraw", NodeKind::File),
            entry("a/c.excalidraw", NodeKind::File),
        ]);
        assert!(rename_node(&mut tree, "a/b.excalidraw", "a/renamed.excalidraw"));
        assert!(find_node(&tree, "a/renamed.excalidraw").is_some());
        assert!(find_node(&tree, "a/b.excalidraw").is_none());

        assert!(remove_node(&mut tree, "a/c.excalidraw"));
        assert!(find_node(&tree, "a/c.excalidraw").is_none());
    }

    #[test]
    fn insert_places_under_parent_directory() {
        let mut tree = build_file_tree(vec![entry("a", NodeKind::Directory)]);
        insert_file_node(&mut tree, "a/new.excalidraw", Some("s1".into()));
        assert_eq!(tree[0].children[0].path, "a/new.excalidraw");

        insert_file_node(&mut tree, "missing/other.excalidraw", None);
        assert!(find_node(&tree, "missing/other.excalidraw").is_some());
    }
}
