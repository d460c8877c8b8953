//! File tree construction from flat repository paths.

use std::collections::BTreeMap;

use super::TreeEntry;
use crate::markdown::language_from_extension;
use crate::models::FileNode;

/// Path fragments excluded from the tree: vendored code, build output,
/// caches and OS clutter.
const SKIP_PATTERNS: [&str; 14] = [
    "node_modules/",
    ".git/",
    "dist/",
    "build/",
    ".next/",
    "coverage/",
    ".nyc_output/",
    "vendor/",
    "__pycache__/",
    ".venv/",
    "venv/",
    ".env",
    ".DS_Store",
    "Thumbs.db",
];

pub fn is_skipped(path: &str) -> bool {
    SKIP_PATTERNS.iter().any(|pattern| path.contains(pattern))
}

#[derive(Default)]
struct TrieNode {
    is_file: bool,
    children: BTreeMap<String, TrieNode>,
}

/// Arrange flat slash-delimited entries into a [`FileNode`] forest.
///
/// Intermediate directories are created as needed even when the listing does
/// not name them. Siblings come out ordered by name.
pub fn build_file_tree(entries: &[TreeEntry]) -> Vec<FileNode> {
    let mut root = TrieNode::default();

    for entry in entries.iter().filter(|e| !is_skipped(&e.path)) {
        let mut node = &mut root;
        let mut parts = entry.path.split('/').filter(|p| !p.is_empty()).peekable();
        while let Some(part) = parts.next() {
            node = node.children.entry(part.to_string()).or_default();
            if parts.peek().is_none() && entry.is_blob() {
                node.is_file = true;
            }
        }
    }

    into_nodes(root, "")
}

fn into_nodes(trie: TrieNode, parent: &str) -> Vec<FileNode> {
    trie.children
        .into_iter()
        .map(|(name, child)| {
            let path = if parent.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", parent, name)
            };
            // A path listed both as a file and with descendants is a directory
            if child.is_file && child.children.is_empty() {
                let language = language_from_extension(&name).map(str::to_string);
                FileNode::file(name, path, language)
            } else {
                let children = into_nodes(child, &path);
                FileNode::directory(name, path, children)
            }
        })
        .collect()
}
