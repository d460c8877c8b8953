//! File tree node model.

use serde::{Deserialize, Serialize};

/// Whether a node is a leaf file or a directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    File,
    Directory,
}

/// One entry of a tutorial's file structure.
///
/// A node is a file iff `children` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileNode {
    pub name: String,
    /// Slash-delimited, relative to the tutorial root
    pub path: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileNode {
    pub fn file(name: impl Into<String>, path: impl Into<String>, language: Option<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            file_type: FileType::File,
            children: None,
            language,
            content: None,
        }
    }

    pub fn directory(name: impl Into<String>, path: impl Into<String>, children: Vec<FileNode>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            file_type: FileType::Directory,
            children: Some(children),
            language: None,
            content: None,
        }
    }
}
