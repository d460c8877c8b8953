//! Filesystem-backed blob store.
//!
//! A directory plays the bucket: the key `demo/index.md` is the file
//! `{root}/demo/index.md`. This mirrors the on-disk layout of a MinIO data
//! directory closely enough to point the site at a local export.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{is_valid_key, BlobStore};
use crate::errors::AppError;

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a bucket directory, creating it if missing.
    pub async fn open(root: &Path) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(root).await?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Write an object, creating intermediate directories.
    #[cfg(test)]
    pub async fn put(&self, key: &str, body: &str) -> Result<(), AppError> {
        let path = self
            .resolve(key)
            .ok_or_else(|| AppError::Validation(format!("Invalid blob key: {}", key)))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, body).await?;
        Ok(())
    }

    fn resolve(&self, key: &str) -> Option<PathBuf> {
        if !is_valid_key(key) {
            return None;
        }
        Some(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let Some(path) = self.resolve(key) else {
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            // Reading a directory key behaves like a missing object
            Err(_) if path.is_dir() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let Some(path) = self.resolve(key) else {
            return Ok(false);
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        // Split "demo/ch" into the directory "demo/" and the name filter "ch"
        let (dir_key, name_start) = match prefix.rfind('/') {
            Some(idx) => (&prefix[..=idx], &prefix[idx + 1..]),
            None => ("", prefix),
        };

        let dir = if dir_key.is_empty() {
            self.root.clone()
        } else {
            match self.resolve(dir_key.trim_end_matches('/')) {
                Some(dir) => dir,
                None => return Ok(Vec::new()),
            }
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut listing = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with(name_start) {
                continue;
            }
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                listing.push(format!("{}{}/", dir_key, name));
            } else if file_type.is_file() {
                listing.push(format!("{}{}", dir_key, name));
            }
        }

        listing.sort();
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_exists() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp_dir.path()).await.unwrap();

        store.put("demo/index.md", "# Demo").await.unwrap();

        assert!(store.exists("demo/index.md").await.unwrap());
        assert!(!store.exists("demo/other.md").await.unwrap());
        assert!(!store.exists("demo").await.unwrap());
        assert_eq!(
            store.get("demo/index.md").await.unwrap().as_deref(),
            Some("# Demo")
        );
        assert!(store.get("demo/other.md").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_traversal_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(&temp_dir.path().join("bucket"))
            .await
            .unwrap();
        std::fs::write(temp_dir.path().join("secret.txt"), "nope").unwrap();

        assert!(store.get("../secret.txt").await.unwrap().is_none());
        assert!(!store.exists("../secret.txt").await.unwrap());
        assert!(store.put("../secret.txt", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_list_with_delimiter() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp_dir.path()).await.unwrap();

        store.put("alpha/index.md", "a").await.unwrap();
        store.put("alpha/01-intro.md", "b").await.unwrap();
        store.put("alpha/assets/logo.svg", "c").await.unwrap();
        store.put("beta/index.md", "d").await.unwrap();

        assert_eq!(store.list("").await.unwrap(), vec!["alpha/", "beta/"]);
        assert_eq!(
            store.list("alpha/").await.unwrap(),
            vec!["alpha/01-intro.md", "alpha/assets/", "alpha/index.md"]
        );
        assert_eq!(store.list("alpha/in").await.unwrap(), vec!["alpha/index.md"]);
        assert!(store.list("gamma/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tutorial_helpers() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(temp_dir.path()).await.unwrap();

        store.put("alpha/index.md", "a").await.unwrap();
        store.put("alpha/waver-config.json", "{}").await.unwrap();
        store.put("alpha/nested/deep.md", "x").await.unwrap();
        store.put("beta/index.md", "b").await.unwrap();

        let dirs = crate::storage::tutorial_directories(&store).await.unwrap();
        assert_eq!(dirs, vec!["alpha", "beta"]);

        let files = crate::storage::tutorial_files(&store, "alpha").await.unwrap();
        assert_eq!(files, vec!["index.md", "waver-config.json"]);
    }
}
