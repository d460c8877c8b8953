//! Blob store gateway.
//!
//! A thin key-based view over the tutorial bucket. Keys are slash-delimited and
//! listings follow the S3 `/`-delimiter convention: direct children come back as
//! full keys, nested prefixes come back once with a trailing `/`.

mod fs;
mod sqlite;

pub use fs::FsBlobStore;
pub use sqlite::SqliteBlobStore;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::errors::AppError;

/// Read-only access to the object store. Tutorials are written by the external
/// generation service, never by this backend.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch an object as UTF-8 text. `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> Result<bool, AppError>;

    /// List the direct children of `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, AppError>;
}

/// Top-level prefixes of the bucket, i.e. every tutorial identifier.
pub async fn tutorial_directories(store: &dyn BlobStore) -> Result<Vec<String>, AppError> {
    let entries = store.list("").await?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| entry.strip_suffix('/').map(str::to_string))
        .collect())
}

/// File names directly under `{tutorial_id}/`, with the prefix removed.
pub async fn tutorial_files(
    store: &dyn BlobStore,
    tutorial_id: &str,
) -> Result<Vec<String>, AppError> {
    let prefix = format!("{}/", tutorial_id);
    let entries = store.list(&prefix).await?;
    Ok(entries
        .into_iter()
        .filter(|entry| !entry.ends_with('/'))
        .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
        .collect())
}

/// Collapse a flat set of keys under `prefix` into a delimiter listing.
pub(crate) fn collapse_listing<I>(prefix: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut listing = BTreeSet::new();
    for key in keys {
        let Some(rest) = key.strip_prefix(prefix) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        match rest.find('/') {
            Some(idx) => {
                listing.insert(format!("{}{}", prefix, &rest[..=idx]));
            }
            None => {
                listing.insert(key.clone());
            }
        }
    }
    listing.into_iter().collect()
}

/// Reject keys that could escape the bucket or address nothing.
pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Store whose backend never answers.
#[cfg(test)]
pub(crate) struct UnreachableBlobStore;

#[cfg(test)]
#[async_trait]
impl BlobStore for UnreachableBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Err(AppError::Storage(format!("Failed to read {}: connection refused", key)))
    }

    async fn exists(&self, key: &str) -> Result<bool, AppError> {
        Err(AppError::Storage(format!("Failed to stat {}: connection refused", key)))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        Err(AppError::Storage(format!("Failed to list {}: connection refused", prefix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_listing_root() {
        let keys = vec![
            "alpha/index.md".to_string(),
            "alpha/waver-config.json".to_string(),
            "beta/index.md".to_string(),
            "README.txt".to_string(),
        ];
        let listing = collapse_listing("", keys);
        assert_eq!(listing, vec!["README.txt", "alpha/", "beta/"]);
    }

    #[test]
    fn test_collapse_listing_prefix() {
        let keys = vec![
            "alpha/index.md".to_string(),
            "alpha/01-intro.md".to_string(),
            "alpha/assets/logo.png".to_string(),
            "alphabet/index.md".to_string(),
        ];
        let listing = collapse_listing("alpha/", keys);
        assert_eq!(
            listing,
            vec!["alpha/01-intro.md", "alpha/assets/", "alpha/index.md"]
        );
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("demo/index.md"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("/etc/passwd"));
        assert!(!is_valid_key("demo/../secret"));
        assert!(!is_valid_key("demo//index.md"));
        assert!(!is_valid_key("demo\\index.md"));
    }
}
