//! Tutorial loader.
//!
//! A persisted tutorial lives under the prefix `{id}/` of the blob store:
//!
//! - `waver-config.json`: authoritative metadata
//! - `index.md`: the main document
//! - `*.md`: chapters
//!
//! Absence of any required key is `Ok(None)`. Storage failures stay errors so
//! callers can tell "no such tutorial" from "bucket unreachable".

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::dispatcher::validate_repository_url;
use crate::errors::AppError;
use crate::markdown::strip_front_matter;
use crate::models::{FileNode, Repository, RepositoryOwner, Tutorial, TutorialMetadata, WaverConfig};
use crate::storage::{self, BlobStore};

pub const CONFIG_FILE: &str = "waver-config.json";
pub const INDEX_FILE: &str = "index.md";

const MARKDOWN_FENCE_OPEN: &str = "```markdown\n";
const MARKDOWN_FENCE_CLOSE: &str = "\n```";

const PLACEHOLDER_OWNER: &str = "tutorial-author";
const PLACEHOLDER_AVATAR: &str = "https://avatars.githubusercontent.com/u/1234567?v=4";

/// Builds [`Tutorial`] records from the blob store.
#[derive(Clone)]
pub struct TutorialLoader {
    store: Arc<dyn BlobStore>,
}

impl TutorialLoader {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Load a tutorial by id.
    pub async fn load(&self, id: &str) -> Result<Option<Tutorial>, AppError> {
        if !is_valid_id(id) {
            return Ok(None);
        }

        let config_key = format!("{}/{}", id, CONFIG_FILE);
        let index_key = format!("{}/{}", id, INDEX_FILE);

        if !self.store.exists(&config_key).await? {
            tracing::debug!("Config not found: {}", config_key);
            return Ok(None);
        }
        if !self.store.exists(&index_key).await? {
            tracing::debug!("Index not found: {}", index_key);
            return Ok(None);
        }

        // Either key may vanish between the existence check and the read
        let Some(raw_config) = self.store.get(&config_key).await? else {
            return Ok(None);
        };
        let Some(raw_index) = self.store.get(&index_key).await? else {
            return Ok(None);
        };

        let config = WaverConfig::from_json(&raw_config).map_err(|e| {
            tracing::error!("Invalid {}: {}", config_key, e);
            AppError::Processing(format!("Invalid tutorial config for {}: {}", id, e))
        })?;

        let content = strip_markdown_wrapper(strip_front_matter(&raw_index)).to_string();
        let chapters = self.chapters(id).await?;
        let now = now_rfc3339();

        let last_updated = config.last_updated.clone().unwrap_or_else(|| now.clone());
        let metadata = TutorialMetadata {
            title: config.title.clone().unwrap_or_else(|| id.to_string()),
            description: config.description.clone().unwrap_or_default(),
            author: config.author.clone(),
            tags: config.tags.clone(),
            difficulty: config.difficulty,
            estimated_time: config.estimated_time.clone(),
            prerequisites: config.prerequisites.clone(),
            formatted_last_updated: Some(format_date(&last_updated)),
            last_updated: Some(last_updated),
        };

        let repository = synthesize_repository(id, &config, &metadata, &now);

        Ok(Some(Tutorial {
            id: id.to_string(),
            repository,
            metadata,
            content,
            readme_content: None,
            file_structure: Some(file_structure(&chapters)),
            slug: id.to_string(),
            generated_at: now,
        }))
    }

    /// Load the markdown body of one chapter, front-matter removed.
    pub async fn load_chapter(&self, id: &str, chapter: &str) -> Result<Option<String>, AppError> {
        if !is_valid_id(id) || !storage::is_valid_key(chapter) {
            return Ok(None);
        }

        let key = format!("{}/{}", id, chapter);
        if !self.store.exists(&key).await? {
            tracing::debug!("Chapter not found: {}", key);
            return Ok(None);
        }

        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        Ok(Some(strip_markdown_wrapper(strip_front_matter(&raw)).to_string()))
    }

    /// Every tutorial id in the store, i.e. its top-level prefixes.
    pub async fn list_tutorial_ids(&self) -> Result<Vec<String>, AppError> {
        storage::tutorial_directories(self.store.as_ref()).await
    }

    pub async fn tutorial_exists(&self, id: &str) -> Result<bool, AppError> {
        if !is_valid_id(id) {
            return Ok(false);
        }
        self.store.exists(&format!("{}/{}", id, CONFIG_FILE)).await
    }

    /// Top-level chapter file names of a tutorial, excluding the index.
    pub async fn chapters(&self, id: &str) -> Result<Vec<String>, AppError> {
        if !is_valid_id(id) {
            return Ok(Vec::new());
        }
        let files = storage::tutorial_files(self.store.as_ref(), id).await?;
        Ok(files
            .into_iter()
            .filter(|file| file.ends_with(".md") && file != INDEX_FILE)
            .collect())
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.contains('/') && storage::is_valid_key(id)
}

/// Remove a single outer ```` ```markdown ```` fence left by the generation service.
pub fn strip_markdown_wrapper(content: &str) -> &str {
    let Some(inner) = content.strip_prefix(MARKDOWN_FENCE_OPEN) else {
        return content;
    };
    let trimmed = inner.trim_end_matches(['\n', '\r']);
    trimmed.strip_suffix(MARKDOWN_FENCE_CLOSE).unwrap_or(inner)
}

/// Render a timestamp as `Month D, YYYY`.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD`. Anything else is
/// returned unchanged.
pub fn format_date(raw: &str) -> String {
    const DISPLAY: &str = "%B %-d, %Y";

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format(DISPLAY).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return dt.format(DISPLAY).to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format(DISPLAY).to_string();
    }
    raw.to_string()
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn file_structure(chapters: &[String]) -> Vec<FileNode> {
    let mut nodes = vec![
        FileNode::file(INDEX_FILE, INDEX_FILE, Some("markdown".to_string())),
        FileNode::file(CONFIG_FILE, CONFIG_FILE, Some("json".to_string())),
    ];
    nodes.extend(
        chapters
            .iter()
            .map(|chapter| FileNode::file(chapter.as_str(), chapter.as_str(), Some("markdown".to_string()))),
    );
    nodes
}

/// Repository descriptor for a tutorial that was not fetched from GitHub.
fn synthesize_repository(
    id: &str,
    config: &WaverConfig,
    metadata: &TutorialMetadata,
    now: &str,
) -> Repository {
    let source = config
        .repo
        .as_deref()
        .and_then(|repo| validate_repository_url(repo).ok());

    // GitHub URLs are normalized; anything else is kept as written
    let html_url = match (&source, &config.repo) {
        (Some(repo), _) => repo.html_url(),
        (None, Some(raw)) => raw.clone(),
        (None, None) => format!("https://github.com/example/{}", id),
    };
    let clone_url = if html_url.ends_with(".git") {
        html_url.clone()
    } else {
        format!("{}.git", html_url.trim_end_matches('/'))
    };

    let owner = match &source {
        Some(repo) => RepositoryOwner {
            login: repo.owner.clone(),
            avatar_url: format!("https://github.com/{}.png", repo.owner),
            html_url: format!("https://github.com/{}", repo.owner),
        },
        None => RepositoryOwner {
            login: PLACEHOLDER_OWNER.to_string(),
            avatar_url: PLACEHOLDER_AVATAR.to_string(),
            html_url: format!("https://github.com/{}", PLACEHOLDER_OWNER),
        },
    };

    Repository {
        id: None,
        name: id.to_string(),
        full_name: source
            .as_ref()
            .map(|repo| repo.full_name())
            .unwrap_or_else(|| id.to_string()),
        description: Some(metadata.description.clone()),
        html_url,
        clone_url: Some(clone_url),
        stargazers_count: 0,
        forks_count: 0,
        language: Some(
            config
                .language
                .clone()
                .unwrap_or_else(|| "Markdown".to_string()),
        ),
        default_branch: Some("main".to_string()),
        updated_at: metadata.last_updated.clone().unwrap_or_else(|| now.to_string()),
        created_at: now.to_string(),
        owner,
        topics: config.tags.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;
    use crate::storage::{FsBlobStore, UnreachableBlobStore};
    use tempfile::TempDir;

    async fn seeded(files: &[(&str, &str)]) -> (TutorialLoader, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        for (key, body) in files {
            store.put(key, body).await.unwrap();
        }
        (TutorialLoader::new(Arc::new(store)), dir)
    }

    #[tokio::test]
    async fn test_load_minimal_tutorial() {
        let (loader, _dir) = seeded(&[
            ("t1/waver-config.json", r#"{"title":"T","tags":["x"]}"#),
            ("t1/index.md", "---\n---\nhello"),
        ])
        .await;

        let tutorial = loader.load("t1").await.unwrap().unwrap();

        assert_eq!(tutorial.metadata.title, "T");
        assert_eq!(tutorial.metadata.tags, vec!["x"]);
        assert_eq!(tutorial.metadata.description, "");
        assert_eq!(tutorial.metadata.difficulty, Difficulty::Intermediate);
        assert!(tutorial.metadata.last_updated.is_some());
        assert_eq!(tutorial.content, "hello");
        assert_eq!(tutorial.slug, "t1");

        let names: Vec<_> = tutorial
            .file_structure
            .unwrap()
            .into_iter()
            .map(|node| node.name)
            .collect();
        assert!(names.contains(&"index.md".to_string()));
        assert!(names.contains(&"waver-config.json".to_string()));
    }

    #[tokio::test]
    async fn test_missing_index_is_not_found() {
        let (loader, _dir) = seeded(&[("t1/waver-config.json", r#"{"title":"T"}"#)]).await;
        assert!(loader.load("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_config_is_not_found() {
        let (loader, _dir) = seeded(&[("t1/index.md", "hello")]).await;
        assert!(loader.load("t1").await.unwrap().is_none());
        assert!(!loader.tutorial_exists("t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_config_is_processing_error() {
        let (loader, _dir) = seeded(&[
            ("t1/waver-config.json", "[1, 2]"),
            ("t1/index.md", "hello"),
        ])
        .await;
        assert!(matches!(
            loader.load("t1").await,
            Err(AppError::Processing(_))
        ));
    }

    #[tokio::test]
    async fn test_full_config_and_chapters() {
        let config = r#"{
            "title": "Tokio Deep Dive",
            "description": "Async runtimes",
            "repo": "https://github.com/tokio-rs/tokio",
            "author": "Waver",
            "language": "Rust",
            "tags": ["rust", "async"],
            "difficulty": "advanced",
            "estimatedTime": "2 hours",
            "prerequisites": ["Rust basics"],
            "lastUpdated": "2024-03-05T10:00:00Z"
        }"#;
        let (loader, _dir) = seeded(&[
            ("tokio/waver-config.json", config),
            ("tokio/index.md", "```markdown\n# Tokio\n\nIntro\n```\n"),
            ("tokio/02-tasks.md", "---\ntitle: Tasks\n---\n# Tasks"),
            ("tokio/01-runtime.md", "# Runtime"),
            ("tokio/assets/diagram.png", "png"),
        ])
        .await;

        let tutorial = loader.load("tokio").await.unwrap().unwrap();
        assert_eq!(tutorial.content, "# Tokio\n\nIntro");
        assert_eq!(tutorial.metadata.difficulty, Difficulty::Advanced);
        assert_eq!(
            tutorial.metadata.formatted_last_updated.as_deref(),
            Some("March 5, 2024")
        );

        let repo = &tutorial.repository;
        assert_eq!(repo.html_url, "https://github.com/tokio-rs/tokio");
        assert_eq!(repo.clone_url.as_deref(), Some("https://github.com/tokio-rs/tokio.git"));
        assert_eq!(repo.full_name, "tokio-rs/tokio");
        assert_eq!(repo.owner.login, "tokio-rs");
        assert_eq!(repo.language.as_deref(), Some("Rust"));
        assert_eq!(repo.topics, vec!["rust", "async"]);
        assert_eq!(repo.updated_at, "2024-03-05T10:00:00Z");

        let paths: Vec<_> = tutorial
            .file_structure
            .unwrap()
            .into_iter()
            .map(|node| node.path)
            .collect();
        assert_eq!(
            paths,
            vec!["index.md", "waver-config.json", "01-runtime.md", "02-tasks.md"]
        );

        assert_eq!(
            loader.chapters("tokio").await.unwrap(),
            vec!["01-runtime.md", "02-tasks.md"]
        );
        assert_eq!(
            loader.load_chapter("tokio", "02-tasks.md").await.unwrap().as_deref(),
            Some("# Tasks")
        );
    }

    #[tokio::test]
    async fn test_synthesized_repository_without_repo_url() {
        let (loader, _dir) = seeded(&[
            ("demo/waver-config.json", "{}"),
            ("demo/index.md", "hi"),
        ])
        .await;

        let tutorial = loader.load("demo").await.unwrap().unwrap();
        assert_eq!(tutorial.metadata.title, "demo");
        assert_eq!(tutorial.repository.html_url, "https://github.com/example/demo");
        assert_eq!(tutorial.repository.owner.login, "tutorial-author");
        assert_eq!(tutorial.repository.language.as_deref(), Some("Markdown"));
    }

    #[tokio::test]
    async fn test_github_repo_url_is_normalized() {
        let (loader, _dir) = seeded(&[
            ("widget/waver-config.json", r#"{"repo":"https://github.com/acme/widget.git"}"#),
            ("widget/index.md", "# Widget"),
            ("gitlab/waver-config.json", r#"{"repo":"https://gitlab.com/acme/widget"}"#),
            ("gitlab/index.md", "# Widget"),
        ])
        .await;

        let repo = loader.load("widget").await.unwrap().unwrap().repository;
        assert_eq!(repo.html_url, "https://github.com/acme/widget");
        assert_eq!(repo.clone_url.as_deref(), Some("https://github.com/acme/widget.git"));

        let repo = loader.load("gitlab").await.unwrap().unwrap().repository;
        assert_eq!(repo.html_url, "https://gitlab.com/acme/widget");
        assert_eq!(repo.owner.login, "tutorial-author");
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_absence() {
        let loader = TutorialLoader::new(Arc::new(UnreachableBlobStore));

        assert!(matches!(loader.load("t1").await, Err(AppError::Storage(_))));
        assert!(matches!(
            loader.load_chapter("t1", "01-intro.md").await,
            Err(AppError::Storage(_))
        ));
        assert!(matches!(loader.list_tutorial_ids().await, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn test_chapter_lookup_rejects_traversal() {
        let (loader, _dir) = seeded(&[
            ("a/waver-config.json", "{}"),
            ("a/index.md", "a"),
            ("b/secret.md", "secret"),
        ])
        .await;

        assert!(loader.load_chapter("a", "../b/secret.md").await.unwrap().is_none());
        assert!(loader.load_chapter("a", "missing.md").await.unwrap().is_none());
        assert!(loader.load_chapter("a/..", "b/secret.md").await.unwrap().is_none());
        assert!(loader.load("..").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_tutorial_ids() {
        let (loader, _dir) = seeded(&[
            ("beta/index.md", "b"),
            ("alpha/index.md", "a"),
            ("stray.txt", "x"),
        ])
        .await;
        assert_eq!(loader.list_tutorial_ids().await.unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_strip_markdown_wrapper() {
        assert_eq!(strip_markdown_wrapper("```markdown\n# A\n```"), "# A");
        assert_eq!(strip_markdown_wrapper("```markdown\n# A\n```\n\n"), "# A");
        assert_eq!(strip_markdown_wrapper("# A\n```"), "# A\n```");
        assert_eq!(strip_markdown_wrapper("```rust\nfn x() {}\n```"), "```rust\nfn x() {}\n```");
        assert_eq!(strip_markdown_wrapper("```markdown\nunclosed"), "unclosed");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-05T10:00:00Z"), "March 5, 2024");
        assert_eq!(format_date("2024-12-25"), "December 25, 2024");
        assert_eq!(format_date("2024-01-09T08:30:00"), "January 9, 2024");
        assert_eq!(format_date("yesterday"), "yesterday");
    }
}
