//! GitHub REST client.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, StatusCode};
use serde::Deserialize;

use crate::models::Repository;

const USER_AGENT: &str = concat!("waver-site/", env!("CARGO_PKG_VERSION"));

/// README file names, most conventional first.
pub const README_FILES: [&str; 5] = ["README.md", "readme.md", "README.rst", "README.txt", "README"];

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("GitHub resource not found: {0}")]
    NotFound(String),
    #[error("GitHub API returned {status} for {path}")]
    Status { status: StatusCode, path: String },
    #[error("GitHub API unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected GitHub payload for {path}: {message}")]
    Decode { path: String, message: String },
}

/// One entry of a recursive git tree listing.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TreeEntry {
    pub path: String,
    /// `blob` for files, `tree` for directories
    #[serde(rename = "type")]
    pub entry_type: String,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.entry_type == "blob"
    }
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Read-only access to the repositories API.
#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.api_url, path);
        let mut request = self
            .client
            .get(&url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GitHubError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            tracing::warn!("GitHub API returned {} for {}", status, path);
            return Err(GitHubError::Status {
                status,
                path: path.to_string(),
            });
        }

        response.json::<T>().await.map_err(|e| GitHubError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Repository descriptor for `owner/repo`.
    pub async fn fetch_repository(&self, owner: &str, repo: &str) -> Result<Repository, GitHubError> {
        self.get_json(&format!("/repos/{}/{}", owner, repo)).await
    }

    /// Decoded text of one file at the default branch head.
    pub async fn fetch_file(&self, owner: &str, repo: &str, path: &str) -> Result<String, GitHubError> {
        let api_path = format!("/repos/{}/{}/contents/{}", owner, repo, path);
        let content: ContentResponse = self.get_json(&api_path).await?;

        let decode_error = |message: &str| GitHubError::Decode {
            path: api_path.clone(),
            message: message.to_string(),
        };

        if content.content_type != "file" {
            return Err(decode_error("not a file"));
        }
        let encoded = content
            .content
            .ok_or_else(|| decode_error("file content not available"))?;
        if content.encoding.as_deref().unwrap_or("base64") != "base64" {
            return Err(decode_error("unsupported content encoding"));
        }

        // The API wraps base64 at 60 columns
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| decode_error(&e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| decode_error(&e.to_string()))
    }

    /// First README found under [`README_FILES`], or `None`.
    pub async fn fetch_readme(&self, owner: &str, repo: &str) -> Result<Option<String>, GitHubError> {
        for name in README_FILES {
            match self.fetch_file(owner, repo, name).await {
                Ok(content) => return Ok(Some(content)),
                Err(GitHubError::NotFound(_)) => continue,
                Err(GitHubError::Network(e)) => return Err(GitHubError::Network(e)),
                Err(e) => {
                    tracing::debug!("Skipping {} in {}/{}: {}", name, owner, repo, e);
                    continue;
                }
            }
        }
        Ok(None)
    }

    /// Every path of the repository at `HEAD`.
    pub async fn fetch_tree(&self, owner: &str, repo: &str) -> Result<Vec<TreeEntry>, GitHubError> {
        let response: TreeResponse = self
            .get_json(&format!("/repos/{}/{}/git/trees/HEAD?recursive=1", owner, repo))
            .await?;
        if response.truncated {
            tracing::warn!("Tree of {}/{} was truncated by the API", owner, repo);
        }
        Ok(response.tree)
    }
}
