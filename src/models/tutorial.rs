//! Tutorial, metadata and repository descriptor models.

use serde::{Deserialize, Serialize};

use super::FileNode;

/// Tutorial difficulty level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Parse an optional raw value, defaulting to intermediate.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty: {}", other)),
        }
    }
}

/// Owner of a repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryOwner {
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

/// Repository descriptor, shaped like the GitHub REST `repos/{owner}/{repo}` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    pub updated_at: String,
    pub created_at: String,
    pub owner: RepositoryOwner,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Descriptive metadata of a tutorial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TutorialMetadata {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_last_updated: Option<String>,
}

/// A tutorial as served to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    /// Storage prefix and route slug
    pub id: String,
    pub repository: Repository,
    pub metadata: TutorialMetadata,
    /// Markdown body as loaded, or HTML when built from a live repository
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readme_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_structure: Option<Vec<FileNode>>,
    pub slug: String,
    pub generated_at: String,
}
