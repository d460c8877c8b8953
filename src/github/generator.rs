//! On-demand preview tutorials built straight from a live repository.

use super::{build_file_tree, GitHubClient};
use crate::dispatcher::validate_repository_url;
use crate::errors::AppError;
use crate::loader::{format_date, now_rfc3339};
use crate::markdown::{self, extract_metadata_from_readme, generate_slug, MarkdownMetadata};
use crate::models::{Difficulty, FileNode, Tutorial, TutorialMetadata};

/// Build a [`Tutorial`] from the README and tree of a GitHub repository.
///
/// Front-matter in the README overrides the heading/paragraph heuristics. The
/// content is the README rendered to HTML. Nothing is persisted.
pub async fn generate_tutorial(github: &GitHubClient, repository_url: &str) -> Result<Tutorial, AppError> {
    let source = validate_repository_url(repository_url)
        .map_err(|e| AppError::Validation(format!("Invalid GitHub repository URL: {}", e)))?;

    let repository = github.fetch_repository(&source.owner, &source.name).await?;
    let readme = github
        .fetch_readme(&source.owner, &source.name)
        .await?
        .ok_or_else(|| AppError::NotFound("Repository does not have a README file".to_string()))?;

    let processed = markdown::process(&readme, None)?;
    let mut metadata = merge_metadata(
        extract_metadata_from_readme(&readme, &repository.name),
        processed.metadata,
    );
    metadata.formatted_last_updated = Some(format_date(&repository.updated_at));
    metadata.last_updated = Some(repository.updated_at.clone());

    let file_structure = file_structure(github, &source.owner, &source.name).await;

    let id = format!("{}-{}", repository.owner.login, repository.name);
    tracing::info!("Generated preview tutorial {}", id);

    Ok(Tutorial {
        slug: generate_slug(&id),
        id,
        repository,
        metadata,
        content: processed.html,
        readme_content: Some(readme),
        file_structure: Some(file_structure),
        generated_at: now_rfc3339(),
    })
}

/// Overlay every field front-matter actually set.
fn merge_metadata(mut base: TutorialMetadata, front_matter: MarkdownMetadata) -> TutorialMetadata {
    if let Some(title) = front_matter.title {
        base.title = title;
    }
    if let Some(description) = front_matter.description {
        base.description = description;
    }
    if front_matter.author.is_some() {
        base.author = front_matter.author;
    }
    if !front_matter.tags.is_empty() {
        base.tags = front_matter.tags;
    }
    if let Some(difficulty) = front_matter
        .difficulty
        .as_deref()
        .and_then(|raw| raw.parse::<Difficulty>().ok())
    {
        base.difficulty = difficulty;
    }
    if front_matter.estimated_time.is_some() {
        base.estimated_time = front_matter.estimated_time;
    }
    if !front_matter.prerequisites.is_empty() {
        base.prerequisites = front_matter.prerequisites;
    }
    base
}

async fn file_structure(github: &GitHubClient, owner: &str, repo: &str) -> Vec<FileNode> {
    match github.fetch_tree(owner, repo).await {
        Ok(entries) => build_file_tree(&entries),
        Err(e) => {
            tracing::warn!("Could not build file tree for {}/{}: {}", owner, repo, e);
            Vec::new()
        }
    }
}
