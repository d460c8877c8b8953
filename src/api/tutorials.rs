//! Tutorial API endpoints.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use super::{render_markdown, success, ApiResult};
use crate::catalog::Catalog;
use crate::errors::AppError;
use crate::markdown::chapter_route;
use crate::models::Tutorial;
use crate::AppState;

/// Catalog query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct TutorialQuery {
    /// Exact tag, case-insensitive
    pub tag: Option<String>,
    /// Free-text search
    pub q: Option<String>,
}

/// A chapter link in a tutorial page.
#[derive(Debug, Serialize)]
pub struct ChapterLink {
    pub name: String,
    pub href: String,
}

/// A tutorial with its rendered index.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialPage {
    pub tutorial: Tutorial,
    pub html: String,
    pub chapters: Vec<ChapterLink>,
}

/// A rendered chapter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterPage {
    pub tutorial_id: String,
    pub chapter: String,
    pub html: String,
}

/// GET /api/tutorials - List tutorials, optionally filtered by tag and/or query.
pub async fn list_tutorials(
    State(state): State<AppState>,
    Query(params): Query<TutorialQuery>,
) -> ApiResult<Vec<Tutorial>> {
    let catalog = Catalog::load(&state.loader).await?;

    let mut tutorials = match params.tag.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(tag) => catalog.filter_by_tag(tag),
        None => catalog.into_vec(),
    };
    if let Some(query) = params.q.as_deref().filter(|q| !q.trim().is_empty()) {
        tutorials = Catalog::new(tutorials).search(query.trim());
    }

    success(tutorials)
}

/// GET /api/tutorials/{slug} - A tutorial with its processed index and chapter list.
pub async fn get_tutorial(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<TutorialPage> {
    let tutorial = state
        .loader
        .load(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tutorial {} not found", slug)))?;

    let html = render_markdown(&state, &tutorial.content, &tutorial.id).await?;
    let chapters = state
        .loader
        .chapters(&tutorial.id)
        .await?
        .into_iter()
        .map(|name| ChapterLink {
            href: chapter_route(&tutorial.id, &name),
            name,
        })
        .collect();

    success(TutorialPage {
        tutorial,
        html,
        chapters,
    })
}

/// GET /api/tutorials/{slug}/chapters/{chapter} - One processed chapter.
pub async fn get_chapter(
    State(state): State<AppState>,
    Path((slug, chapter)): Path<(String, String)>,
) -> ApiResult<ChapterPage> {
    let raw = match state.loader.load_chapter(&slug, &chapter).await? {
        Some(raw) => raw,
        None if !state.loader.tutorial_exists(&slug).await? => {
            return Err(AppError::NotFound(format!("Tutorial {} not found", slug)));
        }
        None => {
            return Err(AppError::NotFound(format!(
                "Chapter {} of tutorial {} not found",
                chapter, slug
            )));
        }
    };

    let html = render_markdown(&state, &raw, &slug).await?;

    success(ChapterPage {
        tutorial_id: slug,
        chapter,
        html,
    })
}
