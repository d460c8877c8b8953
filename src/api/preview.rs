//! Live repository preview endpoint.

use axum::extract::{Query, State};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::github;
use crate::models::Tutorial;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    pub repository_url: Option<String>,
}

/// GET /api/preview - Build a tutorial from a GitHub repository without persisting it.
pub async fn preview_tutorial(
    State(state): State<AppState>,
    Query(params): Query<PreviewQuery>,
) -> ApiResult<Tutorial> {
    let url = params
        .repository_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Repository URL is required".to_string()))?;

    let tutorial = github::generate_tutorial(&state.github, url.trim()).await?;
    success(tutorial)
}
