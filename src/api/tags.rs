//! Tag API endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::catalog::Catalog;
use crate::AppState;

/// GET /api/tags - Distinct tags across all tutorials.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let catalog = Catalog::load(&state.loader).await?;
    success(catalog.all_tags())
}
