//! Home page data.

use axum::extract::State;
use serde::Serialize;

use super::{success, ApiResult};
use crate::catalog::Catalog;
use crate::models::Tutorial;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeData {
    pub featured_tutorials: Vec<Tutorial>,
    pub all_tutorials: Vec<Tutorial>,
    pub categories: Vec<String>,
}

/// GET /api/home - Featured tutorials, all tutorials and categories.
///
/// The three are independent catalog loads and run concurrently.
pub async fn get_home(State(state): State<AppState>) -> ApiResult<HomeData> {
    let (featured, all, categories) = tokio::join!(
        async { Catalog::load(&state.loader).await.map(|c| c.featured()) },
        async { Catalog::load(&state.loader).await.map(Catalog::into_vec) },
        async { Catalog::load(&state.loader).await.map(|c| c.all_tags()) },
    );

    success(HomeData {
        featured_tutorials: featured?,
        all_tutorials: all?,
        categories: categories?,
    })
}
