//! REST API module.
//!
//! JSON endpoints for the tutorial catalog and generation requests, plus the
//! bare HTML pages that chapter links point at.

mod generate;
mod home;
mod pages;
mod preview;
mod tags;
mod tutorials;

pub use generate::*;
pub use home::*;
pub use pages::*;
pub use preview::*;
pub use tags::*;
pub use tutorials::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Render markdown for a page, resolving diagrams server-side when an engine
/// is configured.
pub(crate) async fn render_markdown(
    state: &AppState,
    raw: &str,
    tutorial_id: &str,
) -> Result<String, AppError> {
    let processed = crate::markdown::process(raw, Some(tutorial_id))?;
    match &state.diagrams {
        Some(renderer) => Ok(renderer.render(&processed.html).await),
        None => Ok(processed.html),
    }
}
