//! Tutorial generation request endpoint.
//!
//! Unlike the rest of the API this endpoint answers with a flat `{message}`
//! body, which is what the generation form expects.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::dispatcher::{DispatchError, ValidationError};
use crate::AppState;

pub const MSG_URL_REQUIRED: &str = "Repository URL is required";
pub const MSG_URL_INVALID: &str = "Please provide a valid GitHub repository URL";
pub const MSG_SCHEDULED: &str = "Tutorial generation scheduled successfully";
pub const MSG_REJECTED: &str = "Failed to schedule tutorial generation. Please try again.";
pub const MSG_UNREACHABLE: &str =
    "Could not reach the tutorial generation service. Please try again later.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub repository_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub message: String,
    pub repository_url: String,
    pub event_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateError {
    pub message: String,
}

fn reply(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(GenerateError {
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// POST /api/generate-tutorial - Ask the generation service for a new tutorial.
pub async fn generate_tutorial(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let repository_url = match body {
        Ok(Json(request)) => request.repository_url.unwrap_or_default(),
        Err(rejection) => {
            tracing::debug!("Unreadable generation request: {}", rejection);
            String::new()
        }
    };

    match state.dispatcher.dispatch(&repository_url).await {
        Ok(event_id) => (
            StatusCode::OK,
            Json(GenerateResponse {
                message: MSG_SCHEDULED.to_string(),
                repository_url: repository_url.trim().to_string(),
                event_id: event_id.to_string(),
            }),
        )
            .into_response(),
        Err(DispatchError::Invalid(ValidationError::Missing)) => {
            reply(StatusCode::BAD_REQUEST, MSG_URL_REQUIRED)
        }
        Err(DispatchError::Invalid(e)) => {
            tracing::debug!("Rejected repository URL {:?}: {}", repository_url, e);
            reply(StatusCode::BAD_REQUEST, MSG_URL_INVALID)
        }
        Err(DispatchError::Rejected(_)) => reply(StatusCode::INTERNAL_SERVER_ERROR, MSG_REJECTED),
        Err(DispatchError::Network(_)) => {
            reply(StatusCode::INTERNAL_SERVER_ERROR, MSG_UNREACHABLE)
        }
    }
}
