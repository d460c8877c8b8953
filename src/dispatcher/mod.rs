//! Generation request dispatcher.
//!
//! Validates a repository URL and hands it to the external generation service
//! as a single CloudEvents-style HTTP POST. Nothing is generated here and no
//! state is kept between calls.

use reqwest::StatusCode;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

/// Event type understood by the generation service.
pub const EVENT_TYPE: &str = "dev.shaaf.waver.processing.request";

/// Source tag identifying this service as the event producer.
pub const EVENT_SOURCE: &str = "/waver-site-frontend";

pub const SPEC_VERSION: &str = "1.0";

const GITHUB_HOST: &str = "github.com";

/// Owner and name of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn html_url(&self) -> String {
        format!("https://{}/{}/{}", GITHUB_HOST, self.owner, self.name)
    }
}

/// Why a repository URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Repository URL is required")]
    Missing,
    #[error("Repository URL is not a valid URL")]
    Malformed,
    #[error("Repository URL must point to github.com")]
    WrongHost,
    #[error("Repository URL must name an owner and a repository")]
    MissingPath,
}

/// Failure to hand a request to the generation service.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("generation service responded with status {0}")]
    Rejected(StatusCode),
    #[error("generation service unreachable: {0}")]
    Network(#[source] reqwest::Error),
}

/// Accept only `http(s)://github.com/{owner}/{repo}[/...]`.
///
/// A trailing `.git` on the repository name is dropped.
pub fn validate_repository_url(input: &str) -> Result<RepositoryRef, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::Missing);
    }

    let url = Url::parse(input).map_err(|_| ValidationError::Malformed)?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ValidationError::Malformed);
    }
    if !url
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(GITHUB_HOST))
    {
        return Err(ValidationError::WrongHost);
    }

    let mut segments = url
        .path_segments()
        .into_iter()
        .flatten()
        .filter(|segment| !segment.is_empty());
    let (Some(owner), Some(name)) = (segments.next(), segments.next()) else {
        return Err(ValidationError::MissingPath);
    };

    let name = name.strip_suffix(".git").unwrap_or(name);
    if name.is_empty() {
        return Err(ValidationError::MissingPath);
    }

    Ok(RepositoryRef {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationRequest<'a> {
    source_url: &'a str,
}

/// Sends generation requests to `{base_url}/generate`.
#[derive(Clone)]
pub struct GenerationDispatcher {
    client: reqwest::Client,
    base_url: String,
}

impl GenerationDispatcher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Validate `repository_url` and post one generation event for it.
    ///
    /// Returns the event id on a 2xx answer. Invalid input never reaches the
    /// network.
    pub async fn dispatch(&self, repository_url: &str) -> Result<Uuid, DispatchError> {
        let repository_url = repository_url.trim();
        validate_repository_url(repository_url)?;

        let event_id = Uuid::new_v4();
        let endpoint = format!("{}/generate", self.base_url);
        tracing::info!(
            "Dispatching generation event {} for {} to {}",
            event_id,
            repository_url,
            endpoint
        );

        let response = self
            .client
            .post(&endpoint)
            .header("ce-specversion", SPEC_VERSION)
            .header("ce-type", EVENT_TYPE)
            .header("ce-source", EVENT_SOURCE)
            .header("ce-id", event_id.to_string())
            .json(&GenerationRequest {
                source_url: repository_url,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Generation service at {} unreachable: {}", endpoint, e);
                DispatchError::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                "Generation service rejected event {}: {}",
                event_id,
                status
            );
            return Err(DispatchError::Rejected(status));
        }

        tracing::info!("Generation event {} accepted", event_id);
        Ok(event_id)
    }
}
