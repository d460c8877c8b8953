//! Waver Site Backend
//!
//! Serves pre-generated, markdown-based tutorials out of a blob store, renders
//! their diagrams, and forwards new generation requests to the Waver
//! generation service.

mod api;
mod auth;
mod catalog;
mod config;
mod dispatcher;
mod errors;
mod github;
mod loader;
mod markdown;
mod models;
mod storage;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, StoreBackend};
use dispatcher::GenerationDispatcher;
use errors::AppError;
use github::GitHubClient;
use loader::TutorialLoader;
use markdown::{DiagramRenderer, KrokiLoader};
use storage::{BlobStore, FsBlobStore, SqliteBlobStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub loader: TutorialLoader,
    pub dispatcher: GenerationDispatcher,
    pub github: GitHubClient,
    /// Server-side diagram rendering, when an engine is configured
    pub diagrams: Option<Arc<DiagramRenderer>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire every service from configuration.
    pub async fn from_config(config: Config) -> Result<Self, AppError> {
        let store = open_store(&config).await?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let diagrams = config.diagram_renderer_url.as_ref().map(|url| {
            Arc::new(DiagramRenderer::new(Arc::new(KrokiLoader::new(
                http.clone(),
                url.clone(),
            ))))
        });

        Ok(Self {
            loader: TutorialLoader::new(store),
            dispatcher: GenerationDispatcher::new(http.clone(), &config.generation_service_url),
            github: GitHubClient::new(http, &config.github_api_url, config.github_token.clone()),
            diagrams,
            config: Arc::new(config),
        })
    }
}

async fn open_store(config: &Config) -> Result<Arc<dyn BlobStore>, AppError> {
    let store: Arc<dyn BlobStore> = match config.store_backend {
        StoreBackend::Fs => Arc::new(FsBlobStore::open(&config.store_path).await?),
        StoreBackend::Sqlite => Arc::new(SqliteBlobStore::open(&config.store_path).await?),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Waver Site Backend");
    tracing::info!(
        "Blob store: {:?} at {:?}",
        config.store_backend,
        config.store_path
    );
    tracing::info!("Generation service: {}", config.generation_service_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!(
            "No API PSK configured (WAVER_API_PSK). Generation and preview endpoints are open!"
        );
    }
    match &config.diagram_renderer_url {
        Some(url) => tracing::info!("Diagram renderer: {}", url),
        None => tracing::info!("No diagram renderer configured; diagrams render in the browser"),
    }

    let bind_addr = config.bind_addr;
    let state = AppState::from_config(config).await?;

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    // Routes that call out to the generation service or GitHub
    let guarded_routes = Router::new()
        .route("/generate-tutorial", post(api::generate_tutorial))
        .route("/preview", get(api::preview_tutorial))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    let api_routes = Router::new()
        .route("/home", get(api::get_home))
        .route("/tutorials", get(api::list_tutorials))
        .route("/tutorials/{slug}", get(api::get_tutorial))
        .route("/tutorials/{slug}/chapters/{chapter}", get(api::get_chapter))
        .route("/tags", get(api::list_tags))
        .merge(guarded_routes);

    let page_routes = Router::new()
        .route("/tutorial/{slug}", get(api::tutorial_page))
        .route("/tutorial/{slug}/chapter/{chapter}", get(api::chapter_page));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(page_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
