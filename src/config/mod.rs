//! Configuration module for the Waver site backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Which blob store implementation backs the tutorial bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// A directory on disk acts as the bucket; keys are relative paths.
    Fs,
    /// A single SQLite table of key/body rows.
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs" | "filesystem" => Ok(StoreBackend::Fs),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

impl StoreBackend {
    fn default_path(&self) -> &'static str {
        match self {
            StoreBackend::Fs => "./data/waver-bucket",
            StoreBackend::Sqlite => "./data/blobs.sqlite",
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key guarding the generation and preview endpoints
    pub api_psk: Option<String>,
    /// Blob store implementation
    pub store_backend: StoreBackend,
    /// Bucket directory or SQLite file, depending on the backend
    pub store_path: PathBuf,
    /// Base URL of the tutorial generation service (receives `/generate`)
    pub generation_service_url: String,
    /// Base URL of the GitHub REST API
    pub github_api_url: String,
    /// Optional GitHub token for higher rate limits
    pub github_token: Option<String>,
    /// Kroki-compatible diagram renderer; when unset diagrams render client-side
    pub diagram_renderer_url: Option<String>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = non_empty_var("WAVER_API_PSK");

        let store_backend = env::var("WAVER_STORE_BACKEND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(StoreBackend::Fs);

        let store_path = env::var("WAVER_STORE_PATH")
            .unwrap_or_else(|_| store_backend.default_path().to_string())
            .into();

        let generation_service_url = env::var("WAVER_GENERATION_SERVICE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let github_api_url = env::var("WAVER_GITHUB_API_URL")
            .unwrap_or_else(|_| "https://api.github.com".to_string());

        let github_token = non_empty_var("WAVER_GITHUB_TOKEN");

        let diagram_renderer_url = non_empty_var("WAVER_DIAGRAM_RENDERER_URL");

        let bind_addr = env::var("WAVER_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .expect("Invalid WAVER_BIND_ADDR format");

        let log_level = env::var("WAVER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            api_psk,
            store_backend,
            store_path,
            generation_service_url,
            github_api_url,
            github_token,
            diagram_renderer_url,
            bind_addr,
            log_level,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
