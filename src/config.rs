//! Environment-driven configuration and logging setup.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// Deployment settings for the hosted gateway plus the local session file.
/// Everything has a default so the crate runs against a local stand-in.
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway_url: String,
    pub api_key: String,
    pub media_bucket: String,
    pub session_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let gateway_url = std::env::var("POKEVOTE_GATEWAY_URL")
            .unwrap_or_else(|_| "http://localhost:54321".to_string());
        let api_key = std::env::var("POKEVOTE_API_KEY").unwrap_or_default();
        let media_bucket =
            std::env::var("POKEVOTE_MEDIA_BUCKET").unwrap_or_else(|_| "Images".to_string());
        let session_file = std::env::var("POKEVOTE_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_session_file());
        Self { gateway_url, api_key, media_bucket, session_file }
    }
}

fn default_session_file() -> PathBuf {
    // One record per OS user profile, mirroring the browser's per-profile storage key.
    let base = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    base.join(".pokevote").join("pokemon_vote_user.json")
}

/// Install the fmt subscriber honoring `RUST_LOG`, default `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(target: "pokevote", "logging ready: RUST_LOG='{}'", rust_log);
}
