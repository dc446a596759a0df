use std::path::PathBuf;

use cleanops_api::crypto::DataKey;
use cleanops_server::{AppConfig, AppState, app, storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cleanops_server=info,tower_http=info".into()),
        )
        .init();

    // Data directory
    let data_dir = std::env::var("CLEANOPS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));

    tracing::info!("data directory: {}", data_dir.display());

    // Initialize database
    let db = storage::init_db(&data_dir)?;
    tracing::info!("database initialized");

    let base_url = std::env::var("BASE_URL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "http://localhost:3000".into());

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET not set; every authenticated endpoint will answer 401");
    }

    let data_key = match std::env::var("ENCRYPTION_KEY").ok().filter(|s| !s.is_empty()) {
        Some(raw) => DataKey::derive(&raw),
        None => {
            tracing::warn!(
                "ENCRYPTION_KEY not set; sensitive data sealed by this process cannot be read after a restart"
            );
            DataKey::random()?
        }
    };

    let config = AppConfig {
        base_url: base_url.clone(),
        jwt_secret,
        data_key,
    };

    let web_dir = std::env::var("CLEANOPS_WEB_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("web/build"));

    let app = app(AppState { db, config }, Some(&web_dir));

    tracing::info!("starting server at {base_url}");

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
