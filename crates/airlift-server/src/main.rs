//! airlift server entrypoint: environment configuration, tracing setup,
//! and the serve loop.

use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use airlift_axum::{ServerConfig, start_server};
use airlift_cloudinary::CloudinaryConfig;

/// Read one optional environment variable, treating empty as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Assemble the server configuration from the environment.
fn config_from_env() -> Result<ServerConfig> {
    let port = match env_opt("PORT") {
        Some(text) => text
            .parse::<u16>()
            .map_err(|_| anyhow::anyhow!("PORT must be a port number, got '{text}'"))?,
        None => 3000,
    };

    Ok(ServerConfig {
        port,
        hostname: env_opt("PUBLIC_HOSTNAME"),
        database_url: env_opt("DATABASE_URL"),
        cloudinary: CloudinaryConfig::from_parts(
            env_opt("CLOUDINARY_CLOUD_NAME"),
            env_opt("CLOUDINARY_API_KEY"),
            env_opt("CLOUDINARY_API_SECRET"),
        ),
        admin_secret: env_opt("ADMIN_SECRET").unwrap_or_default(),
        private_key_path: env_opt("PRIVATE_KEY_PATH").map(PathBuf::from),
        updates_dir: env_opt("UPDATES_DIR")
            .map_or_else(|| PathBuf::from("./updates"), PathBuf::from),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config_from_env()?;
    tracing::info!(port = config.port, "starting airlift update server");

    start_server(config).await
}
