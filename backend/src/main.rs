//! # Chat Relay Service
//!
//! Thin entry point that delegates to lib-web for server setup.
//!
//! Listens on `HOST:PORT` (default `0.0.0.0:3000`). `CORS_ORIGINS` may hold a
//! comma-separated list of allowed origins; without it any origin is allowed.

use lib_web::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let allowed_origins = std::env::var("CORS_ORIGINS")
        .map(|origins| {
            origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let config = ServerConfig {
        allowed_origins,
        ..Default::default()
    };

    start_server(config).await
}
