//! # Server Setup
//!
//! Server initialization, route registration, and HTTP server startup.
//!
//! This module provides the main server setup function that loads configuration,
//! opens the message store, builds the conversation pipeline, registers routes,
//! applies middleware, and starts the HTTP server.

// region: --- Imports
use axum::{routing::{get, post}, Router};
use lib_core::model::store::run_migrations;
use lib_core::{AiBackend, ChatStore, Config, SqliteChatStore, create_pool};
use crate::chat::{CompletionService, ConversationPipeline, OpenRouterClient, PipelineSettings};
use crate::handlers;
use crate::middleware::{log_requests, stamp_req, RequestStamp};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;
// endregion: --- Imports

// region: --- AppState
/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<ConversationPipeline>,
}

impl axum::extract::FromRef<AppState> for Arc<ConversationPipeline> {
    fn from_ref(state: &AppState) -> Self {
        state.pipeline.clone()
    }
}
// endregion: --- AppState

// region: --- Server Configuration
/// Server configuration
#[derive(Clone, Debug, Default)]
pub struct ServerConfig {
    /// Bind address override (e.g., "127.0.0.1:3000"); `HOST`/`PORT` otherwise
    pub bind_address: Option<String>,
    /// Allowed CORS origins; empty allows any origin
    pub allowed_origins: Vec<String>,
}
// endregion: --- Server Configuration

// region: --- Server Setup
/// Initialize and start the HTTP server
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Returns
///
/// Returns `Ok(())` when the server shuts down, or an error if initialization fails.
///
/// # Errors
///
/// This function will return an error if:
/// - Configuration loading fails
/// - Database connection fails
/// - Database migrations fail
/// - The completion backend cannot be built
/// - Server binding fails
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    info!(" CHAT RELAY STARTING");

    info!("Loading configuration...");
    let app_config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    app_config.validate().map_err(|e| anyhow::anyhow!(e))?;

    info!("Database URL: {}", app_config.database_url);

    // Ensure data directory exists for SQLite database
    if let Some(db_path) = sqlite_file_path(&app_config.database_url) {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                info!("Created database directory: {:?}", parent);
            }
        }
        info!("Database file will be at: {}", db_path);
    }

    info!("Connecting to database...");
    let pool = create_pool(&app_config.database_url).await?;

    info!(" Running database migrations");
    run_migrations(&pool).await?;
    info!(" Migrations complete");

    let store: Arc<dyn ChatStore> = Arc::new(SqliteChatStore::new(pool));

    info!(
        backend = %app_config.ai_backend,
        model = %app_config.ai_model,
        "Initializing completion backend..."
    );
    if app_config.openrouter_api_key.is_none() {
        tracing::warn!("OPENROUTER_API_KEY is not set; completion requests are sent unauthenticated");
    }
    let completion = build_completion(&app_config)?;

    let pipeline = Arc::new(ConversationPipeline::new(
        store,
        completion,
        PipelineSettings::from(&app_config),
    ));

    let bind_address = config
        .bind_address
        .clone()
        .unwrap_or_else(|| app_config.bind_address());

    let state = AppState {
        config: app_config,
        pipeline,
    };

    // Create router
    let app = create_router(state, &config.allowed_origins);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!(" SERVER READY: http://{}", bind_address);
    log_server_info();

    // ConnectInfo is needed by the websocket handler for client addresses
    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await?;
    Ok(())
}

/// Configure the global tracing subscriber from `LOG_LEVEL`.
fn init_tracing() -> anyhow::Result<()> {
    let log_level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();

    let filter = match log_level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => tracing_subscriber::EnvFilter::new(&log_level),
        _ => tracing_subscriber::EnvFilter::new("info"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    info!(" Log level: {}", log_level);
    Ok(())
}

/// Select the completion backend named by `AI_BACKEND`.
pub fn build_completion(config: &Config) -> anyhow::Result<Arc<dyn CompletionService>> {
    match config.ai_backend {
        AiBackend::OpenRouter => Ok(Arc::new(OpenRouterClient::from_config(config)?)),
        #[cfg(feature = "genai")]
        AiBackend::GenAi => Ok(Arc::new(crate::chat::GenAiCompletion::from_config(config))),
        #[cfg(not(feature = "genai"))]
        AiBackend::GenAi => Err(anyhow::anyhow!(
            "AI_BACKEND=genai requires lib-web to be built with the 'genai' feature"
        )),
    }
}

/// File path of a file-backed SQLite URL, `None` for in-memory databases.
fn sqlite_file_path(database_url: &str) -> Option<&str> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}

/// Create the main application router with all routes
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    use axum::http::{HeaderValue, Method};

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };

    let static_dir = PathBuf::from(&state.config.static_dir);
    let chat_page = static_dir.join("chat.html");

    info!("[ROUTE SETUP] Registering HTTP routes...");
    Router::new()
        .route("/ws", get(handlers::websocket::chat_websocket))
        .route("/delete-chat", post(handlers::chat::delete_chat))
        .route("/health", get(|| async { "OK" }))
        .route_service("/", ServeFile::new(chat_page))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        // Layers run outermost-last: cors, stamp, logging, then the trace span
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .extensions()
                        .get::<RequestStamp>()
                        .map(|s| s.id.clone())
                        .unwrap_or_else(|| "unknown".to_string());
                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_failure(|error: tower_http::classify::ServerErrorsFailureClass, latency: std::time::Duration, span: &tracing::Span| {
                    let _enter = span.enter();
                    tracing::error!(
                        error = ?error,
                        latency_ms = latency.as_millis(),
                        "[HTTP FAILURE] Error: {:?}, Latency: {}ms",
                        error,
                        latency.as_millis()
                    );
                })
        )
        // Request/response logging
        .layer(axum::middleware::from_fn(log_requests))
        // Request stamping, so the layers above see the request ID
        .layer(axum::middleware::from_fn(stamp_req))
        .layer(cors)
}

/// Log server information
fn log_server_info() {
    info!(" CHAT:");
    info!("   • GET  /          (chat page)");
    info!("   • GET  /ws        (websocket: assignUsername, chatHistory, sendMessage, newChat, ...)");
    info!(" ADMIN:");
    info!("   • POST /delete-chat");
    info!(" HEALTH:");
    info!("   • GET  /health");
}
// endregion: --- Server Setup
