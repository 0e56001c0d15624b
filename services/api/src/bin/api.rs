//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{kv_store::database_dir, GeminiEvaluationAdapter, SqliteKvStore},
    config::Config,
    error::ApiError,
    web::{
        close_tab_handler, create_tab_handler,
        rest::ApiDoc,
        state::{spawn_tab_sweeper, AppState, TabRegistry},
        ws_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{delete, get, post},
    Router,
};
use evaluator_core::{CredentialStore, Evaluator};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const TAB_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    if let Some(dir) = database_dir(&config.database_url) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let kv_store = Arc::new(SqliteKvStore::new(db_pool));
    info!("Running database migrations...");
    kv_store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    if config.gemini_api_key.is_none() {
        info!("GEMINI_API_KEY is not set; evaluations will report a configuration error.");
    }
    let http_client = reqwest::Client::builder()
        .timeout(config.gemini_timeout)
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let evaluation_adapter = Arc::new(GeminiEvaluationAdapter::new(
        http_client,
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let tabs = Arc::new(TabRegistry::new());
    let app_state = Arc::new(AppState {
        config: config.clone(),
        credentials: Arc::new(CredentialStore::new(kv_store)),
        evaluator: Evaluator::new(evaluation_adapter),
        tabs: tabs.clone(),
    });

    // Tabs whose browser went away without closing them expire after the idle timeout.
    let sweeper_shutdown = CancellationToken::new();
    let sweeper = spawn_tab_sweeper(
        tabs,
        config.tab_idle_timeout,
        TAB_SWEEP_INTERVAL,
        sweeper_shutdown.clone(),
    );

    // --- 5. Configure CORS ---
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    let api_router = Router::new()
        .route("/tabs", post(create_tab_handler))
        .route("/tabs/{tab_id}", delete(close_tab_handler))
        .route("/ws", get(ws_handler))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let served = axum::serve(listener, app).await;

    sweeper_shutdown.cancel();
    if let Err(e) = sweeper.await {
        error!("Tab sweeper failed: {}", e);
    }
    served?;

    Ok(())
}
