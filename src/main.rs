// src/main.rs

use session_gate::infra::{config::ServerConfig, logging};
use session_gate::transport;
use session_gate::{
    MemorySessionStore, PostgresSessionStore, SessionPolicy, SessionService, SessionStore,
    SessionSweeper,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let config = ServerConfig::from_env()?;

    // --- Session Store Initialization ---
    let store: Arc<dyn SessionStore> = match &config.database_url {
        Some(url) => {
            info!("connecting to PostgreSQL session store");
            Arc::new(PostgresSessionStore::connect(url).await?)
        }
        None => {
            warn!("DATABASE_URL not set; sessions are kept in memory and lost on restart");
            Arc::new(MemorySessionStore::new())
        }
    };

    // --- Service Initialization ---
    let policy = SessionPolicy::from_secs(config.access_token_ttl_secs, config.refresh_token_ttl_secs);
    let sessions = Arc::new(SessionService::new(store.clone(), policy));
    info!(
        access_ttl_secs = config.access_token_ttl_secs,
        refresh_ttl_secs = config.refresh_token_ttl_secs,
        "session service initialized"
    );

    let sweeper = Arc::new(SessionSweeper::new(
        store,
        std::time::Duration::from_secs(config.sweep_interval_secs),
    ));
    let sweeper_task = sweeper.clone().start();
    info!(every_secs = config.sweep_interval_secs, "session sweeper started");

    let app_state = transport::http::AppState {
        sessions,
        cookies: transport::http::CookiePolicy {
            secure: config.cookie_secure,
        },
    };

    // --- API Server Initialization ---
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "API server listening");
    info!("Swagger UI available at /swagger-ui");

    let shutdown_sweeper = sweeper.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown signal received");
        })
        .await;

    shutdown_sweeper.shutdown();
    if let Err(e) = sweeper_task.await {
        error!(error = %e, "session sweeper task ended abnormally");
    }
    info!("graceful shutdown complete");

    result?;
    Ok(())
}
