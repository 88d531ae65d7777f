//! Inkpad - a small server-rendered notebook

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkpad::{
    cache::create_cache,
    config::Config,
    db,
    services::UserService,
    theme::ThemeEngine,
    web::{self, AppState},
};

const CONFIG_ENV: &str = "INKPAD_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpad=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Inkpad...");

    // Load configuration
    let config_path = std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load_with_env(&config_path)?;
    config.validate()?;
    tracing::info!("Configuration loaded from {}", config_path.display());

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    let cache = create_cache(&config.cache);
    tracing::info!("Cache initialized: {:?}", config.cache.driver);

    let theme = ThemeEngine::new(config.theme.path.as_deref())?;
    if !theme.overridden().is_empty() {
        tracing::info!("Theme overrides: {}", theme.overridden().join(", "));
    }

    let admin = config.admin.clone();
    let purge_interval = config.session.purge_interval_secs;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(pool, config, cache, theme);

    if let Some(admin) = admin {
        let user = state.user_service.ensure_admin(&admin.email, &admin.password).await?;
        tracing::info!("Administrator account ready: {}", user.email);
    }

    if purge_interval > 0 {
        spawn_session_purge(state.user_service.clone(), Duration::from_secs(purge_interval));
    }

    let request_stats = state.request_stats.clone();

    // Build router
    let app = web::build_router(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down: {}", request_stats.summary());

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Delete expired sessions every `interval`
fn spawn_session_purge(user_service: Arc<UserService>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match user_service.cleanup_expired_sessions().await {
                Ok(0) => {}
                Ok(count) => tracing::info!("Purged {} expired sessions", count),
                Err(e) => tracing::warn!("Session purge failed: {}", e),
            }
        }
    });
}
