use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

use server::auth::JwtAuthResolver;
use server::config;
use server::db::{self, PgGameStore};
use server::routes;
use server::session::SessionCoordinator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env();

    tracing::info!("Connecting to database...");
    let pool = db::pool::create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Running migrations...");
    db::pool::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let coordinator = Arc::new(SessionCoordinator::new(
        Arc::new(JwtAuthResolver::new(config.jwt_secret.clone())),
        Arc::new(PgGameStore::new(pool)),
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/ws", get(routes::ws::ws_handler))
        .layer(Extension(coordinator))
        .layer(cors);

    let addr = config.bind_addr();
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
