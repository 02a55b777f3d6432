use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod select;
mod validate;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: config::AppConfig,
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent — env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotely=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting Quotely on {}:{}", config.host, config.port);

    // Open SQLite connection pool
    // CREATE the file if it doesn't exist yet
    let db = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(
            config
                .database_url
                .parse::<sqlx::sqlite::SqliteConnectOptions>()?
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .foreign_keys(true),
        )
        .await?;

    // Run embedded migrations (files in migrations/)
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database migrations applied");

    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState { db, config });

    // ── Router ─────────────────────────────────────────────────────────────
    let app = Router::new()
        // Random quote page
        .route("/", get(handlers::pages::random_quote))
        // Health check — returns 200 OK with no auth required
        .route("/health", get(|| async { axum::http::StatusCode::OK }))
        // Ranked listing
        .route("/top", get(handlers::pages::top_quotes))
        // Submissions
        .route(
            "/add",
            get(handlers::submit::add_quote_page).post(handlers::submit::add_quote),
        )
        .route(
            "/source/add",
            get(handlers::submit::add_source_page).post(handlers::submit::add_source),
        )
        // Voting
        .route("/vote/:id/:action", post(handlers::pages::vote))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // ── Serve ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
