use anyhow::Context;
use library_api::{
    adapters::postgres::{
        PostgresAuthorRepository, PostgresBookRepository, PostgresDatabaseProbe,
        PostgresLoanRepository, PostgresMemberRepository,
    },
    api::{AppState, create_router},
    application::{catalog::CatalogDependencies, loan::ServiceDependencies},
    config::AppConfig,
    lifecycle::{self, Lifecycle},
    observability,
};
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started_at = Instant::now();

    // .env は存在しなくてもよい
    dotenvy::dotenv().ok();
    let config = Arc::new(AppConfig::from_env().context("Invalid configuration")?);

    observability::init_tracing(&config);
    tracing::info!(
        environment = config.environment.as_str(),
        "Starting library-api"
    );

    // データベース接続とマイグレーション（失敗した場合は起動しない）
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    // Initialize adapters
    let loan_repository = Arc::new(PostgresLoanRepository::new(pool.clone()));
    let catalog = CatalogDependencies {
        authors: Arc::new(PostgresAuthorRepository::new(pool.clone())),
        books: Arc::new(PostgresBookRepository::new(pool.clone())),
        members: Arc::new(PostgresMemberRepository::new(pool.clone())),
    };

    let app_state = Arc::new(AppState {
        loans: ServiceDependencies { loan_repository },
        catalog,
        probe: Arc::new(PostgresDatabaseProbe::new(pool.clone())),
        config: Arc::clone(&config),
        started_at,
    });

    let app = create_router(app_state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    tracing::info!("Server listening on {}", addr);

    let lifecycle = Lifecycle::new();
    lifecycle::spawn_signal_listener(lifecycle.clone(), config.shutdown_timeout);

    // Draining に遷移すると新規接続の受付を止め、処理中のリクエストの完了を待つ
    let shutdown = {
        let lifecycle = lifecycle.clone();
        async move { lifecycle.draining().await }
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    tracing::info!("HTTP server stopped, closing database pool");
    pool.close().await;
    lifecycle.mark_stopped();
    tracing::info!("Shutdown complete");

    Ok(())
}
