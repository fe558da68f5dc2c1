use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notabene::api::{create_router, AppState};
use notabene::config::Config;
use notabene::db::{ChatStore, Database, LibSqlBackend};
use notabene::embeddings::EmbeddingApiClient;
use notabene::llm::ChatApiClient;

#[derive(Parser)]
#[command(name = "notabene")]
#[command(about = "Self-hostable AI study companion with grounded, source-aware chat")]
struct Args {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notabene=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    tracing::info!("Initializing database...");
    let database = Database::new(&config.database).await?;
    let store: Arc<dyn ChatStore> = Arc::new(LibSqlBackend::new(database));

    tracing::info!("Initializing embedding provider: {}...", config.embeddings.model);
    let embedder = Arc::new(EmbeddingApiClient::new(&config.embeddings)?);

    tracing::info!("Initializing chat provider: {}...", config.chat.model);
    let model = Arc::new(ChatApiClient::new(&config.chat)?);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, store, embedder, model);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "Failed to install shutdown signal handler");
    }
    tracing::info!("Shutting down");
}
