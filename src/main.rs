use tracing_subscriber::EnvFilter;

use notes_api::config;
use notes_api::server;
use notes_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, IDENTITY_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("notes_api=info,tower_http=info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config().clone();
    tracing::info!("Starting Notes API in {:?} mode", config.environment);

    let state = AppState::from_config(config).await?;
    server::serve(state).await
}
