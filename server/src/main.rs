use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use birthday_reminder::backend::config::ServiceConfig;
use birthday_reminder::backend::storage::CsvConnection;
use birthday_reminder::backend::{create_router, initialize_backend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; also picks up records from the `log` macros
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let connection = CsvConnection::new_default()?;
    let config = ServiceConfig::load(&connection.config_file_path())?;

    let backend = initialize_backend(&config, connection)?;
    let app_state = backend.start();
    let app = create_router(app_state);

    info!("🎂 Starting birthday reminder service on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
