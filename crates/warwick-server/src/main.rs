mod config;

use std::sync::Arc;

use tracing::info;

use warwick_db::ConfigStore;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warwick=info,warwick_db=info,warwick_x=info".into()),
        )
        .init();

    let config = Config::from_env();

    // Init config store. Dropping the last handle also releases it, so an early
    // return below still closes the database.
    let db_path = config.db_path.clone();
    let store = Arc::new(tokio::task::spawn_blocking(move || ConfigStore::open(&db_path)).await??);
    info!("Using '{}' as database", store.path().display());

    shutdown_signal().await?;

    let closing = store.clone();
    tokio::task::spawn_blocking(move || closing.close()).await??;

    Ok(())
}

async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await?;
        info!("Received Ctrl+C, shutting down...");
    }
    Ok(())
}
