//! # ims-api: Binary Entry Point
//!
//! Parses configuration, initializes tracing and storage, and serves the
//! lifecycle API until SIGINT/SIGTERM.

use anyhow::Context;
use clap::Parser;
use ims_api::config::{LogFormat, ServerArgs};
use ims_api::state::AppState;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    init_tracing(args.log_format);

    let config = args.app_config();
    if config.auth_secret.is_none() {
        tracing::warn!("IMS_AUTH_SECRET not set, authentication disabled; every request runs as the dev admin");
    }

    let db_pool = ims_api::db::init_pool(args.database_url.as_deref())
        .await
        .context("database initialization failed")?;

    let port = config.port;
    let state = AppState::try_with_config(config, db_pool)
        .context("failed to initialize application state")?;
    tracing::info!(backend = state.repo.backend(), "lifecycle repository ready");

    let app = ims_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("IMS lifecycle API listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}
