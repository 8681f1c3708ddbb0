use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fleetd::config::ServerConfig;

/// Coordination server for a fleet of AI coding agents.
#[derive(Parser, Debug)]
#[command(name = "fleetd", version, about)]
struct Cli {
    /// Directory to look for config.toml in.
    #[arg(long, env = "FLEETD_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Override the bind address.
    #[arg(long, env = "FLEETD_BIND_ADDR")]
    bind_addr: Option<String>,

    /// Override the sqlite database path.
    #[arg(long, env = "FLEETD_DB_PATH")]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = ServerConfig::load(cli.config_dir.as_deref())?;
    if let Some(bind_addr) = cli.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(db_path) = cli.db_path {
        config.db_path = db_path;
    }

    // When a log directory is configured, fan tracing output out to a
    // non-blocking rolling file writer in addition to stdout; the guard
    // must outlive `main` or buffered lines are dropped on exit.
    let _log_guard = match &config.log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "fleetd.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                .with_writer(non_blocking)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                .init();
            None
        }
    };

    if fleetd::config::running_in_ci() {
        tracing::info!("running under CI");
    }

    let bind_addr = config.bind_addr.clone();
    let (router, sessions) = fleetd::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "fleetd listening");

    let shutdown = sessions.shutdown_handle();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
