//! Edgesub - proxy subscription aggregator.
//!
//! Runs the HTTP server that aggregates CDN-fronted endpoints into proxy
//! subscriptions and serves the latency probe routes.

use std::panic;

use anyhow::Context;
use clap::Parser;
use edgesub_app::Args;
use edgesub_server::{AppState, Server};
use edgesub_sources::{build_source_set, Prober};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging, with file rotation when a log directory is given.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("edgesub={},warn", args.effective_log_level()))
    });

    if let Some(log_dir) = &args.log_dir {
        let file_appender = std::fs::create_dir_all(log_dir).ok().and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("edgesub")
                .filename_suffix("log")
                .build(log_dir)
                .ok()
        });

        if let Some(appender) = file_appender {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stdout))
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();

            tracing::info!("Logging to {:?}", log_dir);
            return Some(guard);
        }

        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        tracing::warn!("File logging unavailable in {:?}, using console only", log_dir);
        return None;
    }

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    None
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&args);

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        tracing::error!("PANIC: {}", panic_info);
        default_hook(panic_info);
    }));

    tracing::info!("Starting edgesub...");
    tracing::debug!("Args: {:?}", args);

    let sources = build_source_set(&args.sources_config()).context("building endpoint sources")?;
    let prober = Prober::new().context("building latency prober")?;
    let server = Server::new(args.server_config(), AppState::new(sources, prober))?;

    server.run(shutdown_signal()).await?;

    tracing::info!("edgesub shutting down");
    Ok(())
}
