//! NeuroScan dashboard (nscan-dash) - Main entry point
//!
//! Serves the dashboard page and its JSON API, forwarding uploaded MRI images
//! to a remote Gradio classifier.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use nscan_common::config::load_or_default;
use nscan_dash::classifier::gradio::GradioConnector;
use nscan_dash::config::{ConfigOverrides, DashConfig};
use nscan_dash::{build_router, AppState};

/// Command-line arguments for nscan-dash
#[derive(Parser, Debug)]
#[command(name = "nscan-dash")]
#[command(about = "Brain MRI classification dashboard")]
#[command(version)]
struct Args {
    /// TOML config file (defaults to <config_dir>/neuroscan/nscan-dash.toml)
    #[arg(short, long, env = "NSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, env = "NSCAN_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "NSCAN_PORT")]
    port: Option<u16>,

    /// Base URL of the Gradio classifier
    #[arg(long, env = "NSCAN_CLASSIFIER_URL")]
    classifier_url: Option<String>,

    /// Gradio endpoint name
    #[arg(long, env = "NSCAN_API_NAME")]
    api_name: Option<String>,

    /// Directory for transient upload files
    #[arg(long, env = "NSCAN_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Seconds a session may go unseen before it is discarded
    #[arg(long, env = "NSCAN_SESSION_IDLE_SECS")]
    session_idle_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "NSCAN_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            classifier_url: self.classifier_url.clone(),
            api_name: self.api_name.clone(),
            temp_dir: self.temp_dir.clone(),
            session_idle_secs: self.session_idle_secs,
            log_level: self.log_level.clone(),
        }
    }
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "nscan_dash={0},nscan_common={0},tower_http={0}",
            level
        ))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Filter is swapped once the TOML level is known
    let (filter, filter_handle) =
        reload::Layer::new(filter_for(args.log_level.as_deref().unwrap_or("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let toml_config = load_or_default(args.config.as_deref(), "nscan-dash");
    let config = DashConfig::resolve(args.overrides(), &toml_config);
    filter_handle
        .reload(filter_for(&config.log_level))
        .context("Failed to apply log level")?;

    info!("Starting NeuroScan dashboard on {}:{}", config.host, config.port);
    info!("Classifier: {} ({})", config.classifier_url, config.api_name);
    info!("Transient uploads: {}", config.temp_dir.display());
    info!("Session idle TTL: {}s", config.session_idle_ttl.as_secs());

    let connector = GradioConnector::new(
        &config.classifier_url,
        &config.api_name,
        config.classifier_timeout,
    )
    .context("Failed to build classifier client")?;

    let state = AppState::new(
        Arc::new(connector),
        config.temp_dir.clone(),
        config.max_upload_bytes,
    );
    state.spawn_session_reaper(config.session_idle_ttl);
    let app = build_router(state);

    let addr = config
        .listen_addr()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
