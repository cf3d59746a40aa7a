//! Stream Recorder
//!
//! An HTTP gateway that records live audio streams (typically HLS) by
//! running ffmpeg in stream-copy mode and relaying its output to the client
//! as a file download, without touching the disk.

mod config;
mod config_file;
mod error;
mod format;
mod http;
mod probe;
mod state;
mod transcode;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::error::{RecorderError, Result};
use crate::http::create_router;
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "stream-recorder";

/// Live stream recording gateway.
#[derive(Parser, Debug, Clone)]
#[command(name = "stream-recorder")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(default_value = "config.toml")]
    config: PathBuf,

    /// Port to listen on (overrides the configuration file).
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind to (overrides the configuration file).
    #[arg(long)]
    host: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration before logging so the log level can come from it
    let loaded = config_file::load_server_config(&args.config);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => ServerConfig::default(),
    };
    args.apply(&mut config);

    init_logging(&config);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Err(e) = &loaded {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            args.config.display(),
            e
        );
    }
    tracing::info!("Configuration loaded: {:?}", config);

    let state = Arc::new(AppState::new(config.clone())?);
    let app = create_router(state);

    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| RecorderError::Config(format!("invalid listen address: {}", e)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server running on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize logging with tracing
fn init_logging(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "stream_recorder={0},tower_http={0}",
            config.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
