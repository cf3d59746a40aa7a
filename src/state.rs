//! Application state
//!
//! Holds the server configuration and the HTTP client used for probing.
//! Recordings share nothing else: each request owns its own transcode
//! session.

use reqwest::Client;

use crate::config::ServerConfig;
use crate::error::Result;

/// User agent for outbound probe requests
const USER_AGENT: &str = concat!("stream-recorder/", env!("CARGO_PKG_VERSION"));

/// Shared, read-only application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Client for upstream playlist probes. Keeps no idle connections.
    pub http_client: Client,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.probe.timeout())
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }
}
