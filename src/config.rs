//! Server configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transcoder subprocess configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegConfig {
    /// Path or name of the ffmpeg executable
    pub binary: String,

    /// Value passed to `-loglevel`
    pub log_level: String,

    /// Size of a single read from the subprocess output pipe
    pub read_chunk_size: usize,

    /// Number of chunks buffered between the subprocess and the response
    pub channel_capacity: usize,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            log_level: "error".to_string(),
            read_chunk_size: 16 * 1024,
            channel_capacity: 16,
        }
    }
}

/// Format probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Give up scanning once this many bytes arrived without a match
    pub max_bytes: usize,

    /// Transport timeout for the probe request in seconds
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_bytes: 8192,
            timeout_secs: 10,
        }
    }
}

impl ProbeConfig {
    /// Get the probe timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,

    /// Transcoder configuration
    pub ffmpeg: FfmpegConfig,

    /// Probe configuration
    pub probe: ProbeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_enabled: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            ffmpeg: FfmpegConfig::default(),
            probe: ProbeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether logs should be emitted as JSON
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
