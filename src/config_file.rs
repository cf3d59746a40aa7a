//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{FfmpegConfig, ProbeConfig, ServerConfig};
use crate::error::{RecorderError, Result};

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: Option<ServerSettings>,
    /// Transcoder settings
    pub ffmpeg: Option<FfmpegSettings>,
    /// Probe settings
    pub probe: Option<ProbeSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: Option<String>,
    /// Port to listen on
    pub port: Option<u16>,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegSettings {
    /// ffmpeg executable
    pub binary: Option<String>,
    /// ffmpeg `-loglevel`
    pub log_level: Option<String>,
    /// Pipe read size in bytes
    pub read_chunk_size: Option<usize>,
    /// Buffered chunks per recording
    pub channel_capacity: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Byte budget for codec detection
    pub max_bytes: Option<usize>,
    /// Probe request timeout in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RecorderError::Config(e.to_string()))
    }

    /// Convert to ServerConfig, filling gaps with defaults
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let ffmpeg_defaults = FfmpegConfig::default();
        let probe_defaults = ProbeConfig::default();

        let server = self.server;
        let ffmpeg = self.ffmpeg;
        let probe = self.probe;

        ServerConfig {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(defaults.host),
            port: server.as_ref().and_then(|s| s.port).unwrap_or(defaults.port),
            cors_enabled: server
                .as_ref()
                .and_then(|s| s.cors_enabled)
                .unwrap_or(defaults.cors_enabled),
            log_level: self
                .logging
                .as_ref()
                .map(|l| l.level.clone())
                .unwrap_or(defaults.log_level),
            log_format: self
                .logging
                .and_then(|l| l.format)
                .unwrap_or(defaults.log_format),
            ffmpeg: FfmpegConfig {
                binary: ffmpeg
                    .as_ref()
                    .and_then(|f| f.binary.clone())
                    .unwrap_or(ffmpeg_defaults.binary),
                log_level: ffmpeg
                    .as_ref()
                    .and_then(|f| f.log_level.clone())
                    .unwrap_or(ffmpeg_defaults.log_level),
                read_chunk_size: ffmpeg
                    .as_ref()
                    .and_then(|f| f.read_chunk_size)
                    .unwrap_or(ffmpeg_defaults.read_chunk_size),
                channel_capacity: ffmpeg
                    .as_ref()
                    .and_then(|f| f.channel_capacity)
                    .unwrap_or(ffmpeg_defaults.channel_capacity),
            },
            probe: ProbeConfig {
                max_bytes: probe
                    .as_ref()
                    .and_then(|p| p.max_bytes)
                    .unwrap_or(probe_defaults.max_bytes),
                timeout_secs: probe
                    .as_ref()
                    .and_then(|p| p.timeout_secs)
                    .unwrap_or(probe_defaults.timeout_secs),
            },
        }
    }
}

/// Load the server configuration from `path`.
///
/// A missing file yields the defaults; a file that cannot be read or parsed
/// is reported to the caller.
pub fn load_server_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ServerConfig::default());
    }
    Ok(ConfigFile::from_file(path)?.into_server_config())
}
