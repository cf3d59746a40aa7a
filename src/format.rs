//! Output format resolution
//!
//! Decides, once per recording, which ffmpeg muxer the subprocess writes and
//! which `Content-Type` the response advertises.

use std::fmt;
use std::future::Future;

use crate::probe::ProbeResult;

/// Filename used when the caller does not supply one.
///
/// Does not follow the resolved format: AAC recordings are also offered as
/// `recording.mp3`.
pub const DEFAULT_FILENAME: &str = "recording.mp3";

/// Container used when probing is inconclusive
pub const DEFAULT_FORMAT: OutputFormat = OutputFormat::Adts;

/// Output container handed to ffmpeg's `-f`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// MPEG-1 Layer III elementary stream
    Mp3,
    /// Raw AAC in ADTS framing
    Adts,
    /// MP4-family muxer (`mp4`, `ipod`), written fragmented
    Mp4(String),
    /// Any other muxer name, passed through untouched
    Other(String),
}

impl OutputFormat {
    /// Parse an explicitly requested format.
    ///
    /// The user-facing alias `aac` maps to `adts`; every other value is
    /// used verbatim as the muxer name and left to ffmpeg to accept or
    /// reject.
    pub fn from_requested(raw: &str) -> Self {
        match raw {
            "aac" | "adts" => OutputFormat::Adts,
            "mp3" => OutputFormat::Mp3,
            "mp4" | "ipod" => OutputFormat::Mp4(raw.to_string()),
            other => OutputFormat::Other(other.to_string()),
        }
    }

    /// Muxer name for ffmpeg `-f`
    pub fn muxer(&self) -> &str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Adts => "adts",
            OutputFormat::Mp4(name) | OutputFormat::Other(name) => name,
        }
    }

    /// MIME type for the response.
    ///
    /// Everything that is neither MP3 nor MP4-family is labelled AAC, even
    /// for muxers that produce something else.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "audio/mpeg",
            OutputFormat::Mp4(_) => "audio/mp4",
            OutputFormat::Adts | OutputFormat::Other(_) => "audio/aac",
        }
    }

    /// Whether the muxer needs fragmentation flags to write to a pipe
    pub fn is_fragmented_mp4(&self) -> bool {
        matches!(self, OutputFormat::Mp4(_))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.muxer())
    }
}

/// Where a resolved format came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSource {
    Requested,
    Probed,
    Default,
}

/// Result of format resolution for one recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFormat {
    pub format: OutputFormat,
    pub source: FormatSource,
}

impl ResolvedFormat {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Resolve the output format for a recording.
///
/// `probe` runs only when no format was requested (an empty value counts as
/// absent). An inconclusive probe falls back to [`DEFAULT_FORMAT`].
pub async fn resolve_format<F, Fut>(requested: Option<&str>, probe: F) -> ResolvedFormat
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ProbeResult>,
{
    if let Some(raw) = requested.filter(|r| !r.is_empty()) {
        return ResolvedFormat {
            format: OutputFormat::from_requested(raw),
            source: FormatSource::Requested,
        };
    }

    tracing::info!("No format specified, probing stream...");
    match probe().await {
        ProbeResult::Detected(format) => {
            tracing::info!("Probe detected: {}", format);
            ResolvedFormat {
                format,
                source: FormatSource::Probed,
            }
        }
        ProbeResult::Unknown => {
            tracing::info!("Probe failed or inconclusive, defaulting to {}", DEFAULT_FORMAT);
            ResolvedFormat {
                format: DEFAULT_FORMAT,
                source: FormatSource::Default,
            }
        }
    }
}
