//! ffmpeg invocation
//!
//! Builds the stream-copy command line and interprets how the process ended.

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::FfmpegConfig;
use crate::format::OutputFormat;

/// Signal number of SIGKILL
#[cfg(unix)]
const SIGKILL: i32 = 9;

/// Number of stderr lines kept for error reports
const STDERR_TAIL_LINES: usize = 5;

/// Stream-copy invocation: remote input, audio only, muxed to stdout
#[derive(Debug, Clone)]
pub struct TranscodeCommand<'a> {
    config: &'a FfmpegConfig,
    input: &'a str,
    format: &'a OutputFormat,
}

impl<'a> TranscodeCommand<'a> {
    pub fn new(config: &'a FfmpegConfig, input: &'a str, format: &'a OutputFormat) -> Self {
        Self {
            config,
            input,
            format,
        }
    }

    /// Command line arguments, without the program name
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-loglevel".into(),
            self.config.log_level.clone(),
            "-i".into(),
            self.input.to_string(),
            "-vn".into(),
            "-acodec".into(),
            "copy".into(),
        ];
        if self.format.is_fragmented_mp4() {
            // The MP4 muxer seeks back to write `moov` unless fragmented.
            args.push("-movflags".into());
            args.push("frag_keyframe+empty_moov".into());
        }
        args.push("-f".into());
        args.push(self.format.muxer().to_string());
        args.push("pipe:1".into());
        args
    }

    /// Command with stdout and stderr piped
    pub fn build(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

/// How the subprocess ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
    Success,
    /// Terminated by SIGKILL; treated as a user stop
    Killed,
    Failed(String),
}

/// Classify an exit status.
pub fn classify_exit(status: ExitStatus) -> ExitKind {
    if status.success() {
        return ExitKind::Success;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if status.signal() == Some(SIGKILL) {
            return ExitKind::Killed;
        }
    }
    ExitKind::Failed(format!("ffmpeg exited with {}", status))
}

/// Drain ffmpeg's stderr into the log, keeping the last few lines.
///
/// The task resolves once stderr closes, with the kept lines joined.
pub fn spawn_stderr_drain(stderr: ChildStderr, session_id: Uuid) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    tracing::debug!("[{}] ffmpeg: {}", session_id, line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("[{}] ffmpeg stderr read error: {}", session_id, e);
                    break;
                }
            }
        }
        Vec::from(tail).join(" | ")
    })
}
