//! Live transcode proxy
//!
//! Runs ffmpeg in stream-copy mode against a remote stream and exposes its
//! output as a response body stream:
//! - `session`: lifecycle state machine owning the child process
//! - `command`: command line construction and exit classification
//! - `relay`: stdout-to-body relay with disconnect handling

pub mod command;
pub mod relay;
pub mod session;

use bytes::{Bytes, BytesMut};
use std::io;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::FfmpegConfig;
use crate::error::{RecorderError, Result};
use crate::format::OutputFormat;
use command::{spawn_stderr_drain, TranscodeCommand};
use relay::{Outcome, Relay};
use session::TranscodeSession;

#[cfg(test)]
pub use session::SessionState;

/// Response body fed by a running transcode
pub type BodyStream = ReceiverStream<io::Result<Bytes>>;

/// A launched transcode whose output has not been committed to a response
pub struct TranscodeProxy {
    relay: Relay,
    channel_capacity: usize,
}

impl TranscodeProxy {
    /// Spawn ffmpeg for `url`, muxing to `format`.
    pub fn launch(config: &FfmpegConfig, url: &str, format: &OutputFormat) -> Result<Self> {
        let mut session = TranscodeSession::new();
        session.begin_launch();

        let command = TranscodeCommand::new(config, url, format);
        let mut cmd = command.build();
        tracing::debug!(
            "[{}] Running {} {}",
            session.id(),
            config.binary,
            command.args().join(" ")
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                session.fail();
                tracing::error!("[{}] Failed to spawn {}: {}", session.id(), config.binary, e);
                return Err(RecorderError::Spawn(e));
            }
        };

        let stderr = child
            .stderr
            .take()
            .map(|stderr| spawn_stderr_drain(stderr, session.id()));
        let stdout = child.stdout.take();
        session.attach(child);

        let Some(stdout) = stdout else {
            session.fail();
            return Err(RecorderError::Transcode("ffmpeg stdout not captured".to_string()));
        };

        Ok(Self {
            relay: Relay {
                session,
                stdout,
                stderr,
                chunk_size: config.read_chunk_size.max(1),
            },
            channel_capacity: config.channel_capacity.max(1),
        })
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.relay.session.id()
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.relay.session.state()
    }

    /// Wait for the first output bytes.
    ///
    /// Nothing has been sent to the client yet, so a failure here can still
    /// become an error status. `Ok(None)` means the subprocess ended cleanly
    /// (or was killed) without producing output.
    pub async fn first_chunk(&mut self) -> Result<Option<Bytes>> {
        let mut buf = BytesMut::new();
        match self.relay.read_chunk(&mut buf).await {
            Ok(Some(chunk)) => Ok(Some(chunk)),
            Ok(None) => match self.relay.finish().await {
                Outcome::Completed | Outcome::Killed => Ok(None),
                Outcome::Failed(message) => Err(RecorderError::Transcode(message)),
            },
            Err(e) => Err(RecorderError::Transcode(self.relay.abort(&e))),
        }
    }

    /// Hand the subprocess to a relay task and return the body it feeds.
    ///
    /// Dropping the returned stream counts as a client disconnect.
    pub fn into_body(self, first: Option<Bytes>) -> BodyStream {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        if self.relay.session.state().is_terminal() {
            // Ended during `first_chunk`; the closed channel ends the body.
            return ReceiverStream::new(rx);
        }
        tokio::spawn(self.relay.run(first, tx));
        ReceiverStream::new(rx)
    }
}
