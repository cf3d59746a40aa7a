//! Subprocess output relay
//!
//! Copies ffmpeg's stdout into a bounded channel whose receiving half is the
//! HTTP response body. The receiver is dropped when the client goes away,
//! which the relay observes through [`mpsc::Sender::closed`] and answers by
//! killing the subprocess.

use bytes::{Bytes, BytesMut};
use std::io;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::ChildStdout;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::command::{classify_exit, ExitKind};
use super::session::TranscodeSession;

/// How long to wait for the stderr tail once the subprocess has exited
const STDERR_GRACE: Duration = Duration::from_secs(1);

/// Terminal outcome of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Killed,
    Failed(String),
}

/// Everything the relay task owns for one recording
pub(crate) struct Relay {
    pub session: TranscodeSession,
    pub stdout: ChildStdout,
    pub stderr: Option<JoinHandle<String>>,
    pub chunk_size: usize,
}

impl Relay {
    /// Read the next chunk of subprocess output. `Ok(None)` is end of stream.
    pub async fn read_chunk(&mut self, buf: &mut BytesMut) -> io::Result<Option<Bytes>> {
        buf.reserve(self.chunk_size);
        match self.stdout.read_buf(buf).await? {
            0 => Ok(None),
            _ => Ok(Some(buf.split().freeze())),
        }
    }

    /// Reap the subprocess after its stdout closed and settle the session.
    pub async fn finish(&mut self) -> Outcome {
        let id = self.session.id();
        let kind = match self.session.wait().await {
            Ok(Some(status)) => classify_exit(status),
            Ok(None) => ExitKind::Failed("no subprocess attached".to_string()),
            Err(e) => ExitKind::Failed(format!("failed to wait for ffmpeg: {}", e)),
        };

        match kind {
            ExitKind::Success => {
                self.session.complete();
                tracing::info!("[{}] Processing finished", id);
                Outcome::Completed
            }
            ExitKind::Killed => {
                self.session.mark_killed();
                tracing::info!("[{}] Recording stopped by user (SIGKILL)", id);
                Outcome::Killed
            }
            ExitKind::Failed(reason) => {
                self.session.fail();
                let message = match self.stderr_tail().await {
                    Some(tail) if !tail.is_empty() => format!("{}: {}", reason, tail),
                    _ => reason,
                };
                tracing::error!("[{}] An error occurred: {}", id, message);
                Outcome::Failed(message)
            }
        }
    }

    /// Fail the session after a pipe error, returning the error message.
    pub fn abort(&mut self, err: &io::Error) -> String {
        self.session.fail();
        let message = format!("failed to read ffmpeg output: {}", err);
        tracing::error!("[{}] An error occurred: {}", self.session.id(), message);
        message
    }

    /// The client went away: kill and reap the subprocess.
    pub async fn client_gone(&mut self) -> Outcome {
        let id = self.session.id();
        if self.session.kill() {
            tracing::info!("[{}] Client disconnected, killing ffmpeg...", id);
            if let Err(e) = self.session.wait().await {
                tracing::warn!("[{}] failed to reap ffmpeg: {}", id, e);
            }
            tracing::info!("[{}] Recording stopped by user (SIGKILL)", id);
        }
        Outcome::Killed
    }

    async fn stderr_tail(&mut self) -> Option<String> {
        let handle = self.stderr.take()?;
        match tokio::time::timeout(STDERR_GRACE, handle).await {
            Ok(Ok(tail)) => Some(tail),
            _ => None,
        }
    }

    /// Relay output until end of stream, failure or disconnect.
    ///
    /// `first` is output already read before the response was committed.
    /// A mid-stream failure is sent as an error item so that the response is
    /// cut off rather than ended cleanly.
    pub async fn run(mut self, first: Option<Bytes>, tx: mpsc::Sender<io::Result<Bytes>>) -> Outcome {
        if let Some(chunk) = first {
            if tx.send(Ok(chunk)).await.is_err() {
                return self.client_gone().await;
            }
        }

        let mut buf = BytesMut::with_capacity(self.chunk_size);
        loop {
            tokio::select! {
                biased;
                _ = tx.closed() => return self.client_gone().await,
                read = self.read_chunk(&mut buf) => match read {
                    Ok(Some(chunk)) => {
                        if tx.send(Ok(chunk)).await.is_err() {
                            return self.client_gone().await;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let message = self.abort(&e);
                        let _ = tx.send(Err(e)).await;
                        return Outcome::Failed(message);
                    }
                },
            }
        }

        // ffmpeg may linger after closing stdout; keep watching the client.
        let outcome = tokio::select! {
            biased;
            _ = tx.closed() => return self.client_gone().await,
            outcome = self.finish() => outcome,
        };
        if let Outcome::Failed(message) = &outcome {
            let _ = tx.send(Err(io::Error::other(message.clone()))).await;
        }
        outcome
    }
}
