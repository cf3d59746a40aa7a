//! Transcode session lifecycle
//!
//! A session owns exactly one ffmpeg child. Every lifecycle event goes
//! through [`TranscodeSession::transition`], so whichever of normal end,
//! failure or client disconnect arrives first decides the terminal state and
//! later events are ignored.

use std::io;
use std::process::ExitStatus;
use tokio::process::Child;
use uuid::Uuid;

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Launching,
    Streaming,
    Completed,
    Failed,
    Killed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Killed
        )
    }

    /// Allowed edges of the lifecycle graph
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Launching)
                | (Launching, Streaming)
                | (Launching, Failed)
                | (Launching, Killed)
                | (Streaming, Completed)
                | (Streaming, Failed)
                | (Streaming, Killed)
        )
    }
}

/// One recording's subprocess and its lifecycle state
#[derive(Debug)]
pub struct TranscodeSession {
    id: Uuid,
    state: SessionState,
    child: Option<Child>,
}

impl TranscodeSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            child: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next` if the edge exists. Returns whether the state changed.
    fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::trace!(
                "[{}] ignoring transition {:?} -> {:?}",
                self.id,
                self.state,
                next
            );
            return false;
        }
        tracing::debug!("[{}] {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
        true
    }

    /// Headers are decided; the subprocess is about to be spawned.
    pub fn begin_launch(&mut self) -> bool {
        self.transition(SessionState::Launching)
    }

    /// Take ownership of the spawned child and start streaming.
    pub fn attach(&mut self, child: Child) -> bool {
        if self.state != SessionState::Launching || self.child.is_some() {
            return false;
        }
        self.child = Some(child);
        self.transition(SessionState::Streaming)
    }

    /// Subprocess reported a clean end of stream.
    pub fn complete(&mut self) -> bool {
        self.transition(SessionState::Completed)
    }

    /// Subprocess failed. A child that is still running is killed so that
    /// nothing outlives the session.
    pub fn fail(&mut self) -> bool {
        if !self.transition(SessionState::Failed) {
            return false;
        }
        if let Some(child) = self.child.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                if let Err(e) = child.start_kill() {
                    tracing::warn!("[{}] failed to kill ffmpeg: {}", self.id, e);
                }
            }
        }
        true
    }

    /// Forcibly terminate the subprocess with SIGKILL.
    ///
    /// Returns `false` without signalling anything when the session already
    /// reached a terminal state.
    pub fn kill(&mut self) -> bool {
        if !self.transition(SessionState::Killed) {
            return false;
        }
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.start_kill() {
                tracing::warn!("[{}] failed to kill ffmpeg: {}", self.id, e);
            }
        }
        true
    }

    /// Record that the subprocess died from a kill signal sent elsewhere.
    pub fn mark_killed(&mut self) -> bool {
        self.transition(SessionState::Killed)
    }

    /// Wait for the subprocess to exit and reap it.
    pub async fn wait(&mut self) -> io::Result<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => child.wait().await.map(Some),
            None => Ok(None),
        }
    }
}

impl Default for TranscodeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TranscodeSession {
    fn drop(&mut self) {
        if self.child.is_some() && !self.state.is_terminal() {
            tracing::info!("[{}] session dropped while running, killing ffmpeg", self.id);
            self.kill();
        }
    }
}
