//! Engine run state and the start/stop guard.

use parking_lot::Mutex;
use std::fmt;
use tokio::sync::watch;
use tracing::debug;

use super::EngineError;

/// Lifecycle of the trading engine.
///
/// ```text
/// NotStarted --start--> Running --loop exit--> Stopped
///                          ^                      |
///                          +-------start----------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Stopped,
}

impl RunState {
    /// Transition taken by `start()`.
    pub fn start(self) -> Result<RunState, EngineError> {
        match self {
            RunState::NotStarted | RunState::Stopped => Ok(RunState::Running),
            RunState::Running => Err(EngineError::AlreadyRunning),
        }
    }

    /// Transition taken when the control loop exits.
    pub fn stop(self) -> RunState {
        match self {
            RunState::NotStarted => RunState::NotStarted,
            RunState::Running | RunState::Stopped => RunState::Stopped,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::NotStarted => "not-started",
            RunState::Running => "running",
            RunState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Guards run state transitions and carries the keep-alive signal.
///
/// The keep-alive channel reads `true` while the control loop should keep
/// cycling. Flipping it to `false` both stops the loop and wakes it from
/// its inter-cycle sleep.
pub struct Lifecycle {
    state: Mutex<RunState>,
    keep_alive: watch::Sender<bool>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (keep_alive, _) = watch::channel(false);
        Self {
            state: Mutex::new(RunState::NotStarted),
            keep_alive,
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Claim the engine for a new run.
    ///
    /// Returns the keep-alive receiver the control loop must watch, or
    /// `AlreadyRunning` without touching any state.
    pub fn begin(&self) -> Result<RunGuard<'_>, EngineError> {
        let mut state = self.state.lock();
        *state = state.start()?;
        self.keep_alive.send_replace(true);
        let keep_alive = self.keep_alive.subscribe();
        debug!("Run state -> {}", *state);
        Ok(RunGuard {
            lifecycle: self,
            keep_alive,
        })
    }

    /// Ask a running loop to stop. Returns false when nothing was running.
    pub fn request_shutdown(&self) -> bool {
        let state = self.state.lock();
        if *state != RunState::Running {
            debug!("Shutdown requested while {}, nothing to do", *state);
            return false;
        }
        self.keep_alive.send_replace(false);
        true
    }

    fn finish(&self) {
        let mut state = self.state.lock();
        *state = state.stop();
        self.keep_alive.send_replace(false);
        debug!("Run state -> {}", *state);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of one run; moves the state to `Stopped` when dropped.
pub struct RunGuard<'a> {
    lifecycle: &'a Lifecycle,
    keep_alive: watch::Receiver<bool>,
}

impl RunGuard<'_> {
    pub fn keep_alive(&mut self) -> &mut watch::Receiver<bool> {
        &mut self.keep_alive
    }

    pub fn should_continue(&self) -> bool {
        *self.keep_alive.borrow()
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.finish();
    }
}
