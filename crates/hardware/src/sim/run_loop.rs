//! Run loop over kernel exit events.
//!
//! A two-state machine: [`RunState::Running`] steps the kernel exactly once and always
//! moves to [`RunState::Stopped`], which is terminal. A checkpoint exit persists state
//! under `cpt.<tick>` and stops; resuming requires a new invocation with a restore path.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::common::constants::CHECKPOINT_PREFIX;
use crate::common::error::RunError;
use crate::sim::kernel::{ExitCause, SimulationKernel};

/// State of a [`RunLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// The next call to [`RunLoop::run`] steps the kernel.
    Running,
    /// No further transitions.
    Stopped,
}

/// How a simulation phase ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// State was persisted under `dir`.
    Checkpointed {
        /// Tick at which the checkpoint was taken.
        tick: u64,
        /// Checkpoint directory.
        dir: PathBuf,
    },
    /// The kernel reported a terminal exit, passed through unchanged.
    Exited {
        /// Exit message.
        cause: String,
        /// Exit code.
        code: i32,
        /// Tick of the exit.
        tick: u64,
    },
}

/// Checkpoint directory for `tick` under `root`.
pub fn checkpoint_dir_for(root: &Path, tick: u64) -> PathBuf {
    root.join(format!("{CHECKPOINT_PREFIX}{tick}"))
}

/// Drives one simulation phase.
#[derive(Debug, Clone)]
pub struct RunLoop {
    checkpoint_root: PathBuf,
    state: RunState,
}

impl RunLoop {
    /// Creates a running loop that checkpoints under `checkpoint_root`.
    pub fn new(checkpoint_root: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_root: checkpoint_root.into(),
            state: RunState::Running,
        }
    }

    /// Current state.
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Steps `kernel` once and handles its exit event.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Stopped`] if the loop already ran, [`RunError::Kernel`] if the
    /// kernel fails to simulate or checkpoint, and [`RunError::CheckpointDir`] if the
    /// checkpoint directory cannot be created. The loop is stopped afterwards in every case.
    pub fn run<K: SimulationKernel + ?Sized>(
        &mut self,
        kernel: &mut K,
    ) -> Result<RunOutcome, RunError> {
        if self.state == RunState::Stopped {
            return Err(RunError::Stopped);
        }
        self.state = RunState::Stopped;
        let event = kernel.simulate()?;
        match event.cause {
            ExitCause::Checkpoint => {
                info!(tick = event.tick, "dropping checkpoint");
                let dir = checkpoint_dir_for(&self.checkpoint_root, event.tick);
                fs::create_dir_all(&dir).map_err(|source| RunError::CheckpointDir {
                    path: dir.clone(),
                    source,
                })?;
                kernel.checkpoint(&dir)?;
                info!(dir = %dir.display(), "checkpoint done");
                Ok(RunOutcome::Checkpointed {
                    tick: event.tick,
                    dir,
                })
            }
            ExitCause::Terminal(cause) => {
                info!(%cause, code = event.code, tick = event.tick, "simulation exited");
                Ok(RunOutcome::Exited {
                    cause,
                    code: event.code,
                    tick: event.tick,
                })
            }
        }
    }
}
