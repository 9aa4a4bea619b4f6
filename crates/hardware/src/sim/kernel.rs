//! Seam to the external simulation kernel.
//!
//! The kernel executes the machine; this crate only hands it a finished topology and
//! consumes the exit events it reports.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::error::KernelError;
use crate::soc::SystemTopology;

/// Exit cause string the kernel reports for a checkpoint request.
pub const CHECKPOINT_CAUSE: &str = "checkpoint";

/// Why the kernel stopped simulating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExitCause {
    /// The guest or a script asked for a checkpoint.
    Checkpoint,
    /// Any other exit, carrying the kernel's message verbatim.
    Terminal(String),
}

impl From<String> for ExitCause {
    fn from(message: String) -> Self {
        if message == CHECKPOINT_CAUSE {
            Self::Checkpoint
        } else {
            Self::Terminal(message)
        }
    }
}

impl From<&str> for ExitCause {
    fn from(message: &str) -> Self {
        Self::from(message.to_string())
    }
}

impl From<ExitCause> for String {
    fn from(cause: ExitCause) -> Self {
        match cause {
            ExitCause::Checkpoint => CHECKPOINT_CAUSE.to_string(),
            ExitCause::Terminal(message) => message,
        }
    }
}

impl fmt::Display for ExitCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkpoint => f.write_str(CHECKPOINT_CAUSE),
            Self::Terminal(message) => f.write_str(message),
        }
    }
}

/// One exit reported by the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Exit cause.
    pub cause: ExitCause,
    /// Exit code accompanying the cause.
    pub code: i32,
    /// Simulated tick at which the exit happened.
    pub tick: u64,
}

impl SimulationEvent {
    /// A checkpoint request at `tick`.
    pub const fn checkpoint(tick: u64) -> Self {
        Self {
            cause: ExitCause::Checkpoint,
            code: 0,
            tick,
        }
    }

    /// A terminal exit with `message` and `code` at `tick`.
    pub fn terminal(message: impl Into<String>, code: i32, tick: u64) -> Self {
        Self {
            cause: ExitCause::Terminal(message.into()),
            code,
            tick,
        }
    }
}

/// The external simulation kernel.
///
/// Implementations block inside [`SimulationKernel::simulate`] until the simulated machine
/// exits; there is no timeout at this layer.
pub trait SimulationKernel {
    /// Takes ownership of `topology` and builds the simulated objects, optionally restoring
    /// state from the checkpoint at `restore`.
    ///
    /// # Errors
    ///
    /// Returns a [`KernelError`] if the kernel rejects the topology or the checkpoint.
    fn instantiate(
        &mut self,
        topology: SystemTopology,
        restore: Option<PathBuf>,
    ) -> Result<(), KernelError>;

    /// Simulates until the next exit event.
    ///
    /// # Errors
    ///
    /// Returns a [`KernelError`] if simulation cannot proceed.
    fn simulate(&mut self) -> Result<SimulationEvent, KernelError>;

    /// Persists the full simulated state into `dir`.
    ///
    /// # Errors
    ///
    /// Returns a [`KernelError`] if the state cannot be written.
    fn checkpoint(&mut self, dir: &Path) -> Result<(), KernelError>;
}
