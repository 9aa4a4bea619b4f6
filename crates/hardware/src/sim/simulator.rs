//! Simulator: owns the kernel after instantiation and drives it through the run loop.
//!
//! The finished topology is moved into the kernel as one unit; nothing in this crate keeps
//! a handle to it afterwards.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::info;

use crate::common::constants::CONFIG_DUMP_NAME;
use crate::common::error::{RunError, TopologyError};
use crate::sim::context::RunContext;
use crate::sim::kernel::SimulationKernel;
use crate::sim::run_loop::{RunLoop, RunOutcome, RunState};
use crate::soc::SystemTopology;

/// Writes the topology as pretty-printed JSON into the output directory.
///
/// # Errors
///
/// Returns [`TopologyError::Persist`] if the file cannot be written.
pub fn dump_config(
    topology: &SystemTopology,
    ctx: &RunContext,
) -> Result<PathBuf, TopologyError> {
    let path = ctx
        .output_file(CONFIG_DUMP_NAME)
        .map_err(|source| TopologyError::Persist {
            path: ctx.outdir().join(CONFIG_DUMP_NAME),
            source,
        })?;
    let persist = |source: io::Error| TopologyError::Persist {
        path: path.clone(),
        source,
    };
    let json = serde_json::to_string_pretty(topology).map_err(|e| persist(e.into()))?;
    fs::write(&path, json).map_err(persist)?;
    info!(path = %path.display(), "wrote configuration dump");
    Ok(path)
}

/// An instantiated kernel plus the run loop driving it.
#[derive(Debug)]
pub struct Simulator<K: SimulationKernel> {
    kernel: K,
    run_loop: RunLoop,
}

impl<K: SimulationKernel> Simulator<K> {
    /// Hands `topology` to `kernel`, restoring from `restore` when given.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Kernel`] if instantiation fails.
    pub fn instantiate(
        mut kernel: K,
        topology: SystemTopology,
        ctx: &RunContext,
        restore: Option<PathBuf>,
    ) -> Result<Self, RunError> {
        if let Some(path) = &restore {
            info!(restore = %path.display(), "restoring from checkpoint");
        }
        kernel.instantiate(topology, restore)?;
        Ok(Self {
            kernel,
            run_loop: RunLoop::new(ctx.checkpoint_dir()),
        })
    }

    /// Runs the single simulation phase.
    ///
    /// # Errors
    ///
    /// See [`RunLoop::run`].
    pub fn run(&mut self) -> Result<RunOutcome, RunError> {
        self.run_loop.run(&mut self.kernel)
    }

    /// State of the run loop.
    pub const fn state(&self) -> RunState {
        self.run_loop.state()
    }

    /// Releases the kernel.
    pub fn into_kernel(self) -> K {
        self.kernel
    }
}
