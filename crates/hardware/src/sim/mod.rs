//! Simulation driving.
//!
//! Provides the explicit run context, the seam to the external kernel, and the run loop
//! that handles its exit events.

/// Output and checkpoint locations for one invocation.
pub mod context;

/// Kernel trait and exit events.
pub mod kernel;

/// Single-phase run loop.
pub mod run_loop;

/// Kernel ownership and config dump.
pub mod simulator;

pub use context::RunContext;
pub use kernel::{ExitCause, SimulationEvent, SimulationKernel};
pub use run_loop::{RunLoop, RunOutcome, RunState, checkpoint_dir_for};
pub use simulator::{Simulator, dump_config};
