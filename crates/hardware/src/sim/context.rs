//! Explicit per-run context.
//!
//! Carries the output and checkpoint locations through the topology builder, boot
//! orchestrator and run loop instead of a process-wide options singleton.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;

/// Locations used by one composer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    outdir: PathBuf,
    checkpoint_dir: PathBuf,
}

impl RunContext {
    /// Creates a context; checkpoints go to `outdir` unless `checkpoint_dir` is given.
    pub fn new(outdir: impl Into<PathBuf>, checkpoint_dir: Option<PathBuf>) -> Self {
        let outdir = outdir.into();
        let checkpoint_dir = checkpoint_dir.unwrap_or_else(|| outdir.clone());
        Self {
            outdir,
            checkpoint_dir,
        }
    }

    /// Context for the given run configuration.
    pub fn from_config(run: &RunConfig) -> Self {
        Self::new(run.outdir.clone(), run.checkpoint_dir.clone())
    }

    /// Directory receiving generated artifacts.
    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    /// Directory receiving checkpoint directories.
    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    /// Creates the output directory if needed and returns the path of `name` inside it.
    ///
    /// # Errors
    ///
    /// Propagates the I/O error from creating the directory.
    pub fn output_file(&self, name: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.outdir)?;
        Ok(self.outdir.join(name))
    }
}
