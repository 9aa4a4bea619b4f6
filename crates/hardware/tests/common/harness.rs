use std::path::{Path, PathBuf};

use fsbricks_core::common::error::ComposeError;
use fsbricks_core::config::Config;
use fsbricks_core::sim::RunContext;
use fsbricks_core::soc::cpu::CpuRegistry;
use fsbricks_core::soc::{SystemTopology, TopologyBuilder};
use tempfile::TempDir;

pub struct TestContext {
    dir: TempDir,
    pub ctx: RunContext,
    pub registry: CpuRegistry,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(dir.path().join("m5out"), None);
        Self {
            dir,
            ctx,
            registry: CpuRegistry::arm(),
        }
    }

    /// Routes checkpoints to a separate directory under the temp root.
    pub fn with_checkpoint_dir(mut self, name: &str) -> Self {
        self.ctx = RunContext::new(self.outdir().to_path_buf(), Some(self.dir.path().join(name)));
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn outdir(&self) -> &Path {
        self.ctx.outdir()
    }

    /// Default configuration pointing at placeholder images.
    pub fn config(&self) -> Config {
        let mut config = Config::new("vmlinux", "boot.arm64");
        config.run.outdir = self.outdir().to_path_buf();
        config
    }

    /// Creates an empty file under the temp root.
    pub fn touch(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    pub fn build(&self, config: &Config) -> Result<SystemTopology, ComposeError> {
        TopologyBuilder::new(&self.registry).build(config, &self.ctx)
    }
}
