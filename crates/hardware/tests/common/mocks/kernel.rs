use std::path::{Path, PathBuf};

use fsbricks_core::common::error::KernelError;
use fsbricks_core::sim::{SimulationEvent, SimulationKernel};
use fsbricks_core::soc::SystemTopology;
use mockall::mock;

mock! {
    pub Kernel {}
    impl SimulationKernel for Kernel {
        fn instantiate(
            &mut self,
            topology: SystemTopology,
            restore: Option<PathBuf>,
        ) -> Result<(), KernelError>;
        fn simulate(&mut self) -> Result<SimulationEvent, KernelError>;
        fn checkpoint(&mut self, dir: &Path) -> Result<(), KernelError>;
    }
}

impl std::fmt::Debug for MockKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockKernel").finish_non_exhaustive()
    }
}

/// Kernel that replays a fixed event list and records checkpoint directories.
#[derive(Debug, Default)]
pub struct ScriptedKernel {
    pub events: Vec<SimulationEvent>,
    pub steps: usize,
    pub checkpoints: Vec<PathBuf>,
    pub instantiated: Option<(usize, Option<PathBuf>)>,
}

impl ScriptedKernel {
    pub fn new(events: Vec<SimulationEvent>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }
}

impl SimulationKernel for ScriptedKernel {
    fn instantiate(
        &mut self,
        topology: SystemTopology,
        restore: Option<PathBuf>,
    ) -> Result<(), KernelError> {
        self.instantiated = Some((topology.pci_devices().len(), restore));
        Ok(())
    }

    fn simulate(&mut self) -> Result<SimulationEvent, KernelError> {
        let event = self
            .events
            .get(self.steps)
            .cloned()
            .ok_or_else(|| KernelError::new("no more events"))?;
        self.steps += 1;
        Ok(event)
    }

    fn checkpoint(&mut self, dir: &Path) -> Result<(), KernelError> {
        std::fs::write(dir.join("m5.cpt"), b"[root]\n")
            .map_err(|e| KernelError::new(e.to_string()))?;
        self.checkpoints.push(dir.to_path_buf());
        Ok(())
    }
}
