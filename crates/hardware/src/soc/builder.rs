//! Topology construction and the top-level `SystemTopology` type.
//!
//! This module assembles the machine from a validated configuration. Construction order is
//! fixed:
//! 1. **Memory mode:** Looked up from the CPU variant; caches are wanted iff it is timing.
//! 2. **Memory:** The memory system and its channels.
//! 3. **PCI devices:** Local disks then bridge links, attached in that order.
//! 4. **Interconnect:** Connected once the device set is complete.
//! 5. **Clusters:** Cores, with one PMU per core when requested.
//! 6. **Caches:** Only in timing mode.
//! 7. **Boot loader** and 8. **device tree:** Derived from the finished machine.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::boot::{self, Workload};
use crate::bridge::descriptor::parse_descriptors;
use crate::common::constants::TERMINAL_PORT;
use crate::common::error::ComposeError;
use crate::config::Config;
use crate::sim::context::RunContext;
use crate::soc::cluster::{ClockDomain, CpuCluster, TarmacDest, TarmacTracer};
use crate::soc::cpu::{CpuRegistry, MemoryMode};
use crate::soc::interconnect::{AttachError, Interconnect};
use crate::soc::memory::MemorySystem;
use crate::soc::pci::{PciAttachment, ordered_devices};

/// File receiving terminal output when redirected.
pub const TERMINAL_FILE_NAME: &str = "system.terminal";

/// Where the UART terminal writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum TerminalOutput {
    /// Host standard output.
    Stdout,
    /// A file in the output directory.
    File(PathBuf),
}

/// UART terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Terminal {
    /// TCP port for attaching a console.
    pub port: u16,
    /// Output sink.
    pub output: TerminalOutput,
}

/// The wired machine, without its boot workload.
#[derive(Debug, Clone, Serialize)]
pub struct Machine {
    /// Memory mode shared by every cluster.
    pub memory_mode: MemoryMode,
    /// Memory system.
    pub memory: MemorySystem,
    /// Buses and PCI host with attached devices.
    pub interconnect: Interconnect,
    /// CPU clusters; core IDs are unique across clusters.
    pub clusters: Vec<CpuCluster>,
    /// Console terminal.
    pub terminal: Terminal,
}

/// A complete machine plus its boot workload, ready to hand to the kernel.
#[derive(Debug, Clone, Serialize)]
pub struct SystemTopology {
    /// Wired machine.
    pub machine: Machine,
    /// Boot workload.
    pub workload: Workload,
}

impl SystemTopology {
    /// Memory mode of the machine.
    pub const fn memory_mode(&self) -> MemoryMode {
        self.machine.memory_mode
    }

    /// Whether the cache hierarchy is built.
    pub const fn want_caches(&self) -> bool {
        self.machine.memory_mode.wants_caches()
    }

    /// PCI devices in attach order.
    pub fn pci_devices(&self) -> &[PciAttachment] {
        self.machine.interconnect.devices()
    }

    /// CPU clusters.
    pub fn clusters(&self) -> &[CpuCluster] {
        &self.machine.clusters
    }
}

/// Builds [`SystemTopology`] values against a CPU registry.
#[derive(Debug, Clone, Copy)]
pub struct TopologyBuilder<'a> {
    registry: &'a CpuRegistry,
}

impl<'a> TopologyBuilder<'a> {
    /// Creates a builder resolving CPU variants in `registry`.
    pub const fn new(registry: &'a CpuRegistry) -> Self {
        Self { registry }
    }

    /// Validates `config`, parses every bridge descriptor, then builds the topology.
    ///
    /// Nothing is constructed unless the whole configuration is valid.
    ///
    /// # Arguments
    ///
    /// * `config` - Composer configuration.
    /// * `ctx` - Run context; the generated device tree is written to its output directory.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Config`] or [`ComposeError::Descriptor`] for invalid input,
    /// and [`ComposeError::Topology`] if wiring or persisting the device tree fails.
    pub fn build(&self, config: &Config, ctx: &RunContext) -> Result<SystemTopology, ComposeError> {
        config.validate()?;
        let bridges = parse_descriptors(config.devices.bridges.as_slice())?;
        let model = self.registry.lookup(config.cpu.variant)?;

        let memory_mode = model.memory_mode;
        let want_caches = memory_mode.wants_caches();
        info!(cpu = %config.cpu.variant, %memory_mode, want_caches, "composing system");

        let mem = &config.memory;
        let memory = MemorySystem::new(mem.mem_type, &mem.size, mem.channels, mem.ranks)?;
        debug!(
            base = memory.base,
            size = memory.size,
            channels = memory.channels.len(),
            "memory configured"
        );

        let mut interconnect = Interconnect::new();
        for device in ordered_devices(&config.devices.disk_images, &bridges)? {
            let _ = interconnect.attach_pci(device).map_err(|e| match e {
                AttachError::Config(e) => ComposeError::Config(e),
                AttachError::Topology(e) => ComposeError::Topology(e),
            })?;
        }
        interconnect.connect()?;

        let cpu = &config.cpu;
        let clock = ClockDomain::parse(&cpu.frequency, &cpu.voltage)?;
        let tracer = cpu.tarmac_gen.then_some(TarmacTracer {
            dest: cpu.tarmac_dest,
        });
        if !cpu.tarmac_gen && cpu.tarmac_dest != TarmacDest::default() {
            warn!(dest = %cpu.tarmac_dest, "tarmac destination ignored without tarmac generation");
        }
        let mut cluster = CpuCluster::new(model.clone(), cpu.num_cores, 0, clock, tracer)?;
        if cpu.with_pmu {
            cluster.add_pmus(cpu.pmu_ppi_number)?;
        }
        if want_caches {
            cluster.add_caches();
        }
        info!(
            cores = cluster.len(),
            caches = cluster.has_caches(),
            "CPU cluster built"
        );

        let output = if config.run.write_terminal_output {
            TerminalOutput::File(ctx.outdir().join(TERMINAL_FILE_NAME))
        } else {
            TerminalOutput::Stdout
        };
        let machine = Machine {
            memory_mode,
            memory,
            interconnect,
            clusters: vec![cluster],
            terminal: Terminal {
                port: TERMINAL_PORT,
                output,
            },
        };

        let workload = boot::orchestrate(&machine, &config.boot, ctx)?;
        info!(dtb = %workload.dtb.path().display(), "system composed");
        Ok(SystemTopology { machine, workload })
    }
}
