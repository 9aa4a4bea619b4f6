//! Full-system machine composer CLI.
//!
//! This binary collects the composer's flags and performs:
//! 1. **Validation:** Every configuration and descriptor error is fatal before anything is
//!    built.
//! 2. **Composition:** Builds the topology, writes the generated device tree and
//!    `config.json`.
//! 3. **Run:** With `--backend`, hands the topology to an external simulator process and
//!    runs one phase, printing the checkpoint or the terminal exit.

mod kernel;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fsbricks_core::common::error::{ComposeError, RunError};
use fsbricks_core::config::{BootConfig, Config, CpuConfig, DeviceConfig, MemoryConfig, RunConfig};
use fsbricks_core::sim::{RunContext, RunOutcome, Simulator, dump_config};
use fsbricks_core::soc::TopologyBuilder;
use fsbricks_core::soc::cluster::{TarmacDest, validate_ppi};
use fsbricks_core::soc::cpu::{CpuRegistry, CpuVariant};
use fsbricks_core::soc::memory::MemType;

use crate::kernel::ProcessKernel;

#[derive(Parser, Debug)]
#[command(
    name = "fsbricks",
    author,
    version,
    about = "Compose and run an Arm full-system machine with co-simulated PCI peers",
    long_about = "Compose an Arm full-system machine (CPU cluster, memory, PCI disks and \
        bridge links), generate its device tree, and optionally drive an external simulator \
        process through one run phase.\n\n\
        Examples:\n  \
        fsbricks --kernel vmlinux --bootloader boot.arm64 --disk-image root.img\n  \
        fsbricks --kernel vmlinux --bootloader boot.arm64 --cpu o3 \
        --simbricks-pci connect:/tmp/nic.sock:sync --backend ./kernel"
)]
struct Cli {
    /// Guest kernel image.
    #[arg(long)]
    kernel: PathBuf,

    /// Boot loader image.
    #[arg(long)]
    bootloader: PathBuf,

    /// Device tree blob; generated from the machine when omitted.
    #[arg(long)]
    dtb: Option<PathBuf>,

    /// Initial ramdisk.
    #[arg(long)]
    initrd: Option<PathBuf>,

    /// Disk image attached as a PCI block device (repeatable).
    #[arg(long = "disk-image")]
    disk_images: Vec<PathBuf>,

    /// Script the guest reads after boot; must exist.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Extra arguments appended to the kernel command line.
    #[arg(long)]
    kernel_cmdline_append: Option<String>,

    /// CPU model.
    #[arg(long, default_value_t = CpuVariant::Atomic)]
    cpu: CpuVariant,

    /// CPU clock frequency.
    #[arg(long, default_value = "4GHz")]
    cpu_freq: String,

    /// Number of cores.
    #[arg(long, default_value_t = 1)]
    num_cores: u32,

    /// Memory interface.
    #[arg(long, default_value_t = MemType::default())]
    mem_type: MemType,

    /// Memory channels; a power of two.
    #[arg(long, default_value_t = 1)]
    mem_channels: u32,

    /// Ranks per channel (DRAM interfaces only).
    #[arg(long)]
    mem_ranks: Option<u32>,

    /// Memory size.
    #[arg(long, default_value = "2GB")]
    mem_size: String,

    /// Attach a tarmac tracer to every core.
    #[arg(long)]
    tarmac_gen: bool,

    /// Tarmac trace destination.
    #[arg(long, default_value_t = TarmacDest::Stdoutput)]
    tarmac_dest: TarmacDest,

    /// Wire one PMU per core.
    #[arg(long)]
    with_pmu: bool,

    /// PMU interrupt number (16..=31).
    #[arg(long, default_value_t = 23, value_parser = parse_ppi)]
    pmu_ppi_number: u32,

    /// Checkpoint to restore from.
    #[arg(long)]
    restore: Option<PathBuf>,

    /// Directory receiving checkpoints; defaults to the output directory.
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// Write terminal output to a file in the output directory instead of stdout.
    #[arg(long)]
    write_terminal_output: bool,

    /// Bridge link descriptor, e.g. `connect:/tmp/dev.sock:sync` (repeatable).
    #[arg(long = "simbricks-pci", value_name = "DESCRIPTOR")]
    bridges: Vec<String>,

    /// Output directory.
    #[arg(long, default_value = "m5out")]
    outdir: PathBuf,

    /// External simulator speaking JSON lines on stdio; compose only when omitted.
    #[arg(long)]
    backend: Option<PathBuf>,

    /// Argument passed to the backend (repeatable).
    #[arg(long = "backend-arg", allow_hyphen_values = true)]
    backend_args: Vec<String>,
}

fn parse_ppi(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|e| format!("{e}"))?;
    validate_ppi(n).map_err(|e| e.to_string())
}

impl Cli {
    fn into_config(self) -> (Config, Option<PathBuf>, Vec<String>) {
        let config = Config {
            boot: BootConfig {
                kernel: self.kernel,
                bootloader: self.bootloader,
                dtb: self.dtb,
                initrd: self.initrd,
                script: self.script,
                cmdline_append: self.kernel_cmdline_append,
            },
            cpu: CpuConfig {
                variant: self.cpu,
                num_cores: self.num_cores,
                frequency: self.cpu_freq,
                with_pmu: self.with_pmu,
                pmu_ppi_number: self.pmu_ppi_number,
                tarmac_gen: self.tarmac_gen,
                tarmac_dest: self.tarmac_dest,
                ..CpuConfig::default()
            },
            memory: MemoryConfig {
                mem_type: self.mem_type,
                size: self.mem_size,
                channels: self.mem_channels,
                ranks: self.mem_ranks,
            },
            devices: DeviceConfig {
                disk_images: self.disk_images,
                bridges: self.bridges,
            },
            run: RunConfig {
                outdir: self.outdir,
                checkpoint_dir: self.checkpoint_dir,
                restore: self.restore,
                write_terminal_output: self.write_terminal_output,
            },
        };
        (config, self.backend, self.backend_args)
    }
}

fn compose_and_run(
    config: &Config,
    backend: Option<PathBuf>,
    backend_args: &[String],
) -> Result<(), ComposeError> {
    let ctx = RunContext::from_config(&config.run);
    let registry = CpuRegistry::arm();
    let topology = TopologyBuilder::new(&registry).build(config, &ctx)?;
    let _ = dump_config(&topology, &ctx)?;

    let Some(program) = backend else {
        info!(outdir = %ctx.outdir().display(), "no backend given; composition only");
        return Ok(());
    };

    let kernel = ProcessKernel::spawn(&program, backend_args).map_err(RunError::from)?;
    let restore = config.run.restore.clone();
    let mut simulator = Simulator::instantiate(kernel, topology, &ctx, restore)?;
    match simulator.run()? {
        RunOutcome::Checkpointed { tick, dir } => {
            println!("Dropping checkpoint at tick {tick}");
            println!("Checkpoint done: {}", dir.display());
        }
        RunOutcome::Exited { cause, code, tick } => {
            println!("{cause} ({code}) @ {tick}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (config, backend, backend_args) = Cli::parse().into_config();
    match compose_and_run(&config, backend, &backend_args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
