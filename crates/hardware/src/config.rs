//! Configuration for composing and running a full-system machine.
//!
//! This module defines the raw values collected from the command line (or a JSON file)
//! before any topology object exists. It provides:
//! 1. **Defaults:** Baseline values matching the stock Arm full-system setup.
//! 2. **Structures:** Hierarchical config for boot, CPU, memory, devices and the run.
//! 3. **Validation:** [`Config::validate`] performs every fatal configuration check up front.
//!
//! Descriptor syntax is checked separately by [`crate::bridge::parse_descriptors`], also
//! before construction begins.

use std::path::PathBuf;

use serde::Deserialize;

use crate::common::constants::MAX_CORES;
use crate::common::error::ConfigError;
use crate::soc::cluster::{ClockDomain, TarmacDest, validate_ppi};
use crate::soc::cpu::CpuVariant;
use crate::soc::memory::{MemType, MemorySystem};
use crate::soc::pci::PCI_CAPACITY;

/// Default configuration constants.
mod defaults {
    /// Core clock.
    pub const CPU_FREQ: &str = "4GHz";

    /// Cluster supply voltage.
    pub const CPU_VOLTAGE: &str = "1.0V";

    /// Cores per cluster.
    pub const NUM_CORES: u32 = 1;

    /// PPI wired to each PMU (must stay within 16..=31).
    pub const PMU_PPI: u32 = 23;

    /// Physical memory size.
    pub const MEM_SIZE: &str = "2GB";

    /// Memory channels.
    pub const MEM_CHANNELS: u32 = 1;

    /// Directory receiving generated artifacts.
    pub const OUTDIR: &str = "m5out";
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use fsbricks_core::config::Config;
/// use fsbricks_core::soc::cpu::CpuVariant;
///
/// let json = r#"{
///     "boot": { "kernel": "vmlinux", "bootloader": "boot.arm64" },
///     "cpu": { "variant": "hpi", "num_cores": 2, "with_pmu": true },
///     "devices": { "bridges": ["connect:/tmp/nic.sock:sync"] }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.cpu.variant, CpuVariant::Hpi);
/// assert_eq!(config.cpu.frequency, "4GHz");
/// assert_eq!(config.cpu.pmu_ppi_number, 23);
/// assert_eq!(config.memory.size, "2GB");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Kernel, boot loader and boot-time inputs.
    pub boot: BootConfig,
    /// CPU cluster settings.
    #[serde(default)]
    pub cpu: CpuConfig,
    /// Main memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// PCI devices, local and bridged.
    #[serde(default)]
    pub devices: DeviceConfig,
    /// Output, checkpoint and restore settings.
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Creates a default configuration for the given kernel and boot loader.
    pub fn new(kernel: impl Into<PathBuf>, bootloader: impl Into<PathBuf>) -> Self {
        Self {
            boot: BootConfig {
                kernel: kernel.into(),
                bootloader: bootloader.into(),
                ..BootConfig::default()
            },
            ..Self::default()
        }
    }

    /// Checks every configuration value that can be checked without building anything.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: missing kernel or boot loader, missing boot
    /// script file, PMU interrupt outside 16..=31, zero or too many cores, bad clock or
    /// voltage, bad memory parameters, empty disk image paths, or more PCI devices than the
    /// host holds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boot.kernel.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("kernel"));
        }
        if self.boot.bootloader.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("bootloader"));
        }
        if let Some(script) = &self.boot.script {
            if !script.is_file() {
                return Err(ConfigError::MissingBootScript(script.clone()));
            }
        }

        let _ = validate_ppi(self.cpu.pmu_ppi_number)?;
        if self.cpu.num_cores == 0 {
            return Err(ConfigError::NoCores);
        }
        if self.cpu.num_cores > MAX_CORES {
            return Err(ConfigError::TooManyCores {
                requested: self.cpu.num_cores,
                limit: MAX_CORES,
            });
        }
        let _ = ClockDomain::parse(&self.cpu.frequency, &self.cpu.voltage)?;

        let _ = MemorySystem::new(
            self.memory.mem_type,
            &self.memory.size,
            self.memory.channels,
            self.memory.ranks,
        )?;

        if let Some(position) = self
            .devices
            .disk_images
            .iter()
            .position(|p| p.as_os_str().is_empty())
        {
            return Err(ConfigError::EmptyDiskImage(position));
        }
        let requested = self.devices.disk_images.len() + self.devices.bridges.len();
        if requested > PCI_CAPACITY {
            return Err(ConfigError::TooManyPciDevices {
                requested,
                limit: PCI_CAPACITY,
            });
        }
        Ok(())
    }
}

/// Boot-time inputs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootConfig {
    /// Kernel image (required).
    pub kernel: PathBuf,

    /// Executable that runs before the kernel (required).
    pub bootloader: PathBuf,

    /// Device-tree blob to load instead of generating one.
    #[serde(default)]
    pub dtb: Option<PathBuf>,

    /// Initial ramdisk.
    #[serde(default)]
    pub initrd: Option<PathBuf>,

    /// Boot script made readable to the guest; must exist when given.
    #[serde(default)]
    pub script: Option<PathBuf>,

    /// Extra text appended to the kernel command line.
    #[serde(default)]
    pub cmdline_append: Option<String>,
}

/// CPU cluster settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CpuConfig {
    /// CPU model.
    #[serde(default)]
    pub variant: CpuVariant,

    /// Cores in the cluster.
    #[serde(default = "CpuConfig::default_num_cores")]
    pub num_cores: u32,

    /// Core clock, e.g. `"4GHz"`.
    #[serde(default = "CpuConfig::default_frequency")]
    pub frequency: String,

    /// Supply voltage, e.g. `"1.0V"`.
    #[serde(default = "CpuConfig::default_voltage")]
    pub voltage: String,

    /// Add one PMU per core.
    #[serde(default)]
    pub with_pmu: bool,

    /// PPI connecting each PMU to its core.
    #[serde(default = "CpuConfig::default_pmu_ppi")]
    pub pmu_ppi_number: u32,

    /// Emit a tarmac trace per core.
    #[serde(default)]
    pub tarmac_gen: bool,

    /// Destination of tarmac traces.
    #[serde(default)]
    pub tarmac_dest: TarmacDest,
}

impl CpuConfig {
    fn default_num_cores() -> u32 {
        defaults::NUM_CORES
    }

    fn default_frequency() -> String {
        defaults::CPU_FREQ.to_string()
    }

    fn default_voltage() -> String {
        defaults::CPU_VOLTAGE.to_string()
    }

    fn default_pmu_ppi() -> u32 {
        defaults::PMU_PPI
    }
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            variant: CpuVariant::default(),
            num_cores: defaults::NUM_CORES,
            frequency: defaults::CPU_FREQ.to_string(),
            voltage: defaults::CPU_VOLTAGE.to_string(),
            with_pmu: false,
            pmu_ppi_number: defaults::PMU_PPI,
            tarmac_gen: false,
            tarmac_dest: TarmacDest::default(),
        }
    }
}

/// Main memory settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Memory interface model.
    #[serde(default)]
    pub mem_type: MemType,

    /// Physical memory size, e.g. `"2GB"`.
    #[serde(default = "MemoryConfig::default_size")]
    pub size: String,

    /// Memory channels (power of two).
    #[serde(default = "MemoryConfig::default_channels")]
    pub channels: u32,

    /// Ranks per channel (DRAM interfaces only).
    #[serde(default)]
    pub ranks: Option<u32>,
}

impl MemoryConfig {
    fn default_size() -> String {
        defaults::MEM_SIZE.to_string()
    }

    fn default_channels() -> u32 {
        defaults::MEM_CHANNELS
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            mem_type: MemType::default(),
            size: defaults::MEM_SIZE.to_string(),
            channels: defaults::MEM_CHANNELS,
            ranks: None,
        }
    }
}

/// PCI devices.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceConfig {
    /// Local disk images, attached as copy-on-write VirtIO block devices in this order.
    #[serde(default)]
    pub disk_images: Vec<PathBuf>,

    /// Bridge-link descriptors, attached after all local images in this order.
    #[serde(default)]
    pub bridges: Vec<String>,
}

/// Output, checkpoint and restore settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Directory receiving the config dump and a generated device tree.
    #[serde(default = "RunConfig::default_outdir")]
    pub outdir: PathBuf,

    /// Directory receiving checkpoints; defaults to `outdir`.
    #[serde(default)]
    pub checkpoint_dir: Option<PathBuf>,

    /// Checkpoint to restore from at instantiation.
    #[serde(default)]
    pub restore: Option<PathBuf>,

    /// Send terminal output to a file instead of stdout.
    #[serde(default)]
    pub write_terminal_output: bool,
}

impl RunConfig {
    fn default_outdir() -> PathBuf {
        PathBuf::from(defaults::OUTDIR)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            outdir: Self::default_outdir(),
            checkpoint_dir: None,
            restore: None,
            write_terminal_output: false,
        }
    }
}
