//! Boot orchestration.
//!
//! This module derives everything the guest needs to boot from a finished machine. It
//! provides:
//! 1. **Boot loader:** Placement of the loader image and its DTB pointer inside memory.
//! 2. **Device tree:** Either the caller's blob or a tree generated from the machine and
//!    persisted into the output directory.
//! 3. **Command line:** The fixed argument list plus an optional suffix.
//! 4. **Workload:** Kernel, initrd and boot script wiring.

/// Kernel command line.
pub mod cmdline;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::common::constants::{BOOT_DTB_OFFSET, BOOT_LOAD_OFFSET, GENERATED_DTS_NAME};
use crate::common::error::TopologyError;
use crate::config::BootConfig;
use crate::sim::context::RunContext;
use crate::soc::builder::Machine;
use crate::soc::devicetree::DeviceTree;

pub use cmdline::KernelCommandLine;

/// Boot loader image and where it is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootLoader {
    /// Loader image.
    pub image: PathBuf,
    /// Physical load address.
    pub load_offset: u64,
    /// Physical address the loader reads the DTB from.
    pub dtb_addr: u64,
}

impl BootLoader {
    /// Places `image` against the finished `machine`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InterconnectPending`] if the interconnect is not connected
    /// yet, and [`TopologyError::BootLoaderOutOfRange`] if the load or DTB address falls
    /// outside memory.
    pub fn setup(image: &Path, machine: &Machine) -> Result<Self, TopologyError> {
        if !machine.interconnect.is_connected() {
            return Err(TopologyError::InterconnectPending);
        }
        let memory = &machine.memory;
        let load_offset = BOOT_LOAD_OFFSET;
        let dtb_addr = load_offset + BOOT_DTB_OFFSET;
        for addr in [load_offset, dtb_addr] {
            if !memory.contains(addr) {
                return Err(TopologyError::BootLoaderOutOfRange {
                    addr,
                    base: memory.base,
                    end: memory.end(),
                });
            }
        }
        debug!(load_offset, dtb_addr, "boot loader placed");
        Ok(Self {
            image: image.to_path_buf(),
            load_offset,
            dtb_addr,
        })
    }
}

/// Source of the device tree handed to the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "path", rename_all = "snake_case")]
pub enum DeviceTreeBlob {
    /// Caller-supplied blob, used as is.
    Supplied(PathBuf),
    /// Tree generated from the machine and persisted at this path.
    Generated(PathBuf),
}

impl DeviceTreeBlob {
    /// Uses `supplied` if given, otherwise generates the tree from `machine` into the
    /// output directory.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InterconnectPending`] when generating from an unfinished
    /// machine, or [`TopologyError::Persist`] if the tree cannot be written.
    pub fn resolve(
        supplied: Option<&Path>,
        machine: &Machine,
        ctx: &RunContext,
    ) -> Result<Self, TopologyError> {
        if let Some(path) = supplied {
            return Ok(Self::Supplied(path.to_path_buf()));
        }
        if !machine.interconnect.is_connected() {
            return Err(TopologyError::InterconnectPending);
        }
        let path = ctx
            .output_file(GENERATED_DTS_NAME)
            .map_err(|source| TopologyError::Persist {
                path: ctx.outdir().join(GENERATED_DTS_NAME),
                source,
            })?;
        fs::write(&path, DeviceTree::from_machine(machine).to_string()).map_err(|source| {
            TopologyError::Persist {
                path: path.clone(),
                source,
            }
        })?;
        info!(path = %path.display(), "generated device tree");
        Ok(Self::Generated(path))
    }

    /// Path of the tree.
    pub fn path(&self) -> &Path {
        match self {
            Self::Supplied(path) | Self::Generated(path) => path,
        }
    }
}

/// Everything the kernel needs to boot the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workload {
    /// Guest kernel image.
    pub kernel: PathBuf,
    /// Boot loader placement.
    pub boot_loader: BootLoader,
    /// Device tree.
    pub dtb: DeviceTreeBlob,
    /// Initial ramdisk; absent unless one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initrd: Option<PathBuf>,
    /// Guest command line.
    pub command_line: KernelCommandLine,
    /// Script the guest reads after boot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readfile: Option<PathBuf>,
}

/// Derives the workload from a finished machine: boot loader first, then the device tree.
///
/// # Errors
///
/// See [`BootLoader::setup`] and [`DeviceTreeBlob::resolve`].
pub fn orchestrate(
    machine: &Machine,
    boot: &BootConfig,
    ctx: &RunContext,
) -> Result<Workload, TopologyError> {
    let boot_loader = BootLoader::setup(&boot.bootloader, machine)?;
    let dtb = DeviceTreeBlob::resolve(boot.dtb.as_deref(), machine, ctx)?;
    let command_line = KernelCommandLine::new(boot.cmdline_append.as_deref());
    debug!(%command_line, "kernel command line");
    Ok(Workload {
        kernel: boot.kernel.clone(),
        boot_loader,
        dtb,
        initrd: boot.initrd.clone(),
        command_line,
        readfile: boot.script.clone(),
    })
}
