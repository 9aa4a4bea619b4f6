//! PCI device configurations and host-bridge numbering.
//!
//! Each device kind has its own validated configuration struct instead of free-form
//! keyword construction:
//! 1. **Local block devices:** A VirtIO block function over a copy-on-write disk image, so
//!    guest writes never reach the backing file.
//! 2. **Bridge devices:** A PCI function implemented by an external peer simulator, reached
//!    through a [`ConnectionDescriptor`].
//!
//! [`PciHost`] hands out device numbers on bus 0 in attach order, starting at
//! [`PCI_DEVICE_BASE`]. Identical arguments therefore always yield identical numbering,
//! which checkpoint restore relies on.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::bridge::{ConnectionDescriptor, LinkMode};
use crate::common::constants::{COW_TABLE_SIZE, PCI_BUS, PCI_DEVICE_BASE, PCI_DEVICE_MAX};
use crate::common::error::ConfigError;

/// Maximum number of functions the host bridge can number.
pub const PCI_CAPACITY: usize = (PCI_DEVICE_MAX - PCI_DEVICE_BASE + 1) as usize;

/// Bus/device/function triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PciAddress {
    /// Bus number.
    pub bus: u8,
    /// Device number on the bus.
    pub device: u8,
    /// Function number within the device.
    pub function: u8,
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{}", self.bus, self.device, self.function)
    }
}

/// Read-only raw image underneath a copy-on-write overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawDiskImage {
    /// Backing file.
    pub image_file: PathBuf,
    /// Always `true`: the backing file is never written.
    pub read_only: bool,
}

/// Copy-on-write overlay; writes land in memory, reads fall through to the child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CowDiskImage {
    /// Backing image.
    pub child: RawDiskImage,
    /// Overlay table entries.
    pub table_size: u32,
}

impl CowDiskImage {
    /// Wraps `image_file` in a fresh overlay.
    pub fn over(image_file: impl Into<PathBuf>) -> Self {
        Self {
            child: RawDiskImage {
                image_file: image_file.into(),
                read_only: true,
            },
            table_size: COW_TABLE_SIZE,
        }
    }
}

/// VirtIO block function backed by a local disk image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalBlockDevice {
    /// Copy-on-write image presented to the guest.
    pub image: CowDiskImage,
}

impl LocalBlockDevice {
    /// Creates a block device over `image_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyDiskImage`] (tagged with `position`) when the path is empty.
    pub fn new(image_path: &Path, position: usize) -> Result<Self, ConfigError> {
        if image_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDiskImage(position));
        }
        Ok(Self {
            image: CowDiskImage::over(image_path),
        })
    }

    /// The file the overlay reads from.
    pub fn backing_file(&self) -> &Path {
        &self.image.child.image_file
    }
}

/// PCI function simulated by an external peer.
///
/// Field names follow the parameters the bridge transport consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeDevice {
    /// Whether this side listens for the peer.
    pub listen: bool,
    /// Unix socket used to exchange the handshake.
    pub uxsocket_path: String,
    /// Shared-memory region offered when listening.
    pub shm_path: Option<String>,
    /// Lock-step synchronisation.
    pub sync: bool,
    /// Raw barrier interval forwarded to the transport.
    pub sync_tx_interval: Option<String>,
    /// Raw wire delay forwarded to the transport.
    pub link_latency: Option<String>,
}

impl From<&ConnectionDescriptor> for BridgeDevice {
    fn from(d: &ConnectionDescriptor) -> Self {
        Self {
            listen: d.mode() == LinkMode::Listen,
            uxsocket_path: d.socket_path().to_string(),
            shm_path: d.shm_path().map(str::to_string),
            sync: d.sync,
            sync_tx_interval: d.sync_interval.clone(),
            link_latency: d.link_latency.clone(),
        }
    }
}

/// A device destined for the PCI host bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PciDevice {
    /// Local VirtIO block device.
    LocalBlock(LocalBlockDevice),
    /// Externally simulated device behind a bridge link.
    Bridge(BridgeDevice),
}

impl PciDevice {
    /// Short label used in logs and the device tree.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LocalBlock(_) => "virtio-block",
            Self::Bridge(_) => "bridge",
        }
    }

    /// Vendor/device compatible string for the device tree.
    pub const fn compatible(&self) -> &'static str {
        match self {
            Self::LocalBlock(_) => "virtio,pci-block",
            Self::Bridge(_) => "simbricks,pci",
        }
    }
}

/// A device together with the address it was attached at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PciAttachment {
    /// Sequential ID assigned at attach time; equals `address.device`.
    pub bus_id: u8,
    /// Full bus/device/function address.
    pub address: PciAddress,
    /// The attached device.
    pub device: PciDevice,
}

/// Numbering authority of the PCI host bridge.
#[derive(Debug, Clone, Serialize)]
pub struct PciHost {
    next_device: u8,
}

impl Default for PciHost {
    fn default() -> Self {
        Self {
            next_device: PCI_DEVICE_BASE,
        }
    }
}

impl PciHost {
    /// Creates a host with no devices attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next address on bus 0, or `None` once the bus is full.
    pub fn allocate(&mut self) -> Option<PciAddress> {
        if self.next_device > PCI_DEVICE_MAX {
            return None;
        }
        let address = PciAddress {
            bus: PCI_BUS,
            device: self.next_device,
            function: 0,
        };
        self.next_device += 1;
        Some(address)
    }

    /// Number of addresses handed out so far.
    pub const fn allocated(&self) -> usize {
        (self.next_device - PCI_DEVICE_BASE) as usize
    }
}

/// Builds the ordered device list: every local image first, then every bridge link.
///
/// # Errors
///
/// Returns [`ConfigError::TooManyPciDevices`] when the list exceeds the host bridge's
/// capacity, or [`ConfigError::EmptyDiskImage`] for an empty image path.
pub fn ordered_devices(
    disk_images: &[PathBuf],
    bridges: &[ConnectionDescriptor],
) -> Result<Vec<PciDevice>, ConfigError> {
    let requested = disk_images.len() + bridges.len();
    if requested > PCI_CAPACITY {
        return Err(ConfigError::TooManyPciDevices {
            requested,
            limit: PCI_CAPACITY,
        });
    }

    let mut devices = Vec::with_capacity(requested);
    for (position, image) in disk_images.iter().enumerate() {
        devices.push(PciDevice::LocalBlock(LocalBlockDevice::new(image, position)?));
    }
    devices.extend(bridges.iter().map(|d| PciDevice::Bridge(BridgeDevice::from(d))));
    Ok(devices)
}
