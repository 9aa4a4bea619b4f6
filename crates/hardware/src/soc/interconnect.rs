//! System interconnect and PCI attachment.
//!
//! This module models the memory bus, the I/O bus behind it and the PCI host bridge on
//! the I/O bus. It provides:
//! 1. **Device attachment:** Each PCI device gets the next host-bridge address and an I/O
//!    bus port, in call order.
//! 2. **Connection:** [`Interconnect::connect`] wires the buses together and seals them;
//!    devices attached afterwards would never be reachable, so attaching is then refused.

use serde::Serialize;
use tracing::debug;

use crate::common::error::{ConfigError, TopologyError};
use crate::soc::pci::{PCI_CAPACITY, PciAddress, PciAttachment, PciDevice, PciHost};

/// Connection state of the system buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusState {
    /// Accepting device attachments.
    Open,
    /// Wired; the device set is final.
    Connected,
}

/// Memory bus, I/O bus and PCI host bridge.
#[derive(Debug, Clone, Serialize)]
pub struct Interconnect {
    host: PciHost,
    devices: Vec<PciAttachment>,
    state: BusState,
}

impl Default for Interconnect {
    fn default() -> Self {
        Self {
            host: PciHost::new(),
            devices: Vec::new(),
            state: BusState::Open,
        }
    }
}

impl Interconnect {
    /// Creates an open interconnect with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `device` to the PCI host and returns its address.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InterconnectSealed`] once [`Self::connect`] has run, and
    /// [`ConfigError::TooManyPciDevices`] when the host bridge is out of device numbers.
    pub fn attach_pci(&mut self, device: PciDevice) -> Result<PciAddress, AttachError> {
        if self.state == BusState::Connected {
            return Err(AttachError::Topology(TopologyError::InterconnectSealed));
        }
        let address = self.host.allocate().ok_or_else(|| {
            AttachError::Config(ConfigError::TooManyPciDevices {
                requested: self.devices.len() + 1,
                limit: PCI_CAPACITY,
            })
        })?;
        debug!(%address, kind = device.kind(), "attached PCI device");
        self.devices.push(PciAttachment {
            bus_id: address.device,
            address,
            device,
        });
        Ok(address)
    }

    /// Wires the buses; the attached device set becomes final.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::AlreadyConnected`] when called twice.
    pub fn connect(&mut self) -> Result<(), TopologyError> {
        if self.state == BusState::Connected {
            return Err(TopologyError::AlreadyConnected);
        }
        self.state = BusState::Connected;
        debug!(devices = self.devices.len(), "system interconnect connected");
        Ok(())
    }

    /// Whether [`Self::connect`] has run.
    pub fn is_connected(&self) -> bool {
        self.state == BusState::Connected
    }

    /// Attached devices in attach order.
    pub fn devices(&self) -> &[PciAttachment] {
        &self.devices
    }
}

/// Why a PCI attachment was refused.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    /// The host bridge ran out of device numbers.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The interconnect was already connected.
    #[error(transparent)]
    Topology(#[from] TopologyError),
}
