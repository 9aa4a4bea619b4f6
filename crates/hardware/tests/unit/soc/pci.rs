//! # PCI Tests
//!
//! Address allocation, device ordering and interconnect sealing.

use std::path::PathBuf;

use fsbricks_core::bridge::ConnectionDescriptor;
use fsbricks_core::common::constants::COW_TABLE_SIZE;
use fsbricks_core::common::error::{ConfigError, TopologyError};
use fsbricks_core::soc::interconnect::{AttachError, Interconnect};
use fsbricks_core::soc::pci::{PCI_CAPACITY, PciAddress, PciDevice, PciHost, ordered_devices};
use pretty_assertions::assert_eq;

fn disk(name: &str) -> PathBuf {
    PathBuf::from(name)
}

#[test]
fn test_host_allocates_sequentially_from_one() {
    let mut host = PciHost::new();
    let first = host.allocate().unwrap();
    let second = host.allocate().unwrap();
    assert_eq!(first, PciAddress { bus: 0, device: 1, function: 0 });
    assert_eq!(second.device, 2);
    assert_eq!(host.allocated(), 2);
    assert_eq!(second.to_string(), "00:02.0");
}

#[test]
fn test_host_runs_out() {
    let mut host = PciHost::new();
    for _ in 0..PCI_CAPACITY {
        assert!(host.allocate().is_some());
    }
    assert_eq!(host.allocate(), None);
    assert_eq!(host.allocated(), PCI_CAPACITY);
}

#[test]
fn test_ordered_devices_locals_then_bridges() {
    let bridges = [
        ConnectionDescriptor::connect("/tmp/nic.sock"),
        ConnectionDescriptor::listen("/tmp/acc.sock", "/dev/shm/acc"),
    ];
    let devices = ordered_devices(&[disk("root.img"), disk("data.img")], &bridges).unwrap();
    let kinds: Vec<_> = devices.iter().map(PciDevice::kind).collect();
    assert_eq!(kinds, ["virtio-block", "virtio-block", "bridge", "bridge"]);

    let PciDevice::LocalBlock(root) = &devices[0] else {
        panic!("expected local block device first");
    };
    assert_eq!(root.backing_file(), disk("root.img").as_path());
    assert!(root.image.child.read_only);
    assert_eq!(root.image.table_size, COW_TABLE_SIZE);

    let PciDevice::Bridge(acc) = &devices[3] else {
        panic!("expected bridge last");
    };
    assert!(acc.listen);
    assert_eq!(acc.uxsocket_path, "/tmp/acc.sock");
    assert_eq!(acc.shm_path.as_deref(), Some("/dev/shm/acc"));
}

#[test]
fn test_ordered_devices_capacity() {
    let disks: Vec<_> = (0..=PCI_CAPACITY).map(|i| disk(&format!("{i}.img"))).collect();
    assert!(matches!(
        ordered_devices(&disks, &[]),
        Err(ConfigError::TooManyPciDevices { requested: 32, limit: 31 })
    ));
}

#[test]
fn test_interconnect_assigns_increasing_bus_ids() {
    let mut bus = Interconnect::new();
    let devices =
        ordered_devices(&[disk("a.img")], &[ConnectionDescriptor::connect("/s")]).unwrap();
    for device in devices {
        bus.attach_pci(device).unwrap();
    }
    let ids: Vec<u8> = bus.devices().iter().map(|a| a.bus_id).collect();
    assert_eq!(ids, [1, 2]);
    assert!(bus.devices().iter().all(|a| a.bus_id == a.address.device));
}

#[test]
fn test_interconnect_sealed_after_connect() {
    let mut bus = Interconnect::new();
    assert!(!bus.is_connected());
    bus.connect().unwrap();
    assert!(bus.is_connected());

    let device = PciDevice::Bridge((&ConnectionDescriptor::connect("/late")).into());
    assert!(matches!(
        bus.attach_pci(device),
        Err(AttachError::Topology(TopologyError::InterconnectSealed))
    ));
    assert!(matches!(bus.connect(), Err(TopologyError::AlreadyConnected)));
    assert!(bus.devices().is_empty());
}
