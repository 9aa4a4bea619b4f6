//! Machine topology.
//!
//! This module organizes the hardware description of the composed system: CPU models and
//! clusters, the memory system, PCI devices and the interconnect they hang off, the
//! generated device tree, and the builder that assembles them in order.

/// Topology builder and top-level `SystemTopology` type.
pub mod builder;

/// CPU clusters, cores, PMUs and clock domains.
pub mod cluster;

/// CPU variants, models and the registry mapping one to the other.
pub mod cpu;

/// Device-tree generation.
pub mod devicetree;

/// System buses and PCI host bridge.
pub mod interconnect;

/// Memory types, channels and the memory system.
pub mod memory;

/// PCI devices and addressing.
pub mod pci;

pub use builder::{Machine, SystemTopology, TopologyBuilder};
