/// Topology builder: construction order, bus IDs, caches and PMUs.
pub mod builder;

/// CPU clusters: core limits and PMU wiring.
pub mod cluster;



/// Memory system validation and channel interleaving.
pub mod memory;

/// PCI numbering, device ordering and the sealed interconnect.
pub mod pci;
