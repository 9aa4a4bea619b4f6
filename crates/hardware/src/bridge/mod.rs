//! Co-simulation bridge links.
//!
//! Parses the descriptors that name external PCI peers connected over a synchronised
//! transport. Only the configuration contract lives here; the transport itself belongs to
//! the simulation kernel.

/// Descriptor grammar, parser and canonical formatting.
pub mod descriptor;

pub use descriptor::{ConnectionDescriptor, LinkEndpoint, LinkMode, parse_descriptors};
