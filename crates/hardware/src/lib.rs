//! Full-system machine composer for an Arm simulator with external co-simulation links.
//!
//! This crate turns a flat configuration into a machine the simulation kernel can run:
//! 1. **Bridge:** Parses the descriptor mini-language naming external PCI bridge links.
//! 2. **SoC:** Resolves the CPU model and memory mode, then wires memory, PCI devices,
//!    the interconnect, CPU clusters and caches in a fixed order.
//! 3. **Boot:** Derives the boot loader placement, device tree and kernel command line.
//! 4. **Simulation:** Hands the topology to the kernel and runs a single phase, taking a
//!    checkpoint or reporting the terminal exit.

/// Bridge descriptor parsing.
pub mod bridge;
/// Boot loader, device tree and command line wiring.
pub mod boot;
/// Errors, constants and unit parsing.
pub mod common;
/// Composer configuration (defaults, sections, validation).
pub mod config;
/// Run context, kernel seam and run loop.
pub mod sim;
/// Machine topology (CPU, memory, PCI, interconnect, device tree, builder).
pub mod soc;

/// Root configuration type; construct with `Config::new` or deserialize from JSON.
pub use crate::config::Config;
/// Umbrella error returned by composition and runs.
pub use crate::common::error::ComposeError;
/// Finished machine plus boot workload.
pub use crate::soc::{SystemTopology, TopologyBuilder};
