//! Common utilities and types shared by the composer.
//!
//! This module provides:
//! 1. **Error Handling:** The configuration, descriptor, topology and run error taxonomy.
//! 2. **Constants:** Platform addresses, PCI numbering and PPI ranges.
//! 3. **Units:** Parsing of memory sizes, frequencies and voltages.

/// Platform constants.
pub mod constants;

/// Error types for every composer stage.
pub mod error;

/// Human-readable quantity parsing.
pub mod units;

pub use error::{
    ComposeError, ConfigError, DescriptorError, DescriptorFault, KernelError, RunError,
    TopologyError,
};
