//! Error taxonomy for machine composition and simulation driving.
//!
//! This module defines every failure the composer can surface. It provides:
//! 1. **Configuration errors:** Invalid paths, enum choices and out-of-range values, all fatal
//!    before any topology object exists.
//! 2. **Descriptor errors:** Syntax violations in bridge-link descriptors, carrying the
//!    offending input.
//! 3. **Topology errors:** Violations of the construction order and placement failures while
//!    wiring.
//! 4. **Run errors:** Failures reported by the external simulation kernel and misuse of the
//!    run loop.
//!
//! A terminal exit reported by the kernel is not an error; see [`crate::sim::RunOutcome`].

use std::io;
use std::path::PathBuf;

use crate::soc::cpu::CpuVariant;
use crate::soc::memory::MemType;

/// Invalid or inconsistent configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required path (kernel, boot loader) was empty.
    #[error("missing required path: {0}")]
    MissingPath(&'static str),

    /// A boot script was given but does not exist on disk.
    #[error("bootscript {} does not exist", .0.display())]
    MissingBootScript(PathBuf),

    /// The PMU interrupt number is not a private peripheral interrupt.
    #[error("{0} is not a valid Arm PPI number (expected 16..=31)")]
    InvalidPpi(u32),

    /// A memory size string could not be parsed.
    #[error("invalid memory size '{0}'")]
    InvalidSize(String),

    /// A clock frequency string could not be parsed or was zero.
    #[error("invalid frequency '{0}'")]
    InvalidFrequency(String),

    /// A voltage string could not be parsed or was not positive.
    #[error("invalid voltage '{0}'")]
    InvalidVoltage(String),

    /// A cluster must contain at least one core.
    #[error("a CPU cluster needs at least one core")]
    NoCores,

    /// More cores than the machine supports.
    #[error("{requested} cores requested, at most {limit} are supported")]
    TooManyCores {
        /// Requested core count.
        requested: u32,
        /// Largest supported core count.
        limit: u32,
    },

    /// More memory channels than the memory can be interleaved across.
    #[error("{requested} memory channels requested, at most {limit} fit this memory")]
    TooManyChannels {
        /// Requested channel count.
        requested: u32,
        /// Largest channel count for the requested size.
        limit: u32,
    },

    /// Memory channels are interleaved by address bits and must be a power of two.
    #[error("number of memory channels must be a power of 2 (got {0})")]
    ChannelsNotPowerOfTwo(u32),

    /// Ranks were requested for a memory type that has none.
    #[error("memory ranks are only configurable for DRAM interfaces, not {0}")]
    RanksUnsupported(MemType),

    /// Ranks per channel must be at least one.
    #[error("ranks per channel must be at least 1")]
    ZeroRanks,

    /// The requested memory does not fit the platform's memory window.
    #[error("memory size {requested:#x} exceeds the platform window of {limit:#x} bytes")]
    MemoryTooLarge {
        /// Requested size in bytes.
        requested: u64,
        /// Largest supported size in bytes.
        limit: u64,
    },

    /// A string did not name any member of an enumerated choice.
    #[error("invalid choice '{value}' for {what} (expected one of: {expected})")]
    InvalidChoice {
        /// Kind of value being parsed, e.g. `"cpu"`.
        what: &'static str,
        /// The rejected input.
        value: String,
        /// Comma-separated valid values.
        expected: String,
    },

    /// More PCI functions were requested than the host bridge can number.
    #[error("{requested} PCI devices requested, but at most {limit} can be attached")]
    TooManyPciDevices {
        /// Number of local images plus bridge links.
        requested: usize,
        /// Host bridge capacity.
        limit: usize,
    },

    /// A local disk image path was empty.
    #[error("empty disk image path at position {0}")]
    EmptyDiskImage(usize),

    /// The injected registry has no model for this CPU variant.
    #[error("CPU variant '{0}' is not registered")]
    UnregisteredCpu(CpuVariant),

    /// A registry entry violates the cache/memory-mode invariant.
    #[error("CPU model '{model}' declares caches but runs in atomic memory mode")]
    CachesWithoutTiming {
        /// Offending model name.
        model: &'static str,
    },
}

/// Why a bridge-link descriptor was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorFault {
    /// The leading token was neither `connect` nor `listen`.
    #[error("unknown mode '{0}'")]
    UnknownMode(String),

    /// Too few positional fields followed the mode token.
    #[error("mode '{mode}' needs {expected} positional field(s), found {found}")]
    MissingPositional {
        /// Mode token that was matched.
        mode: &'static str,
        /// Positional fields required by that mode.
        expected: usize,
        /// Positional fields present.
        found: usize,
    },

    /// A trailing field matched none of the known modifiers.
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
}

/// A bridge-link descriptor that violates the descriptor grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bridge descriptor '{input}' is malformed: {fault}")]
pub struct DescriptorError {
    /// The descriptor exactly as supplied.
    pub input: String,
    /// The first violation found.
    pub fault: DescriptorFault,
}

/// Failures while assembling the machine.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// A device was attached after the interconnect had been connected.
    #[error("cannot attach PCI device after the system interconnect has been connected")]
    InterconnectSealed,

    /// The interconnect was connected twice.
    #[error("system interconnect is already connected")]
    AlreadyConnected,

    /// Boot wiring was requested before the interconnect was connected.
    #[error("boot loader cannot be configured before the system interconnect is connected")]
    InterconnectPending,

    /// A boot loader address does not fall inside memory.
    #[error("boot loader address {addr:#x} falls outside memory {base:#x}..{end:#x}")]
    BootLoaderOutOfRange {
        /// Offending address.
        addr: u64,
        /// First byte of memory.
        base: u64,
        /// One past the last byte of memory.
        end: u64,
    },

    /// Persisting a generated artifact failed.
    #[error("failed to write {}: {source}", .path.display())]
    Persist {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// An error reported by the external simulation kernel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("simulation kernel error: {message}")]
pub struct KernelError {
    /// Human-readable description from the kernel.
    pub message: String,
}

impl KernelError {
    /// Creates a kernel error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failures while driving the simulation.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The kernel failed to instantiate, step or checkpoint.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// The run loop already reached its terminal state.
    #[error("run loop is stopped; relaunch with a restore path to continue")]
    Stopped,

    /// The checkpoint directory could not be created.
    #[error("failed to create checkpoint directory {}: {source}", .path.display())]
    CheckpointDir {
        /// Directory being created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Any error that can end a composer invocation.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Malformed bridge descriptor.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    /// Construction-order or placement failure.
    #[error(transparent)]
    Topology(#[from] TopologyError),
    /// Simulation driving failure.
    #[error(transparent)]
    Run(#[from] RunError),
}
