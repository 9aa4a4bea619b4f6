//! Platform constants for the simulated Arm machine.
//!
//! Addresses follow the VExpress-style platform layout used by the full-system
//! Arm model: DRAM starts at 2 GiB, and the boot loader finds the device tree at a
//! fixed offset from the start of DRAM.

/// First byte of DRAM.
pub const MEM_BASE: u64 = 0x8000_0000;

/// Size of the platform's DRAM window (510 GiB).
pub const MEM_WINDOW: u64 = 510 << 30;

/// Channel interleaving granularity in bytes.
pub const MEM_INTERLEAVE_BYTES: u64 = 128;

/// Most memory channels a single memory system may interleave across.
pub const MAX_MEM_CHANNELS: u32 = 64;

/// Most cores a machine may have in total.
pub const MAX_CORES: u32 = 256;

/// Offset added to boot loader and kernel load addresses.
pub const BOOT_LOAD_OFFSET: u64 = MEM_BASE;

/// Offset from the load base at which the device tree (ATAGS area) is placed.
pub const BOOT_DTB_OFFSET: u64 = 0x0800_0000;

/// Device number given to the first PCI function attached to the host bridge.
pub const PCI_DEVICE_BASE: u8 = 1;

/// Largest device number on a PCI bus.
pub const PCI_DEVICE_MAX: u8 = 31;

/// PCI bus every device is attached to.
pub const PCI_BUS: u8 = 0;

/// Lowest valid private peripheral interrupt number.
pub const PPI_MIN: u32 = 16;

/// Highest valid private peripheral interrupt number.
pub const PPI_MAX: u32 = 31;

/// TCP port of the simulated serial terminal.
pub const TERMINAL_PORT: u16 = 3456;

/// Entries in each copy-on-write disk overlay table.
pub const COW_TABLE_SIZE: u32 = 65536;

/// File name of the generated device-tree source inside the output directory.
pub const GENERATED_DTS_NAME: &str = "system.dts";

/// File name of the topology dump inside the output directory.
pub const CONFIG_DUMP_NAME: &str = "config.json";

/// Prefix of checkpoint directory names; the simulated tick is appended.
pub const CHECKPOINT_PREFIX: &str = "cpt.";

/// Base of the PL011 UART backing the terminal.
pub const UART_BASE: u64 = 0x1c09_0000;

/// Size of the UART register window.
pub const UART_SIZE: u64 = 0x1000;

/// Base of the PCI host bridge's ECAM configuration window.
pub const PCI_ECAM_BASE: u64 = 0x3000_0000;

/// Size of the ECAM configuration window.
pub const PCI_ECAM_SIZE: u64 = 0x1000_0000;
