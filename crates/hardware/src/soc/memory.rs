//! Main memory configuration.
//!
//! This module turns the memory flags into a [`MemorySystem`]: one contiguous range at
//! the platform's DRAM base, split across power-of-two channels interleaved at a fixed
//! granularity, each channel backed by the chosen memory interface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::constants::{MAX_MEM_CHANNELS, MEM_BASE, MEM_INTERLEAVE_BYTES, MEM_WINDOW};
use crate::common::error::ConfigError;
use crate::common::units::parse_size;

macro_rules! mem_types {
    ($($variant:ident => $name:literal, dram: $dram:literal;)+) => {
        /// Memory interface model for each channel.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum MemType {
            $(
                #[doc = concat!("`", $name, "`")]
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl MemType {
            /// All interfaces, in command-line order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the command-line spelling of this interface.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Whether the interface models ranks (i.e. is a DRAM interface).
            pub const fn is_dram(self) -> bool {
                match self {
                    $(Self::$variant => $dram,)+
                }
            }
        }
    };
}

mem_types! {
    Ddr3_1600_8x8 => "DDR3_1600_8x8", dram: true;
    Ddr3_2133_8x8 => "DDR3_2133_8x8", dram: true;
    Ddr4_2400_16x4 => "DDR4_2400_16x4", dram: true;
    Ddr4_2400_8x8 => "DDR4_2400_8x8", dram: true;
    Ddr4_2400_4x16 => "DDR4_2400_4x16", dram: true;
    Lpddr2S4_1066_1x32 => "LPDDR2_S4_1066_1x32", dram: true;
    Lpddr3_1600_1x32 => "LPDDR3_1600_1x32", dram: true;
    WideIo200_1x128 => "WideIO_200_1x128", dram: true;
    Gddr5_4000_2x32 => "GDDR5_4000_2x32", dram: true;
    Hbm1000_4h1x128 => "HBM_1000_4H_1x128", dram: true;
    Hbm1000_4h1x64 => "HBM_1000_4H_1x64", dram: true;
    SimpleMemory => "SimpleMemory", dram: false;
}

impl Default for MemType {
    fn default() -> Self {
        Self::Ddr3_1600_8x8
    }
}

impl fmt::Display for MemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidChoice {
                what: "mem-type",
                value: s.to_string(),
                expected: Self::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// One memory controller and its interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryChannel {
    /// Channel index, also its interleave match value.
    pub index: u32,
    /// Interface model.
    pub mem_type: MemType,
    /// Ranks per channel, when overridden for a DRAM interface.
    pub ranks: Option<u32>,
    /// Number of address bits used to select a channel.
    pub intlv_bits: u32,
    /// Lowest address bit used for channel selection.
    pub intlv_low_bit: u32,
}

/// The machine's main memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemorySystem {
    /// First byte of memory.
    pub base: u64,
    /// Size in bytes.
    pub size: u64,
    /// Controllers, ordered by index.
    pub channels: Vec<MemoryChannel>,
}

/// Largest channel count `size` bytes can be interleaved across.
///
/// Every channel must receive at least one interleave granule.
fn max_channels(size: u64) -> u32 {
    let by_size = u32::try_from(size / MEM_INTERLEAVE_BYTES).unwrap_or(u32::MAX);
    by_size.min(MAX_MEM_CHANNELS)
}

impl MemorySystem {
    /// Builds the memory system from raw configuration values.
    ///
    /// # Arguments
    ///
    /// * `mem_type` - Interface model for every channel.
    /// * `size` - Size string such as `"2GB"`.
    /// * `channels` - Number of channels; must be a power of two.
    /// * `ranks` - Optional ranks-per-channel override; only valid for DRAM interfaces.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unparseable or oversized memory, non power-of-two
    /// channel counts, more channels than the memory can interleave across and rank
    /// overrides on non-DRAM interfaces.
    pub fn new(
        mem_type: MemType,
        size: &str,
        channels: u32,
        ranks: Option<u32>,
    ) -> Result<Self, ConfigError> {
        let size = parse_size(size)?;
        if size > MEM_WINDOW {
            return Err(ConfigError::MemoryTooLarge {
                requested: size,
                limit: MEM_WINDOW,
            });
        }
        if !channels.is_power_of_two() {
            return Err(ConfigError::ChannelsNotPowerOfTwo(channels));
        }
        let limit = max_channels(size);
        if channels > limit {
            return Err(ConfigError::TooManyChannels {
                requested: channels,
                limit,
            });
        }
        if let Some(r) = ranks {
            if !mem_type.is_dram() {
                return Err(ConfigError::RanksUnsupported(mem_type));
            }
            if r == 0 {
                return Err(ConfigError::ZeroRanks);
            }
        }

        let intlv_bits = channels.trailing_zeros();
        let intlv_low_bit = MEM_INTERLEAVE_BYTES.trailing_zeros();
        let channels = (0..channels)
            .map(|index| MemoryChannel {
                index,
                mem_type,
                ranks,
                intlv_bits,
                intlv_low_bit,
            })
            .collect();

        Ok(Self {
            base: MEM_BASE,
            size,
            channels,
        })
    }

    /// One past the last byte of memory.
    pub const fn end(&self) -> u64 {
        self.base + self.size
    }

    /// Whether `addr` falls inside memory.
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.end()
    }
}
