//! # Memory System Tests

use fsbricks_core::common::constants::{MAX_MEM_CHANNELS, MEM_BASE, MEM_WINDOW};
use fsbricks_core::common::error::ConfigError;
use fsbricks_core::soc::memory::{MemType, MemorySystem};
use rstest::rstest;

#[test]
fn test_default_memory() {
    let mem = MemorySystem::new(MemType::default(), "2GB", 1, None).unwrap();
    assert_eq!(mem.base, MEM_BASE);
    assert_eq!(mem.size, 2 << 30);
    assert_eq!(mem.end(), MEM_BASE + (2 << 30));
    assert_eq!(mem.channels.len(), 1);
    assert_eq!(mem.channels[0].intlv_bits, 0);
    assert!(mem.contains(MEM_BASE));
    assert!(!mem.contains(mem.end()));
    assert!(!mem.contains(MEM_BASE - 1));
}

#[test]
fn test_channels_interleave() {
    let mem = MemorySystem::new(MemType::Ddr4_2400_8x8, "4GiB", 4, Some(2)).unwrap();
    assert_eq!(mem.channels.len(), 4);
    for (i, channel) in mem.channels.iter().enumerate() {
        assert_eq!(channel.index as usize, i);
        assert_eq!(channel.intlv_bits, 2);
        assert_eq!(channel.intlv_low_bit, 7);
        assert_eq!(channel.ranks, Some(2));
        assert_eq!(channel.mem_type, MemType::Ddr4_2400_8x8);
    }
}

#[rstest]
#[case(0)]
#[case(3)]
#[case(6)]
fn test_channels_must_be_power_of_two(#[case] channels: u32) {
    assert!(matches!(
        MemorySystem::new(MemType::default(), "2GB", channels, None),
        Err(ConfigError::ChannelsNotPowerOfTwo(c)) if c == channels
    ));
}

#[rstest]
#[case("2GB", 2_147_483_648, MAX_MEM_CHANNELS)]
#[case("2GB", MAX_MEM_CHANNELS * 2, MAX_MEM_CHANNELS)]
#[case("256", 4, 2)]
fn test_channel_ceiling(#[case] size: &str, #[case] channels: u32, #[case] expected_limit: u32) {
    assert!(matches!(
        MemorySystem::new(MemType::default(), size, channels, None),
        Err(ConfigError::TooManyChannels { requested, limit })
            if requested == channels && limit == expected_limit
    ));
}

#[test]
fn test_channel_ceiling_is_inclusive() {
    let mem = MemorySystem::new(MemType::default(), "2GB", MAX_MEM_CHANNELS, None).unwrap();
    assert_eq!(mem.channels.len(), MAX_MEM_CHANNELS as usize);
    let small = MemorySystem::new(MemType::default(), "256", 2, None).unwrap();
    assert_eq!(small.channels.len(), 2);
}

#[test]
fn test_ranks_rules() {
    assert!(matches!(
        MemorySystem::new(MemType::SimpleMemory, "2GB", 1, Some(1)),
        Err(ConfigError::RanksUnsupported(MemType::SimpleMemory))
    ));
    assert!(matches!(
        MemorySystem::new(MemType::default(), "2GB", 1, Some(0)),
        Err(ConfigError::ZeroRanks)
    ));
    assert!(MemorySystem::new(MemType::SimpleMemory, "2GB", 1, None).is_ok());
}

#[test]
fn test_size_limits() {
    assert!(MemorySystem::new(MemType::default(), "510GiB", 1, None).is_ok());
    assert!(matches!(
        MemorySystem::new(MemType::default(), "511GiB", 1, None),
        Err(ConfigError::MemoryTooLarge { limit, .. }) if limit == MEM_WINDOW
    ));
    assert!(matches!(
        MemorySystem::new(MemType::default(), "lots", 1, None),
        Err(ConfigError::InvalidSize(_))
    ));
}

#[test]
fn test_mem_type_names() {
    assert_eq!("LPDDR3_1600_1x32".parse::<MemType>().unwrap(), MemType::Lpddr3_1600_1x32);
    assert_eq!(MemType::Hbm1000_4h1x64.to_string(), "HBM_1000_4H_1x64");
    assert!("DDR9".parse::<MemType>().is_err());
    assert!(MemType::ALL.iter().filter(|t| !t.is_dram()).eq([&MemType::SimpleMemory]));
}
