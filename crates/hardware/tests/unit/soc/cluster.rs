//! # CPU Cluster Tests
//!
//! Core numbering limits and PMU interrupt wiring.

use fsbricks_core::common::constants::{MAX_CORES, PPI_MAX, PPI_MIN};
use fsbricks_core::common::error::ConfigError;
use fsbricks_core::soc::cluster::{ClockDomain, CpuCluster, Pmu};
use fsbricks_core::soc::cpu::{CpuModel, MemoryMode};
use proptest::prelude::*;
use rstest::rstest;

fn cluster(num_cores: u32, first_core_id: u32) -> Result<CpuCluster, ConfigError> {
    let model = CpuModel::uncached("AtomicSimpleCPU", MemoryMode::Atomic);
    let clock = ClockDomain::parse("4GHz", "1.0V").unwrap();
    CpuCluster::new(model, num_cores, first_core_id, clock, None)
}

#[test]
fn test_cores_numbered_from_first_id() {
    let cluster = cluster(3, 4).unwrap();
    let ids: Vec<u32> = cluster.cores.iter().map(|c| c.id).collect();
    assert_eq!(ids, [4, 5, 6]);
}

#[test]
fn test_zero_cores_rejected() {
    assert!(matches!(cluster(0, 0), Err(ConfigError::NoCores)));
}

#[rstest]
#[case(MAX_CORES + 1, 0, MAX_CORES)]
#[case(u32::MAX, 0, MAX_CORES)]
#[case(2, MAX_CORES - 1, 1)]
#[case(1, u32::MAX, 0)]
fn test_core_ceiling(#[case] num_cores: u32, #[case] first: u32, #[case] expected_limit: u32) {
    assert!(matches!(
        cluster(num_cores, first),
        Err(ConfigError::TooManyCores { requested, limit })
            if requested == num_cores && limit == expected_limit
    ));
}

#[test]
fn test_core_ceiling_is_inclusive() {
    assert_eq!(cluster(MAX_CORES, 0).unwrap().len(), MAX_CORES as usize);
}

#[rstest]
#[case(0)]
#[case(PPI_MIN - 1)]
#[case(PPI_MAX + 1)]
fn test_pmu_rejects_non_ppi(#[case] ppi: u32) {
    assert!(matches!(Pmu::new(ppi), Err(ConfigError::InvalidPpi(p)) if p == ppi));
}

#[test]
fn test_add_pmus_rejects_non_ppi_without_wiring() {
    let mut cluster = cluster(2, 0).unwrap();
    assert!(cluster.add_pmus(15).is_err());
    assert!(cluster.cores.iter().all(|c| c.pmu.is_none()));
}

proptest! {
    #[test]
    fn test_pmu_gic_index_in_range(ppi in PPI_MIN..=PPI_MAX) {
        let pmu = Pmu::new(ppi).unwrap();
        prop_assert_eq!(pmu.ppi(), ppi);
        prop_assert_eq!(pmu.gic_ppi_index(), ppi - PPI_MIN);
        prop_assert!(pmu.gic_ppi_index() < 16);
    }
}
