//! # Topology Builder Tests
//!
//! Construction order, bus-ID assignment, memory-mode and cache consistency, PMU wiring,
//! and fail-before-build validation.

use std::path::PathBuf;

use fsbricks_core::common::constants::{GENERATED_DTS_NAME, TERMINAL_PORT};
use fsbricks_core::common::error::{ComposeError, ConfigError};
use fsbricks_core::soc::builder::{TERMINAL_FILE_NAME, TerminalOutput};
use fsbricks_core::soc::cluster::{MemSide, Pmu, TarmacDest};
use fsbricks_core::soc::cpu::{CpuVariant, MemoryMode};
use fsbricks_core::soc::pci::PciDevice;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::TestContext;

#[test]
fn test_locals_first_then_bridges_with_increasing_ids() {
    let ctx = TestContext::new();
    let mut config = ctx.config();
    config.devices.bridges = vec![
        "connect:/tmp/c.sock".into(),
        "listen:/tmp/d.sock:/dev/shm/d:sync".into(),
        "connect:/tmp/e.sock:latency=500".into(),
    ];
    config.devices.disk_images = vec!["a.img".into(), "b.img".into()];

    let topology = ctx.build(&config).unwrap();
    let devices = topology.pci_devices();
    assert_eq!(devices.len(), 5);

    let ids: Vec<u8> = devices.iter().map(|a| a.bus_id).collect();
    assert_eq!(ids, [1, 2, 3, 4, 5]);

    let labels: Vec<String> = devices
        .iter()
        .map(|a| match &a.device {
            PciDevice::LocalBlock(d) => d.backing_file().display().to_string(),
            PciDevice::Bridge(b) => b.uxsocket_path.clone(),
        })
        .collect();
    assert_eq!(labels, ["a.img", "b.img", "/tmp/c.sock", "/tmp/d.sock", "/tmp/e.sock"]);
    assert!(topology.machine.interconnect.is_connected());
}

#[test]
fn test_identical_arguments_give_identical_numbering() {
    let ctx = TestContext::new();
    let mut config = ctx.config();
    config.devices.disk_images = vec!["root.img".into()];
    config.devices.bridges = vec!["connect:/tmp/x".into(), "connect:/tmp/y".into()];

    let first = ctx.build(&config).unwrap();
    let second = ctx.build(&config).unwrap();
    assert_eq!(first.pci_devices(), second.pci_devices());
}

#[rstest]
#[case(CpuVariant::Atomic, MemoryMode::Atomic)]
#[case(CpuVariant::Minor, MemoryMode::Timing)]
#[case(CpuVariant::Hpi, MemoryMode::Timing)]
#[case(CpuVariant::O3, MemoryMode::Timing)]
fn test_caches_iff_timing(#[case] variant: CpuVariant, #[case] mode: MemoryMode) {
    let ctx = TestContext::new();
    let mut config = ctx.config();
    config.cpu.variant = variant;
    config.cpu.num_cores = 2;

    let topology = ctx.build(&config).unwrap();
    assert_eq!(topology.memory_mode(), mode);
    assert_eq!(topology.memory_mode(), ctx.registry.memory_mode(variant).unwrap());
    assert_eq!(topology.want_caches(), mode == MemoryMode::Timing);

    for cluster in topology.clusters() {
        assert_eq!(cluster.has_caches(), topology.want_caches());
        assert_eq!(cluster.l2.is_some(), topology.want_caches());
        let expected_side = if topology.want_caches() { MemSide::L2 } else { MemSide::MemBus };
        assert_eq!(cluster.mem_side, expected_side);
        for core in &cluster.cores {
            assert_eq!(core.icache.is_some(), topology.want_caches());
            assert_eq!(core.dcache.is_some(), topology.want_caches());
        }
    }
}

#[test]
fn test_one_pmu_per_core() {
    let ctx = TestContext::new();
    let mut config = ctx.config();
    config.cpu.num_cores = 4;
    config.cpu.with_pmu = true;
    config.cpu.pmu_ppi_number = 31;

    let topology = ctx.build(&config).unwrap();
    let cores: Vec<_> = topology.clusters().iter().flat_map(|c| &c.cores).collect();
    assert_eq!(cores.len(), 4);
    assert!(cores.iter().all(|c| c.pmu.map(Pmu::ppi) == Some(31)));
    let ids: Vec<u32> = cores.iter().map(|c| c.id).collect();
    assert_eq!(ids, [0, 1, 2, 3]);
}

#[test]
fn test_no_pmu_unless_requested() {
    let ctx = TestContext::new();
    let topology = ctx.build(&ctx.config()).unwrap();
    assert!(topology.clusters()[0].cores.iter().all(|c| c.pmu.is_none()));
}

#[test]
fn test_clock_and_tracer() {
    let ctx = TestContext::new();
    let mut config = ctx.config();
    config.cpu.tarmac_gen = true;
    config.cpu.tarmac_dest = TarmacDest::Stderror;

    let topology = ctx.build(&config).unwrap();
    let cluster = &topology.clusters()[0];
    assert_eq!(cluster.clock.frequency_hz, 4_000_000_000);
    assert_eq!(cluster.clock.period_ticks, 250);
    assert!(cluster.cores.iter().all(|c| c.tracer.map(|t| t.dest) == Some(TarmacDest::Stderror)));
}

#[test]
fn test_terminal_output() {
    let ctx = TestContext::new();
    let topology = ctx.build(&ctx.config()).unwrap();
    assert_eq!(topology.machine.terminal.port, TERMINAL_PORT);
    assert_eq!(topology.machine.terminal.output, TerminalOutput::Stdout);

    let mut config = ctx.config();
    config.run.write_terminal_output = true;
    let topology = ctx.build(&config).unwrap();
    assert_eq!(
        topology.machine.terminal.output,
        TerminalOutput::File(ctx.outdir().join(TERMINAL_FILE_NAME))
    );
}

#[test]
fn test_invalid_ppi_fails_before_construction() {
    let ctx = TestContext::new();
    let mut config = ctx.config();
    config.cpu.with_pmu = true;
    config.cpu.pmu_ppi_number = 32;

    let err = ctx.build(&config).unwrap_err();
    assert!(matches!(err, ComposeError::Config(ConfigError::InvalidPpi(32))));
    assert!(!ctx.outdir().exists());
}

#[test]
fn test_malformed_descriptor_fails_before_construction() {
    let ctx = TestContext::new();
    let mut config = ctx.config();
    config.devices.bridges = vec!["connect:/ok".into(), "listen:/only-one".into()];

    let err = match ctx.build(&config).unwrap_err() {
        ComposeError::Descriptor(err) => err,
        other => panic!("expected descriptor error, got {other}"),
    };
    assert_eq!(err.input, "listen:/only-one");
    assert!(!ctx.outdir().exists());
}

#[test]
fn test_missing_boot_script_fails() {
    let ctx = TestContext::new();
    let mut config = ctx.config();
    config.boot.script = Some(PathBuf::from("/nonexistent/guest.sh"));
    assert!(matches!(
        ctx.build(&config),
        Err(ComposeError::Config(ConfigError::MissingBootScript(_)))
    ));
}

#[test]
fn test_generated_tree_written_to_outdir() {
    let ctx = TestContext::new();
    let topology = ctx.build(&ctx.config()).unwrap();
    let expected = ctx.outdir().join(GENERATED_DTS_NAME);
    assert_eq!(topology.workload.dtb.path(), expected.as_path());
    assert!(expected.is_file());
}
