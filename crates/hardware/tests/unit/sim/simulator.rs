//! # Simulator Tests
//!
//! Ownership transfer into the kernel, restore forwarding and the config dump.

use std::path::PathBuf;

use fsbricks_core::common::constants::CONFIG_DUMP_NAME;
use fsbricks_core::common::error::{KernelError, RunError, TopologyError};
use fsbricks_core::sim::{
    RunContext, RunOutcome, RunState, SimulationEvent, Simulator, dump_config,
};
use pretty_assertions::assert_eq;

use crate::common::harness::TestContext;
use crate::common::mocks::kernel::{MockKernel, ScriptedKernel};

#[test]
fn test_instantiate_forwards_topology_and_restore() {
    let ctx = TestContext::new().with_checkpoint_dir("cpts");
    let mut config = ctx.config();
    config.devices.disk_images = vec!["root.img".into()];
    config.devices.bridges = vec!["connect:/tmp/nic.sock:sync".into()];
    let topology = ctx.build(&config).unwrap();

    let restore = PathBuf::from("m5out/cpt.1000");
    let kernel = ScriptedKernel::new(vec![SimulationEvent::checkpoint(2_000)]);
    let mut sim =
        Simulator::instantiate(kernel, topology, &ctx.ctx, Some(restore.clone())).unwrap();
    assert_eq!(sim.state(), RunState::Running);

    let outcome = sim.run().unwrap();
    let dir = ctx.root().join("cpts").join("cpt.2000");
    assert_eq!(outcome, RunOutcome::Checkpointed { tick: 2_000, dir });

    let kernel = sim.into_kernel();
    assert_eq!(kernel.instantiated, Some((2, Some(restore))));
}

#[test]
fn test_instantiate_failure_surfaces() {
    let ctx = TestContext::new();
    let topology = ctx.build(&ctx.config()).unwrap();

    let mut kernel = MockKernel::new();
    kernel
        .expect_instantiate()
        .times(1)
        .returning(|_, _| Err(KernelError::new("unknown object")));
    kernel.expect_simulate().never();

    let err = Simulator::instantiate(kernel, topology, &ctx.ctx, None).unwrap_err();
    assert!(matches!(err, RunError::Kernel(_)));
}

#[test]
fn test_second_run_is_rejected() {
    let ctx = TestContext::new();
    let topology = ctx.build(&ctx.config()).unwrap();
    let kernel = ScriptedKernel::new(vec![SimulationEvent::terminal("halt", 0, 10)]);
    let mut sim = Simulator::instantiate(kernel, topology, &ctx.ctx, None).unwrap();

    assert!(matches!(sim.run().unwrap(), RunOutcome::Exited { code: 0, tick: 10, .. }));
    assert!(matches!(sim.run(), Err(RunError::Stopped)));
    assert_eq!(sim.into_kernel().steps, 1);
}

#[test]
fn test_config_dump() {
    let ctx = TestContext::new();
    let mut config = ctx.config();
    config.cpu.with_pmu = true;
    config.devices.bridges = vec!["listen:/tmp/a:/dev/shm/a:latency=500".into()];
    let topology = ctx.build(&config).unwrap();

    let path = dump_config(&topology, &ctx.ctx).unwrap();
    assert_eq!(path, ctx.outdir().join(CONFIG_DUMP_NAME));

    let text = std::fs::read_to_string(&path).unwrap();
    let dump: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(dump["machine"]["memory_mode"], "atomic");
    assert_eq!(dump["machine"]["memory"]["base"], 0x8000_0000_u64);
    let device = &dump["machine"]["interconnect"]["devices"][0];
    assert_eq!(device["bus_id"], 1);
    assert_eq!(device["device"]["kind"], "bridge");
    assert_eq!(device["device"]["link_latency"], "500");
    let command_line = dump["workload"]["command_line"].as_str().unwrap();
    assert_eq!(command_line.split(' ').next(), Some("console=ttyAMA0"));
    assert_eq!(dump["workload"]["dtb"]["source"], "generated");
}

#[test]
fn test_config_dump_reports_unwritable_outdir() {
    let ctx = TestContext::new();
    let topology = ctx.build(&ctx.config()).unwrap();
    let blocked = ctx.touch("blocked");
    let blocked_ctx = RunContext::new(blocked.clone(), None);

    let err = dump_config(&topology, &blocked_ctx).unwrap_err();

    assert!(matches!(
        err,
        TopologyError::Persist { ref path, .. } if *path == blocked.join(CONFIG_DUMP_NAME)
    ));
}
