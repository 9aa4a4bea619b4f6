//! # Kernel Event Tests

use fsbricks_core::sim::{ExitCause, SimulationEvent};
use pretty_assertions::assert_eq;

#[test]
fn test_event_json_decoding() {
    let event: SimulationEvent =
        serde_json::from_str(r#"{"cause":"checkpoint","code":0,"tick":1000}"#).unwrap();
    assert_eq!(event, SimulationEvent::checkpoint(1000));

    let json = r#"{"cause":"m5_exit instruction encountered","code":0,"tick":42}"#;
    let event: SimulationEvent = serde_json::from_str(json).unwrap();
    assert_eq!(event.cause, ExitCause::Terminal("m5_exit instruction encountered".into()));
}

#[test]
fn test_cause_display() {
    assert_eq!(ExitCause::Checkpoint.to_string(), "checkpoint");
    let message = "exiting with last active thread context";
    assert_eq!(ExitCause::from(message).to_string(), message);
    assert_eq!(
        serde_json::to_string(&SimulationEvent::terminal("halt", 3, 9)).unwrap(),
        r#"{"cause":"halt","code":3,"tick":9}"#
    );
}
