//! End-to-end feature lifecycle scenarios against a scripted transport

use std::path::Path;

use secrecy::SecretString;

use measrig_core::testing::{ScriptedTransport, TransportCall};
use measrig_core::{
    Device, Elevator, FeatureOptions, InstrumentedDevice, ResourceLogger, RigError, Wt230Meter,
};

fn instrumented(script: &ScriptedTransport) -> InstrumentedDevice {
    let device = Device::new(
        Box::new(script.clone()),
        Elevator::new(Some(SecretString::from("pw"))),
    );
    InstrumentedDevice::new(device)
        .with_feature(Box::new(ResourceLogger::new("/tmp/logs")))
        .unwrap()
        .with_feature(Box::new(Wt230Meter::new("/tmp/power", "meter")))
        .unwrap()
}

#[test]
fn first_start_announces_before_the_feature_command() {
    let script = ScriptedTransport::new();
    let mut rig = instrumented(&script);
    rig.feature_start("dstat", &FeatureOptions::new()).unwrap();

    let calls = script.calls();
    assert!(
        matches!(&calls[0], TransportCall::Run(cmd) if cmd.contains("/tmp/measrun")),
        "expected marker write first, got {calls:?}"
    );
    assert!(matches!(&calls[1], TransportCall::Spawn(cmd) if cmd.starts_with("dstat")));
    // A second feature on the same device reuses the announcement
    rig.feature_start("wt230", &FeatureOptions::new()).unwrap();
    let marker_writes = script
        .calls()
        .iter()
        .filter(|c| matches!(c, TransportCall::Run(cmd) if cmd.contains("measrun")))
        .count();
    assert_eq!(marker_writes, 1);
}

#[test]
fn restart_stops_the_previous_run_before_spawning() {
    let script = ScriptedTransport::new();
    let mut rig = instrumented(&script);
    let first = rig
        .feature_start("dstat", &FeatureOptions::new().with_timestamp("t1"))
        .unwrap();
    rig.feature_start("dstat", &FeatureOptions::new().with_timestamp("t2"))
        .unwrap();

    let calls = script.calls();
    let kill_at = calls
        .iter()
        .position(|c| matches!(c, TransportCall::Run(cmd) if *cmd == format!("kill {first}")))
        .expect("previous process was never stopped");
    let respawn_at = calls
        .iter()
        .position(|c| matches!(c, TransportCall::Spawn(cmd) if cmd.contains("t2")))
        .expect("replacement was never spawned");
    assert!(kill_at < respawn_at);
    assert_eq!(
        rig.last_output("dstat"),
        Some(Path::new("/tmp/logs/measrig_t2.csv"))
    );
}

#[test]
fn save_into_directory_keeps_the_remote_base_name() {
    let script = ScriptedTransport::new();
    let mut rig = instrumented(&script);
    rig.feature_start("dstat", &FeatureOptions::new().with_timestamp("t"))
        .unwrap();
    rig.feature_stop("dstat").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let saved = rig.feature_save("dstat", dir.path()).unwrap();
    assert_eq!(saved, dir.path().join("measrig_t.csv"));
    assert!(script.calls().iter().any(|c| matches!(
        c,
        TransportCall::Fetch { remote, destination }
            if remote == Path::new("/tmp/logs/measrig_t.csv") && *destination == saved
    )));
}

#[test]
fn save_to_explicit_file_path_is_verbatim() {
    let script = ScriptedTransport::new();
    let mut rig = instrumented(&script);
    rig.feature_start("dstat", &FeatureOptions::new().with_timestamp("t"))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("renamed.csv");
    let saved = rig.feature_save("dstat", &target).unwrap();
    assert_eq!(saved, target);
}

#[test]
fn save_before_any_start_reports_no_output() {
    let script = ScriptedTransport::new();
    let mut rig = instrumented(&script);
    let err = rig.feature_save("dstat", Path::new("/tmp")).unwrap_err();
    assert!(matches!(err, RigError::NoOutput(name) if name == "dstat"));
}

#[test]
fn teardown_stops_everything_and_clears_the_marker() {
    let script = ScriptedTransport::new();
    let mut rig = instrumented(&script);
    let dstat = rig.feature_start("dstat", &FeatureOptions::new()).unwrap();
    let wt230 = rig.feature_start("wt230", &FeatureOptions::new()).unwrap();
    rig.teardown().unwrap();

    let runs: Vec<String> = script
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            TransportCall::Run(cmd) => Some(cmd),
            _ => None,
        })
        .collect();
    assert!(runs.contains(&format!("kill {dstat}")));
    assert!(runs.contains(&format!("kill {wt230}")));
    assert!(runs.iter().any(|c| c.starts_with("rm /tmp/measrun")));
    assert!(!rig.device().is_announced());
}
