//! Contract tests for the device process table and host helpers

use proptest::prelude::*;
use secrecy::SecretString;

use measrig_core::testing::{ScriptedTransport, TransportCall};
use measrig_core::{Device, Elevator, RigError, DEFAULT_MARKER_MESSAGE};

fn device(script: &ScriptedTransport) -> Device {
    Device::new(
        Box::new(script.clone()),
        Elevator::new(Some(SecretString::from("pw"))),
    )
}

#[test]
fn governor_sweep_scenario_four_cpus_single_command() {
    // Device with secret "pw", set_governor("performance") with no explicit
    // CPU list and a CPU count of 4: exactly one elevated remote command
    // iterating indices 0..=3.
    let script = ScriptedTransport::new();
    script.push_run_ok("4\n");
    let mut dev = device(&script);
    dev.set_governor("performance", None).unwrap();

    let elevated: Vec<String> = script
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            TransportCall::Run(cmd) if cmd.contains("sudo") => Some(cmd),
            _ => None,
        })
        .collect();
    assert_eq!(elevated.len(), 1);
    let cmd = &elevated[0];
    assert!(cmd.contains("echo pw |"));
    assert!(cmd.contains("seq 0 1 3"));
    assert!(cmd.contains("scaling_governor"));
}

#[test]
fn announce_then_double_unannounce_never_raises() {
    let script = ScriptedTransport::new();
    let mut dev = device(&script);
    dev.announce(DEFAULT_MARKER_MESSAGE).unwrap();
    dev.rm_announce().unwrap();
    // The marker is gone now; the remote rm fails, teardown stays silent
    script.push_run_execution_error(1, "rm: cannot remove '/tmp/measrun'");
    dev.rm_announce().unwrap();
}

#[test]
fn get_output_leaves_streams_untouched_while_running() {
    let script = ScriptedTransport::new();
    let mut dev = device(&script);
    let pid = dev.start_default("dstat", false).unwrap();

    assert!(matches!(
        dev.get_output(pid).unwrap_err(),
        RigError::StillRunning(p) if p == pid
    ));
    assert_eq!(script.drain_count(pid), 0);
}

#[test]
fn stop_after_termination_is_always_a_noop() {
    let script = ScriptedTransport::new();
    let mut dev = device(&script);
    let pid = dev.start_default("dstat", false).unwrap();
    script.terminate(pid, 0);
    dev.stop(pid).unwrap();
    dev.stop(pid).unwrap();
    assert!(!script
        .calls()
        .iter()
        .any(|c| matches!(c, TransportCall::Run(cmd) if cmd.starts_with("kill"))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // The all-CPU path is one elevated round-trip regardless of CPU count;
    // the loop upper bound is count - 1.
    #[test]
    fn prop_governor_all_cpus_is_one_roundtrip(count in 1usize..=128) {
        let script = ScriptedTransport::new();
        script.push_run_ok(&format!("{count}\n"));
        let mut dev = device(&script);
        dev.set_governor("powersave", None).unwrap();

        let calls = script.calls();
        // One cpu probe + one governor command
        prop_assert_eq!(calls.len(), 2);
        let TransportCall::Run(ref cmd) = calls[1] else {
            return Err(TestCaseError::fail("expected run call"));
        };
        let expected = format!("seq 0 1 {}", count - 1);
        prop_assert!(cmd.contains(&expected));
    }

    // The explicit-subset path is one elevated round-trip per index, in
    // the given order.
    #[test]
    fn prop_governor_subset_is_n_roundtrips(cpus in proptest::collection::vec(0usize..16, 1..6)) {
        let script = ScriptedTransport::new();
        let mut dev = device(&script);
        dev.set_governor("ondemand", Some(&cpus)).unwrap();

        let calls = script.calls();
        prop_assert_eq!(calls.len(), cpus.len());
        for (call, cpu) in calls.iter().zip(&cpus) {
            let TransportCall::Run(cmd) = call else {
                return Err(TestCaseError::fail("expected run call"));
            };
            let expected = format!("cpu{cpu}/cpufreq");
            prop_assert!(cmd.contains(&expected));
            prop_assert!(cmd.contains("sudo"));
        }
    }
}
