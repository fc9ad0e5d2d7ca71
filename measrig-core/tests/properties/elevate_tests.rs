//! Property tests for privilege-escalation command wrapping

use proptest::prelude::*;
use secrecy::SecretString;

use measrig_core::{Device, Elevator, RigError};
use measrig_core::testing::ScriptedTransport;

/// Strategy for shell command strings as the rig composes them. No single
/// quotes, which the sub-shell wrapping reserves.
fn arb_command() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ./>_=,-]{1,60}".prop_filter("non-blank", |s| !s.trim().is_empty())
}

/// Strategy for secrets that cannot collide with command text
fn arb_secret() -> impl Strategy<Value = String> {
    "[A-Z]{2}[0-9]{6}[a-z]{4}".prop_map(|s| format!("S#{s}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The wrapped command contains the secret exactly once and delegates
    // to a sub-shell invocation of the command unmodified in content.
    #[test]
    fn prop_wrapped_command_contains_secret_once(
        command in arb_command(),
        secret in arb_secret(),
    ) {
        let elevator = Elevator::new(Some(SecretString::from(secret.clone())));
        let wrapped = elevator.elevate(&command).unwrap();

        prop_assert_eq!(wrapped.matches(&secret).count(), 1);
        prop_assert_eq!(
            wrapped,
            format!("echo {secret} | sudo -S sh -c '{command}'")
        );
    }

    // Elevation requested without a secret fails before any round-trip,
    // for every command.
    #[test]
    fn prop_missing_secret_never_reaches_transport(command in arb_command()) {
        let script = ScriptedTransport::new();
        let mut device = Device::new(Box::new(script.clone()), Elevator::none());

        let run_err = device.run(&command, true).unwrap_err();
        prop_assert!(matches!(run_err, RigError::Configuration(_)));
        let start_err = device.start_default(&command, true).unwrap_err();
        prop_assert!(matches!(start_err, RigError::Configuration(_)));

        prop_assert!(script.calls().is_empty());
    }

    // Without elevation the command reaches the transport untouched.
    #[test]
    fn prop_unelevated_command_passes_through(command in arb_command()) {
        let script = ScriptedTransport::new();
        let mut device = Device::new(Box::new(script.clone()), Elevator::none());
        device.run(&command, false).unwrap();

        prop_assert_eq!(
            script.calls(),
            vec![measrig_core::testing::TransportCall::Run(command)]
        );
    }
}
