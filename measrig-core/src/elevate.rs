//! Non-interactive privilege escalation
//!
//! Commands requiring elevated rights are rewritten so the stored secret is
//! piped into `sudo -S` and the command runs inside a sub-shell, keeping
//! any shell redirections in the command under the elevated identity.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{RigError, RigResult};

/// Rewrites commands to run under `sudo` with a stored secret
///
/// The secret is read-only after construction. Whether elevation is
/// possible is checked locally, before any network round-trip.
pub struct Elevator {
    secret: Option<SecretString>,
}

impl Elevator {
    /// Creates an elevator with an optional elevation secret
    #[must_use]
    pub const fn new(secret: Option<SecretString>) -> Self {
        Self { secret }
    }

    /// Creates an elevator that cannot elevate
    #[must_use]
    pub const fn none() -> Self {
        Self { secret: None }
    }

    /// Returns true when an elevation secret is configured
    #[must_use]
    pub const fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Wraps `command` to run with elevated rights.
    ///
    /// The result is `echo {secret} | sudo -S sh -c '{command}'`; the
    /// sub-shell keeps redirections inside `command` elevated.
    ///
    /// # Errors
    /// [`RigError::Configuration`] when no secret is configured.
    pub fn elevate(&self, command: &str) -> RigResult<String> {
        let secret = self.secret.as_ref().ok_or_else(|| {
            RigError::Configuration("elevation requested but no secret is configured".to_string())
        })?;
        Ok(format!(
            "echo {} | sudo -S sh -c '{command}'",
            secret.expose_secret()
        ))
    }
}

impl std::fmt::Debug for Elevator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never leak the secret through Debug
        f.debug_struct("Elevator")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevate_without_secret_is_configuration_error() {
        let err = Elevator::none().elevate("ntpdate ntp.ubuntu.com").unwrap_err();
        assert!(matches!(err, RigError::Configuration(_)));
    }

    #[test]
    fn test_elevate_wraps_in_sudo_subshell() {
        let elevator = Elevator::new(Some(SecretString::from("pw")));
        let wrapped = elevator
            .elevate("echo performance > /sys/devices/system/cpu/cpu0/cpufreq/scaling_governor")
            .unwrap();
        assert_eq!(
            wrapped,
            "echo pw | sudo -S sh -c 'echo performance > \
             /sys/devices/system/cpu/cpu0/cpufreq/scaling_governor'"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let elevator = Elevator::new(Some(SecretString::from("hunter2")));
        let rendered = format!("{elevator:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
