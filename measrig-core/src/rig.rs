//! Concrete device compositions
//!
//! Builds the device types the experiment driver works with: the
//! instrumented video server (resource logger + workload slot) and the
//! power-sampler units (WT230 + Yokogawa). The transport binding follows
//! the configuration: a configured host gets SSH, an unset host gets the
//! local shell fallback.

use crate::config::DeviceConfig;
use crate::device::Device;
use crate::elevate::Elevator;
use crate::error::RigResult;
use crate::feature::{InstrumentedDevice, ResourceLogger, Wt230Meter, YokogawaMeter};
use crate::transport::{LocalShell, SshTransport, Transport};

/// Slot name of the workload command on the video server
pub const WORKLOAD_SLOT: &str = "workload";

/// Builds the transport binding a config names
fn transport_from(config: &DeviceConfig) -> Box<dyn Transport> {
    config.host.as_ref().map_or_else(
        || Box::new(LocalShell::new()) as Box<dyn Transport>,
        |host| {
            let mut transport = SshTransport::new(host.clone());
            if let Some(port) = config.port {
                transport = transport.with_port(port);
            }
            if let Some(ref key) = config.identity_file {
                transport = transport.with_identity_file(key.clone());
            }
            Box::new(transport)
        },
    )
}

/// Builds a bare device from its configuration
#[must_use]
pub fn device_from(config: &DeviceConfig) -> Device {
    Device::new(
        transport_from(config),
        Elevator::new(config.secret_string()),
    )
}

/// Builds the instrumented video server: base device plus resource logger
/// and workload slot, as configured.
///
/// # Errors
/// [`crate::error::RigError::Configuration`] on duplicate feature names.
pub fn video_server(config: &DeviceConfig) -> RigResult<InstrumentedDevice> {
    let mut rig = InstrumentedDevice::new(device_from(config));
    if let Some(ref log) = config.resource_log {
        rig = rig.with_feature(Box::new(
            ResourceLogger::new(&log.output_dir).with_interfaces(log.interfaces.clone()),
        ))?;
    }
    if let Some(ref workload) = config.workload {
        rig = rig.with_command(WORKLOAD_SLOT, workload.command.clone())?;
    }
    Ok(rig)
}

/// Builds a power-sampler unit: base device plus both meter samplers.
///
/// # Errors
/// [`crate::error::RigError::Configuration`] on duplicate feature names.
pub fn power_sampler(config: &DeviceConfig) -> RigResult<InstrumentedDevice> {
    let mut rig = InstrumentedDevice::new(device_from(config));
    if let Some(ref meters) = config.meters {
        let mut wt230 = Wt230Meter::new(&meters.output_dir, meters.user.clone());
        let mut yokogawa = YokogawaMeter::new(&meters.output_dir);
        if let Some(ref mode) = meters.mode {
            wt230 = wt230.with_default_mode(mode.clone());
            yokogawa = yokogawa.with_default_mode(mode.clone());
        }
        rig = rig.with_feature(Box::new(wt230))?;
        rig = rig.with_feature(Box::new(yokogawa))?;
    }
    Ok(rig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MeterConfig, ResourceLogConfig, WorkloadConfig};

    #[test]
    fn test_video_server_registers_logger_and_workload() {
        let config = DeviceConfig {
            host: Some("odroid@10.0.0.5".to_string()),
            resource_log: Some(ResourceLogConfig {
                output_dir: "/data/dstat".to_string(),
                interfaces: "eth1".to_string(),
            }),
            workload: Some(WorkloadConfig {
                command: "/opt/rig/wlgen".to_string(),
            }),
            ..DeviceConfig::default()
        };
        let rig = video_server(&config).unwrap();
        assert_eq!(rig.feature_names(), vec!["dstat", WORKLOAD_SLOT]);
        assert_eq!(rig.device().endpoint(), "odroid@10.0.0.5");
    }

    #[test]
    fn test_power_sampler_registers_both_meters() {
        let config = DeviceConfig {
            host: Some("sampler-1".to_string()),
            meters: Some(MeterConfig {
                output_dir: "/home/lab/power".to_string(),
                user: "lab".to_string(),
                mode: Some("12V".to_string()),
            }),
            ..DeviceConfig::default()
        };
        let rig = power_sampler(&config).unwrap();
        assert_eq!(rig.feature_names(), vec!["wt230", "yokogawa"]);
    }

    #[test]
    fn test_unset_host_gets_local_fallback() {
        let rig = video_server(&DeviceConfig::default()).unwrap();
        assert_eq!(rig.device().endpoint(), "local");
    }
}
