//! System-resource CSV logger feature
//!
//! Samples CPU, load, memory, disk, and network on the device via `dstat`
//! and writes one CSV per run into the configured sample directory.

use std::path::PathBuf;

use super::{Feature, FeatureOptions, FeaturePlan, DEFAULT_PREFIX};

/// Network interfaces sampled when none are configured
const DEFAULT_INTERFACES: &str = "eth0";

/// dstat-based system-resource logger
pub struct ResourceLogger {
    output_dir: PathBuf,
    interfaces: String,
}

impl ResourceLogger {
    /// Creates a logger writing CSVs under `output_dir` on the device
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            interfaces: DEFAULT_INTERFACES.to_string(),
        }
    }

    /// Sets the comma-separated network interface list to sample
    #[must_use]
    pub fn with_interfaces(mut self, interfaces: impl Into<String>) -> Self {
        self.interfaces = interfaces.into();
        self
    }
}

impl Feature for ResourceLogger {
    fn name(&self) -> &str {
        "dstat"
    }

    fn plan(&self, options: &FeatureOptions) -> FeaturePlan {
        let output = options.output_file.clone().unwrap_or_else(|| {
            let prefix = options.prefix.as_deref().unwrap_or(DEFAULT_PREFIX);
            self.output_dir
                .join(format!("{prefix}_{}.csv", options.timestamp_or_now()))
        });
        let command = format!(
            "dstat -tclmndN {} --output {}",
            self.interfaces,
            output.display()
        );
        FeaturePlan::with_output(command, output)
    }
}
