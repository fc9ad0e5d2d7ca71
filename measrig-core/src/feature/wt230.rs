//! WT230 power-meter sampler feature
//!
//! Drives the host-side `WT230` sampler tool on a power-sampler unit. The
//! tool derives its own output location from user/prefix/timestamp, so the
//! feature mirrors that derivation to know which file to save later.

use std::path::PathBuf;

use super::{Feature, FeatureOptions, FeaturePlan, DEFAULT_PREFIX};

/// Default measurement mode (mains RMS)
const DEFAULT_MODE: &str = "230V";

/// External WT230 power-meter sampler
pub struct Wt230Meter {
    output_dir: PathBuf,
    user: String,
    default_mode: String,
}

impl Wt230Meter {
    /// Creates a sampler for `user`, writing CSVs under `output_dir`
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            user: user.into(),
            default_mode: DEFAULT_MODE.to_string(),
        }
    }

    /// Sets the mode used when a start supplies none ("230V" or "12V")
    #[must_use]
    pub fn with_default_mode(mut self, mode: impl Into<String>) -> Self {
        self.default_mode = mode.into();
        self
    }
}

impl Feature for Wt230Meter {
    fn name(&self) -> &str {
        "wt230"
    }

    fn plan(&self, options: &FeatureOptions) -> FeaturePlan {
        let prefix = options.prefix.as_deref().unwrap_or(DEFAULT_PREFIX);
        let timestamp = options.timestamp_or_now();
        let mode = options.mode.as_deref().unwrap_or(&self.default_mode);
        let output = self.output_dir.join(format!("{prefix}_{timestamp}.csv"));
        let command = format!(
            "WT230 -u {} -p {prefix} -t {timestamp} -m {mode}",
            self.user
        );
        FeaturePlan::with_output(command, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_command_and_output_share_stamp() {
        let meter = Wt230Meter::new("/home/lab/power", "lab");
        let opts = FeatureOptions::new()
            .with_prefix("idle")
            .with_timestamp("2016-04-02_09-30-00")
            .with_mode("12V");
        let plan = meter.plan(&opts);
        assert_eq!(
            plan.command,
            "WT230 -u lab -p idle -t 2016-04-02_09-30-00 -m 12V"
        );
        assert_eq!(
            plan.output.unwrap(),
            PathBuf::from("/home/lab/power/idle_2016-04-02_09-30-00.csv")
        );
    }

    #[test]
    fn test_plan_defaults_mode_and_prefix() {
        let meter = Wt230Meter::new("/home/lab/power", "lab");
        let opts = FeatureOptions::new().with_timestamp("2016-04-02_09-30-00");
        let plan = meter.plan(&opts);
        assert!(plan.command.contains("-m 230V"));
        assert!(plan.command.contains("-p measrig"));
    }
}
