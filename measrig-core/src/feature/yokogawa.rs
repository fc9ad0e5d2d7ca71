//! Yokogawa power-meter sampler feature
//!
//! Starts the `yokogawa` sampler tool on a power-sampler unit. The serial
//! wire protocol behind that tool is its own concern; this feature only
//! composes the command line and tracks the CSV it writes.

use std::path::PathBuf;

use super::{Feature, FeatureOptions, FeaturePlan};

/// Default measurement mode (mains RMS)
const DEFAULT_MODE: &str = "230V";

/// External Yokogawa power-meter sampler
pub struct YokogawaMeter {
    output_dir: PathBuf,
    default_mode: String,
}

impl YokogawaMeter {
    /// Creates a sampler writing CSVs under `output_dir`
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            default_mode: DEFAULT_MODE.to_string(),
        }
    }

    /// Sets the mode used when a start supplies none ("230V", "12V", "5V")
    #[must_use]
    pub fn with_default_mode(mut self, mode: impl Into<String>) -> Self {
        self.default_mode = mode.into();
        self
    }
}

impl Feature for YokogawaMeter {
    fn name(&self) -> &str {
        "yokogawa"
    }

    fn plan(&self, options: &FeatureOptions) -> FeaturePlan {
        let mode = options.mode.as_deref().unwrap_or(&self.default_mode);
        // The tool takes directory and file name separately
        let (dir, file) = options.output_file.as_ref().map_or_else(
            || {
                (
                    self.output_dir.clone(),
                    format!("{}.csv", options.timestamp_or_now()),
                )
            },
            |path| {
                let dir = path
                    .parent()
                    .map_or_else(|| self.output_dir.clone(), PathBuf::from);
                let file = path
                    .file_name()
                    .map_or_else(String::new, |f| f.to_string_lossy().into_owned());
                (dir, file)
            },
        );
        let output = dir.join(&file);
        let command = format!("yokogawa -m {mode} -d {} -f {file}", dir.display());
        FeaturePlan::with_output(command, output)
    }
}
