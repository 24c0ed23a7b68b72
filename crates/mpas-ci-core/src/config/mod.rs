use crate::pbs::{JobSpec, MonitorConfig, PbsSettings};
use serde::{Deserialize, Serialize};

pub mod path_resolver;

pub const DEFAULT_RESTART_FILE: &str = "restart.0000-01-01_02.00.00.nc";
pub const DEFAULT_BASE_STEP: &str = "base";

/// Optional `settings:` block of a test plan. Every field has a default
/// that matches the Derecho setup the tests were written for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerSettings {
    pub pbs: PbsSettings,
    pub job: JobSpec,
    pub monitor: MonitorConfig,
    /// Restart file compared after every restart-named step.
    pub restart_file: String,
    /// Step directory holding the reference restart file.
    pub base_step: String,
    /// Job script file name inside each run directory.
    pub script_name: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            pbs: PbsSettings::default(),
            job: JobSpec::default(),
            monitor: MonitorConfig::default(),
            restart_file: DEFAULT_RESTART_FILE.to_string(),
            base_step: DEFAULT_BASE_STEP.to_string(),
            script_name: "job_script.pbs".to_string(),
        }
    }
}
