use std::path::PathBuf;
use thiserror::Error;

/// Failures that end an experiment run. The CLI maps every variant to
/// `exit_codes::TEST_FAILED`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to submit PBS job {script}: {reason}")]
    SubmitFailed { script: PathBuf, reason: String },

    #[error("job {job_id} failed with exit status {status}")]
    JobFailed { job_id: String, status: String },

    #[error("exit status not found for job {job_id}")]
    ExitStatusMissing { job_id: String },

    #[error("gave up waiting for job {job_id} after {waited_secs}s")]
    Timeout { job_id: String, waited_secs: u64 },

    #[error("wait for job {job_id} cancelled")]
    Cancelled { job_id: String },

    #[error("reference file missing: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("differences found between {} and {}", .0.display(), .1.display())]
    FilesDiffer(PathBuf, PathBuf),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read test plan {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse test plan YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid test plan: {0}")]
    Invalid(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum PerfError {
    #[error("invalid timing value '{0}'")]
    InvalidTiming(String),

    #[error("no timings given")]
    NoTimings,
}
