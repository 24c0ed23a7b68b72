//! PBS batch jobs: script rendering, submission, and completion polling.

pub mod monitor;
pub mod script;

pub use monitor::{monitor_job, CancelToken, MonitorConfig};
pub use script::{render_job_script, write_job_script};

use crate::errors::RunError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Per-job resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobSpec {
    pub name: String,
    pub walltime: String,
    pub nodes: u32,
    /// MPI ranks.
    pub ppn: u32,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self {
            name: "test_base".into(),
            walltime: "02:00:00".into(),
            nodes: 1,
            ppn: 16,
        }
    }
}

/// Site-specific parts of the job script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PbsSettings {
    pub account: String,
    pub queue: String,
    pub priority: Option<String>,
    pub cores_per_node: u32,
    pub modules: Vec<String>,
    /// Name the model executable is linked as inside each run directory.
    pub executable: String,
}

impl Default for PbsSettings {
    fn default() -> Self {
        Self {
            account: "NMMM0013".into(),
            queue: "develop".into(),
            priority: Some("premium".into()),
            cores_per_node: 64,
            modules: [
                "ncarenv/23.09",
                "craype",
                "nvhpc",
                "ncarcompilers",
                "cray-mpich",
                "parallel-netcdf",
                "cuda",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            executable: "atmosphere_model".into(),
        }
    }
}

/// Opaque identifier printed by the submit command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Submits `script` with `workdir` as the job's submission directory.
    async fn submit(&self, script: &Path, workdir: &Path) -> Result<JobId, RunError>;

    /// Full status text for `job`, as printed by the status command.
    async fn status(&self, job: &JobId) -> anyhow::Result<String>;
}

/// Shells out to `qsub` / `qstat -fx`.
#[derive(Debug, Clone)]
pub struct PbsScheduler {
    pub submit_cmd: String,
    pub status_cmd: String,
    pub status_args: Vec<String>,
}

impl Default for PbsScheduler {
    fn default() -> Self {
        Self {
            submit_cmd: "qsub".into(),
            status_cmd: "qstat".into(),
            status_args: vec!["-fx".into()],
        }
    }
}

#[async_trait]
impl Scheduler for PbsScheduler {
    async fn submit(&self, script: &Path, workdir: &Path) -> Result<JobId, RunError> {
        let failed = |reason: String| RunError::SubmitFailed {
            script: script.to_path_buf(),
            reason,
        };

        let out = tokio::process::Command::new(&self.submit_cmd)
            .arg(script)
            .current_dir(workdir)
            .output()
            .await
            .map_err(|e| failed(format!("could not run {}: {e}", self.submit_cmd)))?;

        if !out.status.success() {
            return Err(failed(format!(
                "{} exited with {}: {}",
                self.submit_cmd,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let id = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if id.is_empty() {
            return Err(failed(format!("{} printed no job id", self.submit_cmd)));
        }
        Ok(JobId(id))
    }

    async fn status(&self, job: &JobId) -> anyhow::Result<String> {
        let out = tokio::process::Command::new(&self.status_cmd)
            .args(&self.status_args)
            .arg(&job.0)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("could not run {}: {e}", self.status_cmd))?;
        if !out.status.success() {
            tracing::debug!(event = "status_nonzero", job = %job, status = %out.status);
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

/// Writes `script`, submits it and blocks until the job has exited successfully.
pub async fn run_job(
    scheduler: &dyn Scheduler,
    script: &Path,
    workdir: &Path,
    cfg: &MonitorConfig,
    cancel: &CancelToken,
) -> Result<JobId, RunError> {
    let job = scheduler.submit(script, workdir).await?;
    tracing::info!(event = "job_submitted", job = %job, workdir = %workdir.display());
    println!("PBS job submitted with job ID: {job}");

    monitor_job(scheduler, &job, cfg, cancel).await?;
    Ok(job)
}
