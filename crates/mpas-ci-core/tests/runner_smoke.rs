#![cfg(unix)]

use async_trait::async_trait;
use mpas_ci_core::compare::FileComparator;
use mpas_ci_core::config::RunnerSettings;
use mpas_ci_core::engine::ExperimentRunner;
use mpas_ci_core::errors::RunError;
use mpas_ci_core::pbs::{JobId, MonitorConfig, Scheduler};
use mpas_ci_core::plan::parse_plan;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Pretends to run the model: every submission drops a restart file into the
/// run directory and reports the job as exited with `exit_status`.
struct FakePbs {
    exit_status: &'static str,
    submitted: Mutex<Vec<PathBuf>>,
}

impl FakePbs {
    fn new(exit_status: &'static str) -> Arc<Self> {
        Arc::new(Self {
            exit_status,
            submitted: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Scheduler for FakePbs {
    async fn submit(&self, script: &Path, workdir: &Path) -> Result<JobId, RunError> {
        assert!(script.is_file());
        std::fs::write(workdir.join("restart.0000-01-01_02.00.00.nc"), b"CDF").unwrap();
        let mut s = self.submitted.lock().unwrap();
        s.push(workdir.to_path_buf());
        Ok(JobId(format!("{}.desched1", s.len())))
    }

    async fn status(&self, _job: &JobId) -> anyhow::Result<String> {
        Ok(format!(
            "    job_state = E\n    Exit_status = {}\n",
            self.exit_status
        ))
    }
}

struct Always(bool);

#[async_trait]
impl FileComparator for Always {
    async fn identical(&self, _a: &Path, _b: &Path) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

fn write_inputs(dir: &Path) -> String {
    let input = dir.join("jw_input");
    std::fs::create_dir_all(&input).unwrap();
    for f in ["atmosphere_model", "x1.40962.grid.nc", "x1.40962.init.nc", "x1.40962.graph.info.part.16"] {
        std::fs::write(input.join(f), f).unwrap();
    }
    std::fs::write(
        input.join("namelist.atmosphere"),
        "&nhyd_model\n    config_start_time = '0000-01-01_00:00:00'\n    config_run_duration = '0_02:00:00'\n/\n&restart\n    config_do_restart = false\n/\n",
    )
    .unwrap();
    std::fs::write(
        input.join("streams.atmosphere"),
        r#"<streams>
<immutable_stream name="restart" type="input;output" output_interval="1_00:00:00" />
<stream name="output" type="output" filename_template="history.nc" output_interval="6:00:00" />
</streams>
"#,
    )
    .unwrap();
    input.to_string_lossy().to_string()
}

fn plan_yaml(input: &str, steps: &str) -> String {
    format!(
        r#"
tests:
  jw:
    inputs:
      model: {input}/atmosphere_model
      grid: {input}/x1.40962.grid.nc
      init: {input}/x1.40962.init.nc
      partition: {input}/x1.40962.graph.info.part.*
      nml: {input}/namelist.atmosphere
      stream: {input}/streams.atmosphere
    steps:
{steps}"#
    )
}

const BASE_AND_RESTART: &str = r#"      base:
        update_stream:
          restart:
            output_interval: "01:00:00"
          output:
            filename_template: output_base.nc
      restart_1h:
        symlink: ../base/restart.0000-01-01_01.00.00.nc
        update_nml:
          config_start_time: "'0000-01-01_01:00:00'"
          config_do_restart: true
"#;

fn runner(root: &TempDir, pbs: Arc<FakePbs>, identical: bool) -> ExperimentRunner {
    let settings = RunnerSettings {
        monitor: MonitorConfig::immediate(),
        ..RunnerSettings::default()
    };
    ExperimentRunner::new(root.path().join("test"), pbs, Arc::new(Always(identical)), settings)
}

#[tokio::test]
async fn base_then_restart_passes() -> anyhow::Result<()> {
    let root = TempDir::new()?;
    let input = write_inputs(root.path());
    let plan = parse_plan(&plan_yaml(&input, BASE_AND_RESTART))?;
    let pbs = FakePbs::new("0");

    let outcomes = runner(&root, pbs.clone(), true).run_plan(&plan).await?;

    let test_dir = root.path().join("test/jw");
    assert_eq!(
        *pbs.submitted.lock().unwrap(),
        vec![test_dir.join("base"), test_dir.join("restart_1h")]
    );

    let steps = &outcomes[0].steps;
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].compared_with, None);
    assert_eq!(
        steps[1].compared_with.as_deref(),
        Some(test_dir.join("base/restart.0000-01-01_02.00.00.nc").as_path())
    );

    let script = std::fs::read_to_string(test_dir.join("base/job_script.pbs"))?;
    assert!(script.contains("#PBS -N test_base"));
    assert!(script.contains("mpiexec -n 16 ./atmosphere_model"));

    let streams = std::fs::read_to_string(test_dir.join("base/streams.atmosphere"))?;
    assert!(streams.contains(r#"output_interval="01:00:00""#));
    assert!(streams.contains(r#"filename_template="output_base.nc""#));

    let nml = std::fs::read_to_string(test_dir.join("restart_1h/namelist.atmosphere"))?;
    assert!(nml.contains("config_start_time = '0000-01-01_01:00:00'\n"));
    assert!(nml.contains("config_do_restart = true\n"));
    assert!(nml.contains("config_run_duration = '0_02:00:00'"));
    Ok(())
}

#[tokio::test]
async fn restart_without_base_fails_comparison() -> anyhow::Result<()> {
    let root = TempDir::new()?;
    let input = write_inputs(root.path());
    let steps = "      restart_1h:\n        update_nml:\n          config_do_restart: true\n";
    let plan = parse_plan(&plan_yaml(&input, steps))?;

    let err = runner(&root, FakePbs::new("0"), true)
        .run_plan(&plan)
        .await
        .unwrap_err();
    match err {
        RunError::MissingFile(p) => {
            assert!(p.ends_with("jw/base/restart.0000-01-01_02.00.00.nc"))
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn differing_restart_files_fail() -> anyhow::Result<()> {
    let root = TempDir::new()?;
    let input = write_inputs(root.path());
    let plan = parse_plan(&plan_yaml(&input, BASE_AND_RESTART))?;

    let err = runner(&root, FakePbs::new("0"), false)
        .run_plan(&plan)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::FilesDiffer(..)));
    Ok(())
}

#[tokio::test]
async fn failed_job_stops_the_plan() -> anyhow::Result<()> {
    let root = TempDir::new()?;
    let input = write_inputs(root.path());
    let plan = parse_plan(&plan_yaml(&input, BASE_AND_RESTART))?;
    let pbs = FakePbs::new("271");

    let err = runner(&root, pbs.clone(), true)
        .run_plan(&plan)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::JobFailed { ref status, .. } if status == "271"));
    assert_eq!(pbs.submitted.lock().unwrap().len(), 1);
    Ok(())
}
