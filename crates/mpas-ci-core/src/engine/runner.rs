use super::rundir::{apply_directive, create_directory, populate};
use crate::compare::{compare_netcdf_files, FileComparator};
use crate::config::RunnerSettings;
use crate::errors::RunError;
use crate::pbs::{run_job, write_job_script, CancelToken, Scheduler};
use crate::plan::{Inputs, Step, TestPlan, TestSpec};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: String,
    pub job_id: String,
    pub run_dir: PathBuf,
    /// Set for restart steps after a successful comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compared_with: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub test: String,
    pub steps: Vec<StepOutcome>,
}

/// Executes test plans step by step. All paths hang off `working_directory`;
/// the process working directory is never changed.
pub struct ExperimentRunner {
    pub working_directory: PathBuf,
    pub scheduler: Arc<dyn Scheduler>,
    pub comparator: Arc<dyn FileComparator>,
    pub settings: RunnerSettings,
    pub cancel: CancelToken,
}

impl ExperimentRunner {
    pub fn new(
        working_directory: impl Into<PathBuf>,
        scheduler: Arc<dyn Scheduler>,
        comparator: Arc<dyn FileComparator>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            working_directory: working_directory.into(),
            scheduler,
            comparator,
            settings,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs every test in order and stops at the first failure.
    pub async fn run_plan(&self, plan: &TestPlan) -> Result<Vec<TestOutcome>, RunError> {
        create_directory(&self.working_directory)?;
        let mut outcomes = Vec::with_capacity(plan.tests.len());
        for t in &plan.tests {
            outcomes.push(self.run_test(t).await?);
        }
        Ok(outcomes)
    }

    pub async fn run_test(&self, test: &TestSpec) -> Result<TestOutcome, RunError> {
        let test_dir = self.working_directory.join(&test.name);
        create_directory(&test_dir)?;
        tracing::info!(event = "test_start", test = %test.name, steps = test.steps.len());

        let mut steps = Vec::with_capacity(test.steps.len());
        for step in &test.steps {
            steps.push(self.run_step(&test_dir, &test.inputs, step).await?);
        }

        tracing::info!(event = "test_pass", test = %test.name);
        println!("TEST {} PASS", test.name);
        Ok(TestOutcome {
            test: test.name.clone(),
            steps,
        })
    }

    pub async fn run_step(
        &self,
        test_dir: &Path,
        inputs: &Inputs,
        step: &Step,
    ) -> Result<StepOutcome, RunError> {
        let run_dir = test_dir.join(&step.name);
        tracing::info!(event = "step_start", step = %step.name, run_dir = %run_dir.display());

        create_directory(&run_dir)?;
        populate(&run_dir, inputs, &self.settings.pbs.executable)?;
        for d in &step.directives {
            apply_directive(&run_dir, inputs, d)?;
        }

        let script = run_dir.join(&self.settings.script_name);
        write_job_script(&script, &self.settings.job, &self.settings.pbs)?;
        println!("PBS job script written to {}", script.display());

        let job = run_job(
            self.scheduler.as_ref(),
            &script,
            &run_dir,
            &self.settings.monitor,
            &self.cancel,
        )
        .await?;

        let compared_with = if step.is_restart() {
            let reference = test_dir
                .join(&self.settings.base_step)
                .join(&self.settings.restart_file);
            let candidate = run_dir.join(&self.settings.restart_file);
            compare_netcdf_files(self.comparator.as_ref(), &reference, &candidate).await?;
            Some(reference)
        } else {
            None
        };

        Ok(StepOutcome {
            step: step.name.clone(),
            job_id: job.to_string(),
            run_dir,
            compared_with,
        })
    }
}
