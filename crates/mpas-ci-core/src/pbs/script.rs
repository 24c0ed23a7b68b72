use super::{JobSpec, PbsSettings};
use anyhow::Context;
use std::path::Path;

pub fn render_job_script(job: &JobSpec, pbs: &PbsSettings) -> String {
    let priority = pbs
        .priority
        .as_ref()
        .map(|p| format!("#PBS -l job_priority={p}\n"))
        .unwrap_or_default();

    let mut s = format!(
        "#!/bin/bash
#PBS -A {account}
#PBS -q {queue}
{priority}#PBS -N {name}
#PBS -l walltime={walltime}
#PBS -l select={nodes}:ncpus={cores}:mpiprocs={ppn}

",
        account = pbs.account,
        queue = pbs.queue,
        name = job.name,
        walltime = job.walltime,
        nodes = job.nodes,
        cores = pbs.cores_per_node,
        ppn = job.ppn,
    );

    if !pbs.modules.is_empty() {
        s.push_str("module --force purge\n");
        for m in &pbs.modules {
            s.push_str(&format!("ml {m}\n"));
        }
        s.push('\n');
    }

    s.push_str(&format!(
        "cd $PBS_O_WORKDIR\n\nmpiexec -n {} ./{}\n",
        job.ppn, pbs.executable
    ));
    s
}

pub fn write_job_script(path: &Path, job: &JobSpec, pbs: &PbsSettings) -> anyhow::Result<()> {
    std::fs::write(path, render_job_script(job, pbs))
        .with_context(|| format!("failed to write job script {}", path.display()))?;
    tracing::debug!(event = "job_script_written", path = %path.display(), job = %job.name);
    Ok(())
}
