#![cfg(unix)]

use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let p = dir.join(name);
    fs::write(&p, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&p, fs::Permissions::from_mode(0o755)).unwrap();
    p
}

/// Fake qsub/qstat/cdo plus model inputs and a two-step plan.
fn setup(exit_status: u32) -> (TempDir, PathBuf, Vec<String>) {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let bin = root.join("bin");
    let input = root.join("input");
    fs::create_dir_all(&bin).unwrap();
    fs::create_dir_all(&input).unwrap();

    // qsub runs in the step directory; the "model" writes the same restart file everywhere.
    let qsub = script(
        &bin,
        "qsub",
        "echo CDF > restart.0000-01-01_02.00.00.nc\necho 4242.desched1",
    );
    let qstat = script(
        &bin,
        "qstat",
        &format!("echo '    job_state = E'\necho '    Exit_status = {exit_status}'"),
    );
    let cdo = script(&bin, "cdo", "exec cmp -s \"$2\" \"$3\"");

    for f in ["atmosphere_model", "x1.40962.grid.nc", "x1.40962.init.nc"] {
        fs::write(input.join(f), f).unwrap();
    }
    fs::write(
        input.join("namelist.atmosphere"),
        "&nhyd_model\n    config_do_restart = false\n/\n",
    )
    .unwrap();
    fs::write(
        input.join("streams.atmosphere"),
        "<streams>\n<immutable_stream name=\"restart\" output_interval=\"1_00:00:00\"/>\n</streams>\n",
    )
    .unwrap();

    let plan = root.join("plan.yaml");
    fs::write(
        &plan,
        r#"
tests:
  jw:
    inputs:
      model: input/atmosphere_model
      grid: input/x1.40962.grid.nc
      init: input/x1.40962.init.nc
      nml: input/namelist.atmosphere
      stream: input/streams.atmosphere
    steps:
      base:
        update_stream:
          restart:
            output_interval: "01:00:00"
      restart:
        update_nml:
          config_do_restart: true
"#,
    )
    .unwrap();

    let flags = vec![
        "--initial-delay".to_string(),
        "0".into(),
        "--poll-interval".into(),
        "0".into(),
        "--submit-cmd".into(),
        qsub.display().to_string(),
        "--status-cmd".into(),
        qstat.display().to_string(),
        "--diff-cmd".into(),
        cdo.display().to_string(),
    ];
    (dir, plan, flags)
}

#[test]
fn test_restart_plan_passes() {
    let (dir, plan, flags) = setup(0);
    let workdir = dir.path().join("test");
    let summary = dir.path().join("summary.json");

    Command::cargo_bin("mpas-ci")
        .unwrap()
        .arg("run-tests")
        .arg(&plan)
        .arg("--workdir")
        .arg(&workdir)
        .arg("--summary")
        .arg(&summary)
        .args(&flags)
        .assert()
        .success()
        .stdout(contains("PBS job submitted with job ID: 4242.desched1"))
        .stdout(contains("No differences found between"))
        .stdout(contains("TEST jw PASS"));

    let nml = fs::read_to_string(workdir.join("jw/restart/namelist.atmosphere")).unwrap();
    assert!(nml.contains("config_do_restart = true"));
    assert!(workdir.join("jw/base/job_script.pbs").is_file());

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(summary).unwrap()).unwrap();
    assert_eq!(v[0]["steps"][1]["step"], "restart");
}

#[test]
fn test_failed_job_exits_one() {
    let (dir, plan, flags) = setup(1);

    Command::cargo_bin("mpas-ci")
        .unwrap()
        .arg("run-tests")
        .arg(&plan)
        .arg("--workdir")
        .arg(dir.path().join("test"))
        .args(&flags)
        .assert()
        .code(1)
        .stderr(contains("failed with exit status 1"));
}

#[test]
fn test_invalid_plan_is_config_error() {
    let dir = TempDir::new().unwrap();
    let plan = dir.path().join("plan.yaml");
    fs::write(&plan, "tests: {}\n").unwrap();

    Command::cargo_bin("mpas-ci")
        .unwrap()
        .arg("run-tests")
        .arg(&plan)
        .assert()
        .code(2)
        .stderr(contains("no tests"));
}
