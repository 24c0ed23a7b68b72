//! YAML test plans: named tests, their inputs, and ordered steps.

pub mod model;

pub use model::{Directive, Inputs, Step, StreamEdit, TestPlan, TestSpec};

use crate::config::path_resolver::PathResolver;
use crate::config::RunnerSettings;
use crate::errors::PlanError;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;

#[derive(Deserialize)]
struct PlanFile {
    #[serde(default)]
    settings: RunnerSettings,
    #[serde(default)]
    tests: Mapping,
}

#[derive(Deserialize)]
struct TestFile {
    inputs: Inputs,
    #[serde(default)]
    steps: Mapping,
}

pub fn load_plan(path: &Path) -> Result<TestPlan, PlanError> {
    let raw = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut plan = parse_plan(&raw)?;

    // Inputs become symlink targets inside run directories, so anchor them
    // to an absolute plan location.
    let plan_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| PlanError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .join(path)
    };
    let r = PathResolver::new(&plan_path);
    for t in &mut plan.tests {
        let inputs = &mut t.inputs;
        r.resolve_str(&mut inputs.model);
        r.resolve_str(&mut inputs.grid);
        r.resolve_str(&mut inputs.init);
        r.resolve_str(&mut inputs.nml);
        r.resolve_str(&mut inputs.stream);
        if let Some(p) = inputs.partition.as_mut() {
            r.resolve_str(p);
        }
        if let Some(p) = inputs.stream_out.as_mut() {
            r.resolve_str(p);
        }
    }

    tracing::info!(
        event = "plan_loaded",
        path = %path.display(),
        tests = plan.tests.len()
    );
    Ok(plan)
}

/// Parses a plan without touching the filesystem; input paths are kept as written.
pub fn parse_plan(raw: &str) -> Result<TestPlan, PlanError> {
    let mut ignored = Vec::new();
    let de = serde_yaml::Deserializer::from_str(raw);
    let file: PlanFile = serde_ignored::deserialize(de, |p| ignored.push(p.to_string()))?;
    warn_ignored("plan", &ignored);

    if file.tests.is_empty() {
        return Err(PlanError::Invalid("test plan has no tests".into()));
    }

    let mut tests = Vec::with_capacity(file.tests.len());
    for (k, v) in file.tests {
        let name = scalar_to_string(&k)
            .ok_or_else(|| PlanError::Invalid("test names must be scalars".into()))?;
        tests.push(parse_test(name, v)?);
    }

    Ok(TestPlan {
        settings: file.settings,
        tests,
    })
}

fn parse_test(name: String, v: Value) -> Result<TestSpec, PlanError> {
    let mut ignored = Vec::new();
    let file: TestFile = serde_ignored::deserialize(v, |p| ignored.push(p.to_string()))
        .map_err(|e| PlanError::Invalid(format!("test '{name}': {e}")))?;
    warn_ignored(&name, &ignored);

    if file.steps.is_empty() {
        return Err(PlanError::Invalid(format!("test '{name}' has no steps")));
    }

    let mut steps = Vec::with_capacity(file.steps.len());
    for (k, body) in &file.steps {
        let step_name = scalar_to_string(k)
            .ok_or_else(|| PlanError::Invalid(format!("test '{name}': step names must be scalars")))?;
        if step_name.is_empty() || step_name == "." || step_name == ".." || step_name.contains('/')
        {
            return Err(PlanError::Invalid(format!(
                "test '{name}': step name '{step_name}' is not a directory name"
            )));
        }
        let directives = parse_directives(&name, &step_name, body)?;
        steps.push(Step {
            name: step_name,
            directives,
        });
    }

    Ok(TestSpec {
        name,
        inputs: file.inputs,
        steps,
    })
}

fn parse_directives(test: &str, step: &str, body: &Value) -> Result<Vec<Directive>, PlanError> {
    let invalid = |what: &str| PlanError::Invalid(format!("test '{test}', step '{step}': {what}"));

    let map = match body {
        Value::Null => return Ok(Vec::new()),
        Value::Mapping(m) => m,
        _ => return Err(invalid("step body must be a mapping")),
    };

    let mut out = Vec::new();
    for (k, v) in map {
        let key = k.as_str().unwrap_or_default();
        match key {
            "symlink" => {
                let targets = match v {
                    Value::Sequence(items) => items
                        .iter()
                        .map(scalar_to_string)
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| invalid("symlink entries must be paths"))?,
                    other => vec![scalar_to_string(other)
                        .ok_or_else(|| invalid("symlink must be a path or a list of paths"))?],
                };
                out.push(Directive::Symlink(targets));
            }
            "update_nml" => {
                let m = v
                    .as_mapping()
                    .ok_or_else(|| invalid("update_nml must map keys to values"))?;
                let pairs = m
                    .iter()
                    .map(|(k, v)| Some((scalar_to_string(k)?, scalar_to_string(v)?)))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| invalid("update_nml keys and values must be scalars"))?;
                out.push(Directive::UpdateNml(pairs));
            }
            "update_stream" => {
                let nodes = v
                    .as_mapping()
                    .ok_or_else(|| invalid("update_stream must map stream names to attributes"))?;
                let mut edits = Vec::new();
                for (node, attrs) in nodes {
                    let node = scalar_to_string(node)
                        .ok_or_else(|| invalid("stream names must be scalars"))?;
                    let attrs = attrs.as_mapping().ok_or_else(|| {
                        invalid(&format!("update_stream.{node} must map attributes to values"))
                    })?;
                    for (attr, value) in attrs {
                        edits.push(StreamEdit {
                            node: node.clone(),
                            attr: scalar_to_string(attr)
                                .ok_or_else(|| invalid("attribute names must be scalars"))?,
                            value: scalar_to_string(value)
                                .ok_or_else(|| invalid("attribute values must be scalars"))?,
                        });
                    }
                }
                out.push(Directive::UpdateStream(edits));
            }
            other => {
                tracing::warn!(event = "unknown_step_key", test, step, key = ?other);
                eprintln!("WARN: ignoring unknown key '{other}' in step '{step}' of test '{test}'");
            }
        }
    }
    Ok(out)
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn warn_ignored(scope: &str, keys: &[String]) {
    if !keys.is_empty() {
        tracing::warn!(event = "unknown_plan_fields", scope, keys = ?keys);
        eprintln!("WARN: Ignored unknown fields in {scope}: {keys:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
tests:
  jw_restart:
    inputs:
      model: ../../atmosphere_model
      grid: /glade/jw_input/x1.40962.grid.nc
      init: /glade/jw_input/x1.40962.init.nc
      partition: /glade/jw_input/x1.40962.graph.info.part.*
      nml: /glade/jw_input/namelist.atmosphere
      stream: /glade/jw_input/streams.atmosphere
      stream_out: /glade/jw_input/stream_list.atmosphere.output
    steps:
      base:
        update_stream:
          restart:
            output_interval: "01:00:00"
          output:
            output_interval: "02:00:00"
            filename_template: output_base.nc
      restart:
        symlink: ../base/restart.0000-01-01_01.00.00.nc
        update_nml:
          config_start_time: "0000-01-01_01:00:00"
          config_run_duration: "01:00:00"
          config_do_restart: true
        update_stream:
          output:
            filename_template: output_rest.nc
"#;

    #[test]
    fn parses_steps_in_order() {
        let plan = parse_plan(PLAN).unwrap();
        assert_eq!(plan.settings, RunnerSettings::default());
        assert_eq!(plan.tests.len(), 1);

        let t = &plan.tests[0];
        assert_eq!(t.name, "jw_restart");
        let names: Vec<_> = t.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["base", "restart"]);
        assert!(!t.steps[0].is_restart());
        assert!(t.steps[1].is_restart());
    }

    #[test]
    fn directives_keep_plan_order() {
        let plan = parse_plan(PLAN).unwrap();
        let restart = &plan.tests[0].steps[1];
        assert_eq!(
            restart.directives[0],
            Directive::Symlink(vec!["../base/restart.0000-01-01_01.00.00.nc".into()])
        );
        assert_eq!(
            restart.directives[1],
            Directive::UpdateNml(vec![
                ("config_start_time".into(), "0000-01-01_01:00:00".into()),
                ("config_run_duration".into(), "01:00:00".into()),
                ("config_do_restart".into(), "true".into()),
            ])
        );

        let base = &plan.tests[0].steps[0];
        let Directive::UpdateStream(edits) = &base.directives[0] else {
            panic!("expected stream edits");
        };
        let flat: Vec<_> = edits
            .iter()
            .map(|e| (e.node.as_str(), e.attr.as_str(), e.value.as_str()))
            .collect();
        assert_eq!(
            flat,
            [
                ("restart", "output_interval", "01:00:00"),
                ("output", "output_interval", "02:00:00"),
                ("output", "filename_template", "output_base.nc"),
            ]
        );
    }

    #[test]
    fn empty_step_body_has_no_directives() {
        let raw = "tests:\n  t:\n    inputs: {model: m, grid: g, init: i, nml: n, stream: s}\n    steps:\n      base:\n";
        let plan = parse_plan(raw).unwrap();
        assert!(plan.tests[0].steps[0].directives.is_empty());
        assert_eq!(plan.tests[0].inputs.partition, None);
    }

    #[test]
    fn rejects_plan_without_tests() {
        let err = parse_plan("settings: {}\n").unwrap_err();
        assert!(err.to_string().contains("no tests"));
    }

    #[test]
    fn rejects_test_without_steps() {
        let raw = "tests:\n  t:\n    inputs: {model: m, grid: g, init: i, nml: n, stream: s}\n";
        let err = parse_plan(raw).unwrap_err();
        assert!(err.to_string().contains("has no steps"));
    }

    #[test]
    fn rejects_path_like_step_name() {
        let raw = "tests:\n  t:\n    inputs: {model: m, grid: g, init: i, nml: n, stream: s}\n    steps:\n      ../up: {}\n";
        assert!(matches!(parse_plan(raw), Err(PlanError::Invalid(_))));
    }

    #[test]
    fn settings_override_defaults() {
        let raw = "settings:\n  pbs:\n    account: ABCD0001\n  job:\n    ppn: 32\n  base_step: reference\ntests:\n  t:\n    inputs: {model: m, grid: g, init: i, nml: n, stream: s}\n    steps:\n      base: {}\n";
        let plan = parse_plan(raw).unwrap();
        assert_eq!(plan.settings.pbs.account, "ABCD0001");
        assert_eq!(plan.settings.pbs.queue, "develop");
        assert_eq!(plan.settings.job.ppn, 32);
        assert_eq!(plan.settings.job.walltime, "02:00:00");
        assert_eq!(plan.settings.base_step, "reference");
    }
}
