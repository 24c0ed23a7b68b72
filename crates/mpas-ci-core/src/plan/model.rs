use crate::config::RunnerSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct TestPlan {
    pub settings: RunnerSettings,
    /// In declaration order.
    pub tests: Vec<TestSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestSpec {
    pub name: String,
    pub inputs: Inputs,
    /// In declaration order.
    pub steps: Vec<Step>,
}

/// Files every run directory is populated from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Inputs {
    /// Compiled model executable.
    pub model: String,
    pub grid: String,
    pub init: String,
    /// Glob matching the graph partition files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    pub nml: String,
    pub stream: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_out: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    /// Applied in the order they appear in the plan.
    pub directives: Vec<Directive>,
}

impl Step {
    pub fn is_restart(&self) -> bool {
        self.name.contains("restart")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Paths linked into the run directory under their file names.
    Symlink(Vec<String>),
    /// Namelist key, replacement value.
    UpdateNml(Vec<(String, String)>),
    UpdateStream(Vec<StreamEdit>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamEdit {
    pub node: String,
    pub attr: String,
    pub value: String,
}
