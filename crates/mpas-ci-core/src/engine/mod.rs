pub mod rundir;
pub mod runner;

pub use runner::{ExperimentRunner, StepOutcome, TestOutcome};
