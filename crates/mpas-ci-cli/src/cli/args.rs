use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mpas-ci",
    version,
    about = "MPAS CI helpers: performance tracking and restart tests on PBS"
)]
pub struct Cli {
    /// tracing filter, e.g. `info` or `mpas_ci_core=debug`
    #[arg(long, global = true, default_value = "info", env = "MPAS_CI_LOG")]
    pub log_level: String,

    /// emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the performance database and its table
    CreateDb(CreateDbArgs),
    /// Record one performance sample
    PerfStats(PerfStatsArgs),
    /// Inspect recent samples or check a new one against them
    QueryPerf(QueryPerfArgs),
    /// Run a YAML test plan on PBS
    RunTests(RunTestsArgs),
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CreateDbArgs {
    #[arg(env = "MPAS_CI_DB")]
    pub db_file: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PerfStatsArgs {
    #[arg(env = "MPAS_CI_DB")]
    pub db_file: PathBuf,
    pub testcase: String,
    pub machine: String,
    pub device: String,
    pub compiler: String,
    /// MPAS version or commit the timings were measured with
    pub commit: String,
    /// comma separated timings in seconds
    pub timings: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct QueryPerfArgs {
    /// ls | compare_to_ref
    pub action: String,
    #[arg(env = "MPAS_CI_DB")]
    pub db_file: PathBuf,
    pub testcase: Option<String>,
    pub machine: Option<String>,
    pub device: Option<String>,
    pub compiler: Option<String>,
    /// comma separated timings of the run under test
    pub timings: Option<String>,

    /// size of the trailing reference window
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(i64).range(0..=36500))]
    pub days: i64,

    /// exit 1 when a regression is detected
    #[arg(long)]
    pub fail_on_regression: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunTestsArgs {
    pub plan: PathBuf,

    /// directory the per-test run directories are created in
    #[arg(long, default_value = "test", env = "MPAS_CI_WORKDIR")]
    pub workdir: PathBuf,

    /// seconds to wait after submission before the first status poll
    #[arg(long)]
    pub initial_delay: Option<u64>,

    /// seconds between status polls
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// give up on a job after this many seconds (default: wait forever)
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long, default_value = "qsub", env = "MPAS_CI_QSUB")]
    pub submit_cmd: String,

    #[arg(long, default_value = "qstat", env = "MPAS_CI_QSTAT")]
    pub status_cmd: String,

    #[arg(long, default_value = "cdo", env = "MPAS_CI_CDO")]
    pub diff_cmd: String,

    /// write a JSON summary of the finished steps here
    #[arg(long)]
    pub summary: Option<PathBuf>,
}
