use super::args::*;

pub mod perf;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const TEST_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::CreateDb(args) => Ok(perf::cmd_create_db(args)),
        Command::PerfStats(args) => Ok(perf::cmd_perf_stats(args)),
        Command::QueryPerf(args) => perf::cmd_query_perf(args),
        Command::RunTests(args) => run_tests::cmd_run_tests(args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}
