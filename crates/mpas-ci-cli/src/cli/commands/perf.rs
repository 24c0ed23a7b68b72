//! Perf database commands. Database failures are reported and swallowed:
//! a broken perf store must not fail the CI job that feeds it.

use super::exit_codes;
use crate::cli::args::{CreateDbArgs, OutputFormat, PerfStatsArgs, QueryPerfArgs};
use mpas_ci_core::perf::regression::{classify, overall_stats, Comparison};
use mpas_ci_core::perf::{aggregate, parse_timings, PerfFilter, PerfRecord, PerfRow};
use mpas_ci_core::storage::PerfStore;
use serde_json::json;
use std::path::Path;

fn connect(db_file: &Path) -> Option<PerfStore> {
    match PerfStore::open(db_file) {
        Ok(store) => {
            println!("Connected to SQLite database: {}", db_file.display());
            Some(store)
        }
        Err(e) => {
            report_db_error(&e);
            println!("Error! Cannot create the database connection.");
            None
        }
    }
}

fn report_db_error(e: &anyhow::Error) {
    tracing::error!(event = "perf_db_error", error = %format!("{e:#}"));
    println!("{e:#}");
}

pub fn cmd_create_db(args: CreateDbArgs) -> i32 {
    let Some(store) = connect(&args.db_file) else {
        return exit_codes::OK;
    };
    match store.init_schema() {
        Ok(()) => println!("Table created successfully"),
        Err(e) => report_db_error(&e),
    }
    exit_codes::OK
}

pub fn cmd_perf_stats(args: PerfStatsArgs) -> i32 {
    let timings = match parse_timings(&args.timings) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return exit_codes::CONFIG_ERROR;
        }
    };
    let Some(summary) = aggregate(&timings) else {
        return exit_codes::CONFIG_ERROR;
    };

    let Some(store) = connect(&args.db_file) else {
        return exit_codes::OK;
    };

    let key = PerfFilter {
        testcase: args.testcase,
        machine: args.machine,
        device: args.device,
        compiler: args.compiler,
    };
    let record = PerfRecord::from_summary(&key, &args.commit, &summary);
    match store.init_schema().and_then(|()| store.insert(&record)) {
        Ok(id) => {
            tracing::info!(event = "perf_recorded", id, testcase = %key.testcase);
            println!("Data inserted successfully");
        }
        Err(e) => report_db_error(&e),
    }
    exit_codes::OK
}

pub fn cmd_query_perf(args: QueryPerfArgs) -> anyhow::Result<i32> {
    match args.action.as_str() {
        "ls" => Ok(query_ls(&args)),
        "compare_to_ref" => query_compare(&args),
        other => {
            println!("Unknown action: {other}");
            Ok(exit_codes::OK)
        }
    }
}

/// The four identifying arguments, when all were given.
fn filter_from(args: &QueryPerfArgs) -> Option<PerfFilter> {
    Some(PerfFilter {
        testcase: args.testcase.clone()?,
        machine: args.machine.clone()?,
        device: args.device.clone()?,
        compiler: args.compiler.clone()?,
    })
}

fn query_ls(args: &QueryPerfArgs) -> i32 {
    let Some(store) = connect(&args.db_file) else {
        return exit_codes::OK;
    };
    let filter = filter_from(args);
    let rows = match store.last_n_days(args.days, filter.as_ref()) {
        Ok(rows) => rows,
        Err(e) => {
            report_db_error(&e);
            return exit_codes::OK;
        }
    };
    let reference = overall_stats(&rows);

    match args.format {
        OutputFormat::Json => {
            let out = json!({ "days": args.days, "rows": rows, "reference": reference });
            println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        }
        OutputFormat::Text => {
            print_rows(&rows);
            match reference {
                Some(r) => println!(
                    "Average mean, std_dev for the last {} days: {} {}",
                    args.days, r.mean, r.stdev
                ),
                None => println!("No data found for the last {} days.", args.days),
            }
        }
    }
    exit_codes::OK
}

fn query_compare(args: &QueryPerfArgs) -> anyhow::Result<i32> {
    let (Some(key), Some(raw)) = (filter_from(args), args.timings.as_deref()) else {
        eprintln!(
            "Usage: mpas-ci query-perf compare_to_ref <DB_FILE> <TESTCASE> <MACHINE> <DEVICE> <COMPILER> <TIMINGS>"
        );
        return Ok(exit_codes::CONFIG_ERROR);
    };
    let timings = match parse_timings(raw) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let current = aggregate(&timings).ok_or_else(|| anyhow::anyhow!("no timings"))?;
    if args.format == OutputFormat::Text {
        println!("Current mean, std_dev : {} {}", current.avg, current.stdev);
    }

    let Some(store) = connect(&args.db_file) else {
        return Ok(exit_codes::OK);
    };
    let rows = match store.last_n_days(args.days, Some(&key)) {
        Ok(rows) => rows,
        Err(e) => {
            report_db_error(&e);
            return Ok(exit_codes::OK);
        }
    };
    let comparison = classify(current.avg, &rows);

    match args.format {
        OutputFormat::Json => {
            let out = json!({
                "key": key,
                "days": args.days,
                "current": current,
                "comparison": comparison,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            print_rows(&rows);
            match &comparison {
                Comparison::NoData => println!("No data found for the last {} days.", args.days),
                Comparison::Within { reference } | Comparison::Regression { reference, .. } => {
                    println!(
                        "Average mean, std_dev for the last {} days: {} {}",
                        args.days, reference.mean, reference.stdev
                    );
                }
            }
            if comparison.is_regression() {
                println!(
                    "Performance regression detected for {} on {} using {} with {}.",
                    key.testcase, key.machine, key.device, key.compiler
                );
            }
        }
    }

    if comparison.is_regression() && args.fail_on_regression {
        return Ok(exit_codes::TEST_FAILED);
    }
    Ok(exit_codes::OK)
}

fn print_rows(rows: &[PerfRow]) {
    for r in rows {
        println!(
            "{:>5}  {}  {}  {}  {}  {}  {}  min={} max={} avg={} stdev={}",
            r.id,
            r.date.as_deref().unwrap_or("-"),
            r.testcase,
            r.machine,
            r.device,
            r.compiler,
            r.mpas_version,
            r.min_time,
            r.max_time,
            r.avg_time,
            r.stdev_time
        );
    }
}
