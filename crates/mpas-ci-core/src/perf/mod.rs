//! Performance samples and the statistics computed over them.

pub mod regression;

use crate::errors::PerfError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timing sample as submitted by a CI job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerfRecord {
    pub testcase: String,
    pub machine: String,
    pub device: String,
    pub compiler: String,
    pub mpas_version: String,
    pub min_time: f64,
    pub max_time: f64,
    pub avg_time: f64,
    pub stdev_time: f64,
    /// `None` lets the database stamp the row with `CURRENT_TIMESTAMP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl PerfRecord {
    pub fn from_summary(key: &PerfFilter, mpas_version: &str, summary: &TimingSummary) -> Self {
        Self {
            testcase: key.testcase.clone(),
            machine: key.machine.clone(),
            device: key.device.clone(),
            compiler: key.compiler.clone(),
            mpas_version: mpas_version.to_string(),
            min_time: summary.min,
            max_time: summary.max,
            avg_time: summary.avg,
            stdev_time: summary.stdev,
            date: None,
        }
    }
}

/// A stored row, as read back from `perf_data`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerfRow {
    pub id: i64,
    pub date: Option<String>,
    pub testcase: String,
    pub machine: String,
    pub device: String,
    pub compiler: String,
    pub mpas_version: String,
    pub min_time: f64,
    pub max_time: f64,
    pub avg_time: f64,
    pub stdev_time: f64,
}

/// Exact-match key that selects comparable samples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerfFilter {
    pub testcase: String,
    pub machine: String,
    pub device: String,
    pub compiler: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TimingSummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// Population standard deviation (divides by N).
    pub stdev: f64,
}

/// Parses a comma separated list such as `"12.1, 12.4,11.9"`.
pub fn parse_timings(raw: &str) -> Result<Vec<f64>, PerfError> {
    let values = raw
        .split(',')
        .map(|s| {
            let s = s.trim();
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PerfError::InvalidTiming(s.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if values.is_empty() {
        return Err(PerfError::NoTimings);
    }
    Ok(values)
}

pub fn aggregate(samples: &[f64]) -> Option<TimingSummary> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;

    Some(TimingSummary {
        min,
        max,
        avg,
        stdev: variance.sqrt(),
    })
}
