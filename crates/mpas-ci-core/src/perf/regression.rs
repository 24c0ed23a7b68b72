use super::{PerfFilter, PerfRow};
use crate::storage::PerfStore;
use serde::Serialize;

/// Trailing window used when building a reference.
pub const DEFAULT_WINDOW_DAYS: i64 = 5;

/// Historic reference built from several stored samples.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ReferenceStats {
    pub mean: f64,
    pub stdev: f64,
    pub samples: usize,
}

impl ReferenceStats {
    /// One-sided 2-sigma bound.
    pub fn threshold(&self) -> f64 {
        self.mean + 2.0 * self.stdev
    }
}

/// Mean of the stored means and the root of the mean stored variance.
///
/// Rows are not weighted by how many timings produced them.
pub fn overall_stats(rows: &[PerfRow]) -> Option<ReferenceStats> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let mean = rows.iter().map(|r| r.avg_time).sum::<f64>() / n;
    let mean_var = rows.iter().map(|r| r.stdev_time.powi(2)).sum::<f64>() / n;

    Some(ReferenceStats {
        mean,
        stdev: mean_var.sqrt(),
        samples: rows.len(),
    })
}

pub fn is_regression(avg_time: f64, reference: &ReferenceStats) -> bool {
    avg_time > reference.threshold()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Comparison {
    NoData,
    Within { reference: ReferenceStats },
    Regression { reference: ReferenceStats, threshold: f64 },
}

impl Comparison {
    pub fn is_regression(&self) -> bool {
        matches!(self, Comparison::Regression { .. })
    }
}

pub fn compare_to_ref(
    store: &PerfStore,
    key: &PerfFilter,
    avg_time: f64,
    window_days: i64,
) -> anyhow::Result<Comparison> {
    let rows = store.last_n_days(window_days, Some(key))?;
    Ok(classify(avg_time, &rows))
}

pub fn classify(avg_time: f64, rows: &[PerfRow]) -> Comparison {
    let Some(reference) = overall_stats(rows) else {
        return Comparison::NoData;
    };

    if is_regression(avg_time, &reference) {
        tracing::warn!(
            event = "perf_regression",
            avg_time,
            mean = reference.mean,
            stdev = reference.stdev
        );
        Comparison::Regression {
            threshold: reference.threshold(),
            reference,
        }
    } else {
        Comparison::Within { reference }
    }
}
