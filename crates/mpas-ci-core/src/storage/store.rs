use crate::perf::{PerfFilter, PerfRecord, PerfRow};
use crate::storage::schema::{DATE_FORMAT, DDL};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "SELECT id, date, testcase, machine, device, compiler, mpas_version,
        min_time, max_time, avg_time, stdev_time
 FROM perf_data";

#[derive(Clone)]
pub struct PerfStore {
    pub conn: Arc<Mutex<Connection>>,
}

impl PerfStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite db {}", path.display()))?;
        tracing::debug!(event = "db_open", path = %path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("perf store connection poisoned"))
    }

    /// Creates `perf_data` if it does not exist yet. Safe to call on every open.
    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(DDL)
            .context("failed to create perf_data table")?;
        Ok(())
    }

    /// Appends one sample. Rows are never updated or deduplicated.
    pub fn insert(&self, rec: &PerfRecord) -> anyhow::Result<i64> {
        let conn = self.lock()?;
        match &rec.date {
            Some(date) => conn.execute(
                "INSERT INTO perf_data (date, testcase, machine, device, compiler, mpas_version,
                    min_time, max_time, avg_time, stdev_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    date.format(DATE_FORMAT).to_string(),
                    rec.testcase,
                    rec.machine,
                    rec.device,
                    rec.compiler,
                    rec.mpas_version,
                    rec.min_time,
                    rec.max_time,
                    rec.avg_time,
                    rec.stdev_time
                ],
            )?,
            None => conn.execute(
                "INSERT INTO perf_data (testcase, machine, device, compiler, mpas_version,
                    min_time, max_time, avg_time, stdev_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    rec.testcase,
                    rec.machine,
                    rec.device,
                    rec.compiler,
                    rec.mpas_version,
                    rec.min_time,
                    rec.max_time,
                    rec.avg_time,
                    rec.stdev_time
                ],
            )?,
        };
        let id = conn.last_insert_rowid();
        tracing::debug!(event = "perf_insert", id, testcase = %rec.testcase);
        Ok(id)
    }

    /// Rows dated within the last `days` days, oldest first.
    pub fn last_n_days(
        &self,
        days: i64,
        filter: Option<&PerfFilter>,
    ) -> anyhow::Result<Vec<PerfRow>> {
        let cutoff = Duration::try_days(days)
            .filter(|_| days >= 0)
            .and_then(|d| Utc::now().checked_sub_signed(d))
            .with_context(|| format!("day window {days} is out of range"))?;
        self.since(cutoff, filter)
    }

    pub fn since(
        &self,
        cutoff: DateTime<Utc>,
        filter: Option<&PerfFilter>,
    ) -> anyhow::Result<Vec<PerfRow>> {
        let cutoff = cutoff.format(DATE_FORMAT).to_string();
        let conn = self.lock()?;

        let rows = match filter {
            Some(f) => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS}
                     WHERE date >= ?1 AND testcase = ?2 AND machine = ?3 AND device = ?4 AND compiler = ?5
                     ORDER BY id"
                ))?;
                let mapped = stmt.query_map(
                    params![cutoff, f.testcase, f.machine, f.device, f.compiler],
                    row_to_perf,
                )?;
                mapped.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_COLUMNS} WHERE date >= ?1 ORDER BY id"))?;
                let mapped = stmt.query_map(params![cutoff], row_to_perf)?;
                mapped.collect::<Result<Vec<_>, _>>()?
            }
        };

        tracing::debug!(event = "perf_query", cutoff = %cutoff, rows = rows.len());
        Ok(rows)
    }

    pub fn count(&self) -> anyhow::Result<u64> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT count(*) FROM perf_data", [], |r| r.get(0))?;
        Ok(n as u64)
    }
}

fn row_to_perf(row: &rusqlite::Row<'_>) -> rusqlite::Result<PerfRow> {
    Ok(PerfRow {
        id: row.get(0)?,
        date: row.get(1)?,
        testcase: row.get(2)?,
        machine: row.get(3)?,
        device: row.get(4)?,
        compiler: row.get(5)?,
        mpas_version: row.get(6)?,
        min_time: row.get(7)?,
        max_time: row.get(8)?,
        avg_time: row.get(9)?,
        stdev_time: row.get(10)?,
    })
}
