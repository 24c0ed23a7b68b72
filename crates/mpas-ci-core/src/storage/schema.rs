pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS perf_data (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  date TEXT DEFAULT CURRENT_TIMESTAMP,
  testcase TEXT NOT NULL,
  machine TEXT NOT NULL,
  device TEXT NOT NULL,
  compiler TEXT NOT NULL,
  mpas_version TEXT NOT NULL,
  min_time REAL NOT NULL,
  max_time REAL NOT NULL,
  avg_time REAL NOT NULL,
  stdev_time REAL NOT NULL
);
"#;

/// Matches the text form SQLite uses for `CURRENT_TIMESTAMP`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
