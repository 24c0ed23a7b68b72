use super::FileComparator;
use crate::errors::RunError;
use async_trait::async_trait;
use std::path::Path;

/// `cdo diffv a b`; exit code 0 means identical.
#[derive(Debug, Clone)]
pub struct CdoComparator {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CdoComparator {
    fn default() -> Self {
        Self {
            program: "cdo".into(),
            args: vec!["diffv".into()],
        }
    }
}

#[async_trait]
impl FileComparator for CdoComparator {
    async fn identical(&self, a: &Path, b: &Path) -> anyhow::Result<bool> {
        let out = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(a)
            .arg(b)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("could not run {}: {e}", self.program))?;

        if !out.status.success() {
            tracing::debug!(
                event = "diff_output",
                stdout = %String::from_utf8_lossy(&out.stdout),
                stderr = %String::from_utf8_lossy(&out.stderr)
            );
        }
        Ok(out.status.success())
    }
}

/// Fails when either file is missing or the comparator reports differences.
pub async fn compare_netcdf_files(
    cmp: &dyn FileComparator,
    a: &Path,
    b: &Path,
) -> Result<(), RunError> {
    for p in [a, b] {
        if !p.is_file() {
            tracing::error!(event = "compare_missing_file", path = %p.display());
            return Err(RunError::MissingFile(p.to_path_buf()));
        }
    }

    if cmp.identical(a, b).await? {
        tracing::info!(event = "files_identical", a = %a.display(), b = %b.display());
        println!("No differences found between {} and {}", a.display(), b.display());
        Ok(())
    } else {
        tracing::error!(event = "files_differ", a = %a.display(), b = %b.display());
        println!("Differences found between {} and {}", a.display(), b.display());
        Err(RunError::FilesDiffer(a.to_path_buf(), b.to_path_buf()))
    }
}
