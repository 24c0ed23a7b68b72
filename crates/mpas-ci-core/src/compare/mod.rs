//! Bit-for-bit checks between model output files.

pub mod netcdf;

pub use netcdf::{compare_netcdf_files, CdoComparator};

use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait FileComparator: Send + Sync {
    /// `Ok(true)` when the tool reports no differences.
    async fn identical(&self, a: &Path, b: &Path) -> anyhow::Result<bool>;
}
