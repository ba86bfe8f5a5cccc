// src/output/mod.rs
pub mod csv_out;
pub mod parquet_out;

use crate::process::MonthlyAggregate;
use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

pub use csv_out::{read_csv_aggregates, write_csv_aggregates};
pub use parquet_out::{aggregate_schema, read_parquet_aggregates};

/// Fixed output column order shared by both formats.
pub const COLUMNS: [&str; 4] = ["year", "month", "rundvekt_tonn", "rows"];

/// Where one dataset's monthly table is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub csv: PathBuf,
    pub parquet: PathBuf,
}

impl OutputPaths {
    /// `<out_dir>/<stem>_monthly.csv` and `<out_dir>/<stem>_monthly.parquet`.
    pub fn new(out_dir: &Path, stem: &str) -> Self {
        OutputPaths {
            csv: out_dir.join(format!("{}_monthly.csv", stem)),
            parquet: out_dir.join(format!("{}_monthly.parquet", stem)),
        }
    }
}

/// Write both formats. Both are written under `.tmp` names first and only
/// renamed into place once both are complete, so a failed run leaves the
/// previous pair untouched.
pub fn write_aggregates(aggregates: &[MonthlyAggregate], paths: &OutputPaths) -> Result<()> {
    for p in [&paths.csv, &paths.parquet] {
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
    }
    let csv_tmp = tmp_path(&paths.csv);
    let parquet_tmp = tmp_path(&paths.parquet);

    let written = csv_out::write_csv_file(aggregates, &csv_tmp)
        .and_then(|_| parquet_out::write_parquet_file(aggregates, &parquet_tmp));
    if let Err(e) = written {
        for tmp in [&csv_tmp, &parquet_tmp] {
            if tmp.is_file() {
                let _ = fs::remove_file(tmp);
            }
        }
        return Err(e);
    }

    commit(&csv_tmp, &paths.csv)?;
    commit(&parquet_tmp, &paths.parquet)?;
    debug!(csv = %paths.csv.display(), parquet = %paths.parquet.display(), rows = aggregates.len(), "wrote aggregates");
    Ok(())
}

/// Read a monthly table back, picking the format from the file extension.
pub fn read_aggregates(path: &Path) -> Result<Vec<MonthlyAggregate>> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("csv") => read_csv_aggregates(path),
        Some("parquet") => read_parquet_aggregates(path),
        _ => bail!("unsupported aggregate file {}", path.display()),
    }
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

pub(crate) fn commit(tmp: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp, path)
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))
}
