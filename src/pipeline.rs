// src/pipeline.rs
use crate::output::{write_aggregates, OutputPaths};
use crate::process::{
    self, aggregate, normalize_with, reshape, Candidates, DatasetKind, EncodingGuess,
    FailureReason, NormalizeOptions,
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::{collections::BTreeMap, fmt, path::PathBuf, time::Instant};
use tracing::{error, info, instrument};

/// One dataset to run: which role the input plays and where results go.
#[derive(Debug, Clone)]
pub struct DatasetJob {
    pub kind: DatasetKind,
    pub input: PathBuf,
    pub outputs: OutputPaths,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub candidates: Candidates,
    pub normalize: NormalizeOptions,
    /// Run datasets on the rayon pool instead of one after another.
    pub parallel: bool,
}

/// What one dataset run produced, for the summary.
#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub kind: DatasetKind,
    pub input: PathBuf,
    pub guess: EncodingGuess,
    pub outputs: OutputPaths,
    pub months: usize,
    pub total_rows: usize,
    pub contributing_rows: u64,
    pub total_weight_tonnes: f64,
    pub failure_count: usize,
    pub failures: BTreeMap<FailureReason, usize>,
    pub skipped: usize,
    pub anomalies: usize,
}

impl fmt::Display for DatasetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) -> {} months, {:.3} t from {}/{} rows",
            self.kind,
            self.input.display(),
            self.guess,
            self.months,
            self.total_weight_tonnes,
            self.contributing_rows,
            self.total_rows,
        )?;
        if self.failure_count > 0 {
            let reasons: Vec<String> = self
                .failures
                .iter()
                .map(|(reason, n)| format!("{}={}", reason, n))
                .collect();
            write!(f, "; {} failed ({})", self.failure_count, reasons.join(", "))?;
        }
        if self.skipped > 0 {
            write!(f, "; {} skipped", self.skipped)?;
        }
        if self.anomalies > 0 {
            write!(f, "; {} ragged", self.anomalies)?;
        }
        Ok(())
    }
}

/// Resolve → read → reshape → normalize → aggregate → write, for one dataset.
#[instrument(level = "info", skip(job, options), fields(kind = %job.kind, input = %job.input.display()))]
pub fn run_dataset(job: &DatasetJob, options: &PipelineOptions) -> Result<DatasetReport> {
    let start = Instant::now();

    let (guess, table) = process::load_landings_csv(&job.input, &options.candidates)
        .with_context(|| format!("loading {} landings", job.kind))?;
    let anomalies = table.anomalies.len();

    let table = reshape::to_long(table);
    let normalized = normalize_with(&table, job.kind, &options.normalize);
    let monthly = aggregate(&normalized.records);

    let contributing_rows: u64 = monthly.iter().map(|m| m.row_count).sum();
    debug_assert_eq!(
        contributing_rows as usize + normalized.failure_count + normalized.skipped,
        table.len()
    );

    write_aggregates(&monthly, &job.outputs)
        .with_context(|| format!("writing {} aggregates", job.kind))?;

    let report = DatasetReport {
        kind: job.kind,
        input: job.input.clone(),
        guess,
        outputs: job.outputs.clone(),
        months: monthly.len(),
        total_rows: table.len(),
        contributing_rows,
        total_weight_tonnes: monthly.iter().map(|m| m.total_weight_tonnes).sum(),
        failure_count: normalized.failure_count,
        failures: normalized.failures,
        skipped: normalized.skipped,
        anomalies,
    };
    info!(
        months = report.months,
        rows = report.total_rows,
        failed = report.failure_count,
        elapsed = ?start.elapsed(),
        "dataset done"
    );
    Ok(report)
}

/// Run every job. A failing dataset is reported in its slot and never stops
/// the others. Results keep the order of `jobs`.
pub fn run_all(
    jobs: &[DatasetJob],
    options: &PipelineOptions,
) -> Vec<(DatasetKind, Result<DatasetReport>)> {
    let run = |job: &DatasetJob| {
        let res = run_dataset(job, options);
        if let Err(e) = &res {
            error!(kind = %job.kind, "dataset failed: {:#}", e);
        }
        (job.kind, res)
    };
    if options.parallel {
        jobs.par_iter().map(run).collect()
    } else {
        jobs.iter().map(run).collect()
    }
}
