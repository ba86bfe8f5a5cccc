use crate::process::MonthlyAggregate;
use anyhow::{bail, Result};
use serde::Serialize;

/// Total tonnes of one year in one aggregate file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTotal {
    pub label: String,
    pub year: i32,
    pub total_tonn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub file1: YearTotal,
    pub file2: YearTotal,
    pub difference_tonn: f64,
    pub abs_difference_tonn: f64,
    /// `None` when file2's total is zero.
    pub pct_difference_of_file2: Option<f64>,
    /// `None` when file1's total is zero.
    pub pct_difference_of_file1: Option<f64>,
}

/// Sum the latest year present, or `forced_year` when given.
pub fn summarize_latest(
    label: &str,
    aggregates: &[MonthlyAggregate],
    forced_year: Option<i32>,
) -> Result<YearTotal> {
    let Some(latest) = aggregates.iter().map(|a| a.year).max() else {
        bail!("no years found in {}", label);
    };
    let year = forced_year.unwrap_or(latest);
    let total_tonn = aggregates
        .iter()
        .filter(|a| a.year == year)
        .map(|a| a.total_weight_tonnes)
        .sum();
    Ok(YearTotal {
        label: label.to_string(),
        year,
        total_tonn,
    })
}

pub fn compare(a: YearTotal, b: YearTotal) -> Comparison {
    let diff = a.total_tonn - b.total_tonn;
    let pct = |base: f64| (base != 0.0).then(|| diff / base * 100.0);
    Comparison {
        difference_tonn: diff,
        abs_difference_tonn: diff.abs(),
        pct_difference_of_file2: pct(b.total_tonn),
        pct_difference_of_file1: pct(a.total_tonn),
        file1: a,
        file2: b,
    }
}
