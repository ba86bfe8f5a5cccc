use crate::process::normalize::CanonicalRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Monthly total with provenance: how many records contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub year: i32,
    pub month: u32,
    pub total_weight_tonnes: f64,
    pub row_count: u64,
}

/// Neumaier compensated sum. Fed in record order, so the result is the same
/// on every run.
#[derive(Debug, Default, Clone, Copy)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Group records by (year, month), ascending.
pub fn aggregate(records: &[CanonicalRecord]) -> Vec<MonthlyAggregate> {
    let mut groups: BTreeMap<(i32, u32), (CompensatedSum, u64)> = BTreeMap::new();
    for rec in records {
        let (sum, count) = groups.entry((rec.year, rec.month)).or_default();
        sum.add(rec.weight_tonnes);
        *count += 1;
    }

    let out: Vec<MonthlyAggregate> = groups
        .into_iter()
        .map(|((year, month), (sum, row_count))| MonthlyAggregate {
            year,
            month,
            total_weight_tonnes: sum.total(),
            row_count,
        })
        .collect();
    debug!(records = records.len(), months = out.len(), "aggregated");
    out
}
