use crate::output::{commit, tmp_path, COLUMNS};
use crate::process::MonthlyAggregate;
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::{fs::File, path::Path};
use tracing::debug;

/// Write `year,month,rundvekt_tonn,rows` with a header line, via a `.tmp`
/// file renamed into place.
pub fn write_csv_aggregates(aggregates: &[MonthlyAggregate], path: &Path) -> Result<()> {
    let tmp = tmp_path(path);
    write_csv_file(aggregates, &tmp)?;
    commit(&tmp, path)?;
    debug!(path = %path.display(), rows = aggregates.len(), "wrote csv");
    Ok(())
}

/// Write straight to `path`. Floats use Rust's shortest round-trip formatting.
pub(crate) fn write_csv_file(aggregates: &[MonthlyAggregate], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut wtr = WriterBuilder::new().from_writer(file);
    wtr.write_record(COLUMNS)?;
    for a in aggregates {
        wtr.write_record([
            a.year.to_string(),
            a.month.to_string(),
            a.total_weight_tonnes.to_string(),
            a.row_count.to_string(),
        ])?;
    }
    wtr.flush()
        .with_context(|| format!("flushing {}", path.display()))
}

pub fn read_csv_aggregates(path: &Path) -> Result<Vec<MonthlyAggregate>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = rdr.headers()?.clone();
    let found: Vec<&str> = headers.iter().collect();
    if found != COLUMNS {
        return Err(anyhow!(
            "{}: expected columns {:?}, found {:?}",
            path.display(),
            COLUMNS,
            found
        ));
    }

    let mut out = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("{} record {}", path.display(), idx))?;
        let field = |i: usize| rec.get(i).unwrap_or_default().trim();
        out.push(MonthlyAggregate {
            year: field(0)
                .parse()
                .with_context(|| format!("year at record {}", idx))?,
            month: field(1)
                .parse()
                .with_context(|| format!("month at record {}", idx))?,
            total_weight_tonnes: field(2)
                .parse()
                .with_context(|| format!("rundvekt_tonn at record {}", idx))?,
            row_count: field(3)
                .parse()
                .with_context(|| format!("rows at record {}", idx))?,
        });
    }
    Ok(out)
}
