use crate::output::COLUMNS;
use crate::process::MonthlyAggregate;
use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Float64Array, Int32Array, Int64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{fs::File, path::Path, sync::Arc};
use tracing::debug;

pub fn aggregate_schema() -> Schema {
    Schema::new(vec![
        Field::new(COLUMNS[0], DataType::Int32, false),
        Field::new(COLUMNS[1], DataType::Int32, false),
        Field::new(COLUMNS[2], DataType::Float64, false),
        Field::new(COLUMNS[3], DataType::Int64, false),
    ])
}

fn to_batch(aggregates: &[MonthlyAggregate], schema: Arc<Schema>) -> Result<RecordBatch> {
    let years = Int32Array::from_iter_values(aggregates.iter().map(|a| a.year));
    let months = Int32Array::from_iter_values(aggregates.iter().map(|a| a.month as i32));
    let weights = Float64Array::from_iter_values(aggregates.iter().map(|a| a.total_weight_tonnes));
    let rows = aggregates
        .iter()
        .map(|a| i64::try_from(a.row_count))
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("row count does not fit in Int64")?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(years),
        Arc::new(months),
        Arc::new(weights),
        Arc::new(Int64Array::from(rows)),
    ];
    RecordBatch::try_new(schema, columns).context("building aggregate record batch")
}

/// Single record batch, Snappy compressed. Deterministic for identical input.
pub(crate) fn write_parquet_file(aggregates: &[MonthlyAggregate], path: &Path) -> Result<()> {
    let schema = Arc::new(aggregate_schema());
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))
        .context("creating Arrow writer for aggregates")?;
    if !aggregates.is_empty() {
        let batch = to_batch(aggregates, schema)?;
        writer.write(&batch).context("writing aggregate batch")?;
    }
    writer.close().context("closing parquet writer")?;
    debug!(path = %path.display(), rows = aggregates.len(), "wrote parquet");
    Ok(())
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("missing column {}", name))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow!("column {} has unexpected type", name))
}

pub fn read_parquet_aggregates(path: &Path) -> Result<Vec<MonthlyAggregate>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata from {}", path.display()))?
        .build()?;

    let mut out = Vec::new();
    for batch in reader {
        let batch = batch?;
        let years = column::<Int32Array>(&batch, COLUMNS[0])?;
        let months = column::<Int32Array>(&batch, COLUMNS[1])?;
        let weights = column::<Float64Array>(&batch, COLUMNS[2])?;
        let rows = column::<Int64Array>(&batch, COLUMNS[3])?;
        for i in 0..batch.num_rows() {
            if years.is_null(i) || months.is_null(i) || weights.is_null(i) || rows.is_null(i) {
                return Err(anyhow!("{}: null value at row {}", path.display(), i));
            }
            out.push(MonthlyAggregate {
                year: years.value(i),
                month: u32::try_from(months.value(i))
                    .with_context(|| format!("negative month at row {}", i))?,
                total_weight_tonnes: weights.value(i),
                row_count: u64::try_from(rows.value(i))
                    .with_context(|| format!("negative row count at row {}", i))?,
            });
        }
    }
    Ok(out)
}
