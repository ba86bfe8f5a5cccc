use anyhow::{bail, Context, Result};
use clap::Parser;
use landings_etl::output::{aggregate_schema, read_parquet_aggregates, write_csv_aggregates};
use parquet::arrow::parquet_to_arrow_schema;
use parquet::file::metadata::RowGroupMetaData;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::{
    fs::File,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(author, version, about = "Inspect monthly aggregate Parquet files")]
struct Args {
    /// Parquet files written by the pipeline
    files: Vec<PathBuf>,
    /// Also write `<file>.csv` next to each input
    #[arg(long)]
    csv: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.files.is_empty() {
        bail!("no parquet files given");
    }
    for path in &args.files {
        inspect(path, args.csv).with_context(|| format!("inspecting {}", path.display()))?;
    }
    Ok(())
}

/// Print file metadata, check the schema against the aggregate layout, and
/// dump the monthly rows.
fn inspect(path: &Path, to_csv: bool) -> Result<()> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    let meta = reader.metadata();
    let file_meta = meta.file_metadata();

    println!("=== Parquet File: {} ===", path.display());
    println!(
        "Created by:           {}",
        file_meta.created_by().unwrap_or("<unknown>")
    );
    println!("Total rows:           {}", file_meta.num_rows());
    println!("Number of row groups: {}", meta.num_row_groups());
    for (idx, rg) in meta.row_groups().iter().enumerate() {
        print_row_group(idx, rg);
    }

    let schema = parquet_to_arrow_schema(file_meta.schema_descr(), file_meta.key_value_metadata())?;
    let expected = aggregate_schema();
    if schema.fields() != expected.fields() {
        println!("!! schema differs from the monthly aggregate layout:");
        for f in schema.fields() {
            println!("   - {}: {:?}", f.name(), f.data_type());
        }
        return Ok(());
    }

    let rows = read_parquet_aggregates(path)?;
    println!();
    println!("{:>6} {:>6} {:>18} {:>10}", "year", "month", "rundvekt_tonn", "rows");
    println!("{:-<43}", "");
    for r in &rows {
        println!(
            "{:>6} {:>6} {:>18.3} {:>10}",
            r.year, r.month, r.total_weight_tonnes, r.row_count
        );
    }
    println!();

    if to_csv {
        let out = path.with_extension("csv");
        write_csv_aggregates(&rows, &out)?;
        println!("Saved CSV: {}", out.display());
    }
    Ok(())
}

fn print_row_group(idx: usize, rg: &RowGroupMetaData) {
    println!("--- Row Group {} ---", idx);
    println!("  Rows in this RG:        {}", rg.num_rows());
    println!("  Uncompressed size (RG): {} bytes", rg.total_byte_size());
    for col in rg.columns() {
        println!(
            "  > {:<14} {:?} compressed={}B",
            col.column_descr().name(),
            col.compression(),
            col.compressed_size()
        );
    }
}
