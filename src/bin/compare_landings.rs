// src/bin/compare_landings.rs
//
// Compare the latest-year total rundvekt between two monthly aggregate files
// (CSV or Parquet, picked by extension).

use anyhow::{Context, Result};
use clap::Parser;
use landings_etl::{compare, output::read_aggregates};
use std::{fs, path::PathBuf};

#[derive(Parser)]
#[command(author, version, about = "Compare latest-year rundvekt_tonn between two aggregates")]
struct Args {
    /// First aggregate file (e.g. foreign landings)
    #[arg(long)]
    file1: PathBuf,
    /// Second aggregate file (e.g. domestic landings)
    #[arg(long)]
    file2: PathBuf,
    #[arg(long, default_value = "File 1")]
    label1: String,
    #[arg(long, default_value = "File 2")]
    label2: String,
    /// Compare this year instead of each file's latest
    #[arg(long)]
    year: Option<i32>,
    /// Write the comparison as JSON here
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let args = Args::parse();

    let a = read_aggregates(&args.file1)
        .with_context(|| format!("reading {}", args.file1.display()))?;
    let b = read_aggregates(&args.file2)
        .with_context(|| format!("reading {}", args.file2.display()))?;

    let a = compare::summarize_latest(&args.label1, &a, args.year)?;
    let b = compare::summarize_latest(&args.label2, &b, args.year)?;
    let c = compare::compare(a, b);

    println!("{: <25} {:>8} {:>18}", "Series", "Year", "rundvekt_tonn");
    println!("{:-<53}", "");
    for t in [&c.file1, &c.file2] {
        println!("{: <25} {:>8} {:>18.3}", t.label, t.year, t.total_tonn);
    }
    println!();
    println!("difference:     {:.3} t", c.difference_tonn);
    println!("abs difference: {:.3} t", c.abs_difference_tonn);
    match c.pct_difference_of_file2 {
        Some(p) => println!("% of {}: {:.2}%", c.file2.label, p),
        None => println!("% of {}: n/a (zero total)", c.file2.label),
    }
    match c.pct_difference_of_file1 {
        Some(p) => println!("% of {}: {:.2}%", c.file1.label, p),
        None => println!("% of {}: n/a (zero total)", c.file1.label),
    }

    if let Some(out) = &args.out {
        let json = serde_json::to_string_pretty(&c)?;
        fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
        println!("saved {}", out.display());
    }
    Ok(())
}
