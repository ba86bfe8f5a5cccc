use anyhow::Result;
use clap::Parser;
use landings_etl::{config::Config, pipeline};
use std::{fs, path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Monthly landings aggregates from raw Fiskeridir CSV exports"
)]
struct Args {
    /// YAML config file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    raw_dir: Option<PathBuf>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Domestic landings file, relative to the raw dir.
    #[arg(long)]
    domestic: Option<PathBuf>,
    /// Foreign landings file, relative to the raw dir.
    #[arg(long)]
    foreign: Option<PathBuf>,
    #[arg(long)]
    sample_bytes: Option<usize>,
    /// Keep only sluttseddel rows (document type 0) in domestic data.
    #[arg(long)]
    sluttseddel_only: bool,
    /// Process datasets one after the other.
    #[arg(long)]
    sequential: bool,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut cfg = Config::load(self.config.as_deref())?;
        if let Some(d) = self.raw_dir {
            cfg.raw_dir = d;
        }
        if let Some(d) = self.out_dir {
            cfg.out_dir = d;
        }
        if let Some(p) = self.domestic {
            cfg.domestic.input = p;
        }
        if let Some(p) = self.foreign {
            cfg.foreign.input = p;
        }
        if let Some(n) = self.sample_bytes {
            cfg.sample_bytes = n;
        }
        cfg.sluttseddel_only |= self.sluttseddel_only;
        cfg.parallel &= !self.sequential;
        Ok(cfg)
    }
}

fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configure dirs ───────────────────────────────────────────
    let cfg = Args::parse().into_config()?;
    fs::create_dir_all(&cfg.out_dir)?;
    info!(raw = %cfg.raw_dir.display(), out = %cfg.out_dir.display(), "configured");

    // ─── 3) run both datasets ────────────────────────────────────────
    let results = pipeline::run_all(&cfg.jobs(), &cfg.pipeline_options());

    // ─── 4) summary ──────────────────────────────────────────────────
    let mut failed = 0;
    for (kind, res) in &results {
        match res {
            Ok(report) => println!("{}", report),
            Err(e) => {
                failed += 1;
                error!(%kind, "{:#}", e);
                println!("[{}] {} -> FAILED: {:#}", kind, cfg.input_path(*kind).display(), e);
            }
        }
    }

    if failed > 0 {
        println!("{} of {} datasets failed", failed, results.len());
        return Ok(ExitCode::FAILURE);
    }
    println!(
        "done: {}/*_monthly.csv|*_monthly.parquet",
        cfg.out_dir.display()
    );
    Ok(ExitCode::SUCCESS)
}
