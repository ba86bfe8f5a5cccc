use crate::output::OutputPaths;
use crate::pipeline::{DatasetJob, PipelineOptions};
use crate::process::{Candidates, DatasetKind, NormalizeOptions};
use crate::process::resolve::DEFAULT_SAMPLE_BYTES;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// One input file and the stem its outputs are named after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Relative paths are taken from `raw_dir`.
    pub input: PathBuf,
    pub output_stem: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub raw_dir: PathBuf,
    pub out_dir: PathBuf,
    pub domestic: DatasetConfig,
    pub foreign: DatasetConfig,
    /// Bytes decoded per encoding/delimiter trial.
    pub sample_bytes: usize,
    pub sluttseddel_only: bool,
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            raw_dir: PathBuf::from("data/raw"),
            out_dir: PathBuf::from("data/processed"),
            domestic: DatasetConfig {
                input: PathBuf::from("landings_no.csv"),
                output_stem: "landings_no".into(),
            },
            foreign: DatasetConfig {
                input: PathBuf::from("landings_foreign.csv"),
                output_stem: "landings_foreign".into(),
            },
            sample_bytes: DEFAULT_SAMPLE_BYTES,
            sluttseddel_only: false,
            parallel: true,
        }
    }
}

impl Config {
    /// Defaults, overlaid with the YAML file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn dataset(&self, kind: DatasetKind) -> &DatasetConfig {
        match kind {
            DatasetKind::Domestic => &self.domestic,
            DatasetKind::Foreign => &self.foreign,
        }
    }

    pub fn input_path(&self, kind: DatasetKind) -> PathBuf {
        self.raw_dir.join(&self.dataset(kind).input)
    }

    pub fn jobs(&self) -> Vec<DatasetJob> {
        DatasetKind::ALL
            .iter()
            .map(|&kind| DatasetJob {
                kind,
                input: self.input_path(kind),
                outputs: OutputPaths::new(&self.out_dir, &self.dataset(kind).output_stem),
            })
            .collect()
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            candidates: Candidates::default().with_sample_bytes(self.sample_bytes),
            normalize: NormalizeOptions {
                sluttseddel_only: self.sluttseddel_only,
            },
            parallel: self.parallel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_the_raw_and_processed_layout() {
        let cfg = Config::default();
        let jobs = cfg.jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].input, PathBuf::from("data/raw/landings_no.csv"));
        assert_eq!(
            jobs[1].outputs.parquet,
            PathBuf::from("data/processed/landings_foreign_monthly.parquet")
        );
    }

    #[test]
    fn yaml_overrides_only_what_it_names() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(
            tmp,
            "raw_dir: /srv/fiskeridir\nsluttseddel_only: true\nforeign:\n  input: utenland.csv\n  output_stem: landings_utenland"
        )?;
        let cfg = Config::load(Some(tmp.path()))?;
        assert_eq!(cfg.raw_dir, PathBuf::from("/srv/fiskeridir"));
        assert!(cfg.sluttseddel_only);
        assert_eq!(cfg.out_dir, PathBuf::from("data/processed"));
        assert_eq!(
            cfg.input_path(DatasetKind::Foreign),
            PathBuf::from("/srv/fiskeridir/utenland.csv")
        );
        assert_eq!(cfg.domestic, Config::default().domestic);
        Ok(())
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/landings.yaml"))).is_err());
    }
}
