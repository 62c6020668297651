//src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{io_err, ReportError, Result};

pub const DEFAULT_MODULE: &str = "short-read-taxonomy";

/// Stage directories created under the module output directory.
pub const OUT_SUBDIRS: [&str; 5] = [
    "0_masked_fastqs",
    "1_metaphlan",
    "2_kraken2",
    "3_xtree",
    "final_reports",
];

/// Per-tool log directories created under the log directory.
pub const LOG_SUBDIRS: [&str; 5] = ["masking", "metaphlan", "kraken2", "bracken", "xtree"];

/// The working directory tree of one pipeline run.
///
/// Built once from the work dir and handed to whichever stage needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDirs {
    pub out: PathBuf,
    pub tmp: PathBuf,
    pub log: PathBuf,
}

impl WorkflowDirs {
    pub fn new<P: AsRef<Path>>(work_dir: P, module: &str) -> Self {
        let work_dir = work_dir.as_ref();
        Self {
            out: work_dir.join(module),
            tmp: work_dir.join("tmp"),
            log: work_dir.join("logs"),
        }
    }

    /// Create the directory tree. A root that already exists is left as is,
    /// subdirectories included.
    pub fn ensure(&self) -> Result<()> {
        if !self.out.exists() {
            for sub in OUT_SUBDIRS {
                let dir = self.out.join(sub);
                fs::create_dir_all(&dir).map_err(io_err(&dir))?;
            }
        }
        if !self.tmp.exists() {
            fs::create_dir_all(&self.tmp).map_err(io_err(&self.tmp))?;
        }
        if !self.log.exists() {
            for sub in LOG_SUBDIRS {
                let dir = self.log.join(sub);
                fs::create_dir_all(&dir).map_err(io_err(&dir))?;
            }
        }
        log::info!("Working directories ready under {}", self.out.display());
        Ok(())
    }

    pub fn metaphlan_dir(&self) -> PathBuf {
        self.out.join("1_metaphlan")
    }

    pub fn final_reports_dir(&self) -> PathBuf {
        self.out.join("final_reports")
    }
}

/// Thresholds applied by the standardizers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StandardizeParams {
    /// Relative abundances (as fractions) below this are written as 0.
    pub min_abund: f64,
    /// XTree per-sample values below this are masked before row filtering.
    pub uthresh: f64,
}

impl StandardizeParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("min_abund", self.min_abund), ("uthresh", self.uthresh)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ReportError::Config(format!(
                    "{} must be a finite, non-negative number (got {})",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// On-disk parameters file. Every key is optional.
///
/// ```toml
/// work_dir = "/scratch/run1"
/// module = "short-read-taxonomy"
/// min_abund = 0.0001
/// uthresh = 0.001
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    #[serde(default = "default_module")]
    pub module: String,
    #[serde(default)]
    pub min_abund: f64,
    #[serde(default)]
    pub uthresh: f64,
}

fn default_module() -> String {
    DEFAULT_MODULE.to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            work_dir: None,
            module: default_module(),
            min_abund: 0.0,
            uthresh: 0.0,
        }
    }
}

impl ConfigFile {
    pub fn params(&self) -> StandardizeParams {
        StandardizeParams {
            min_abund: self.min_abund,
            uthresh: self.uthresh,
        }
    }

    pub fn dirs(&self) -> Option<WorkflowDirs> {
        self.work_dir
            .as_ref()
            .map(|work_dir| WorkflowDirs::new(work_dir, &self.module))
    }
}

pub fn parse_config(path: &Path) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path).map_err(io_err(path))?;
    let config: ConfigFile = toml::from_str(&contents).map_err(|source| ReportError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    config.params().validate()?;
    Ok(config)
}
