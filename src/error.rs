//src/error.rs

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Every failure the report transforms can raise.
///
/// Lookup misses are deliberately absent: an unknown clade resolves to
/// `TaxId::Unresolved` instead of an error.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Wrong column count, unparseable number, missing header.
    #[error("Malformed record in '{}' at line {line}: {detail}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        detail: String,
    },

    #[error("Cannot derive {what} from path '{}'", path.display())]
    InvalidPath { path: PathBuf, what: &'static str },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid TOML in '{}': {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
    pub(crate) fn parse(path: &Path, line: u64, detail: impl Into<String>) -> Self {
        ReportError::Parse {
            path: path.to_path_buf(),
            line,
            detail: detail.into(),
        }
    }
}

/// Attach a path to an `io::Error`, for use with `map_err`.
pub(crate) fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ReportError + '_ {
    move |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Attach a path to a `csv::Error`, for use with `map_err`.
pub(crate) fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> ReportError + '_ {
    move |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
