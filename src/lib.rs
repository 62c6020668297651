// src/lib.rs
pub mod types;
pub mod error;
pub mod config;
pub mod table;
pub mod taxdb;
pub mod metaphlan;
pub mod bracken;
pub mod xtree;
pub mod merge;
pub mod unclassified;
pub mod kraken_report;
pub mod fastq;
pub mod samples;
pub mod logging;

pub use crate::bracken::standardize_bracken;
pub use crate::config::{parse_config, ConfigFile, StandardizeParams, WorkflowDirs};
pub use crate::error::{ReportError, Result};
pub use crate::fastq::scrub_fastq_captions;
pub use crate::kraken_report::clean_kraken_report;
pub use crate::merge::merge_tables;
pub use crate::metaphlan::standardize_metaphlan;
pub use crate::samples::ingest_samples;
pub use crate::table::AbundanceTable;
pub use crate::taxdb::TaxonomyMap;
pub use crate::types::{Classifier, Rank, TaxId, UnifiedRecord};
pub use crate::unclassified::extract_unclassified;
pub use crate::xtree::standardize_xtree;
