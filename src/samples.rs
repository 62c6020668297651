//src/samples.rs

use std::path::{self, Path, PathBuf};

use crate::error::{csv_err, io_err, ReportError, Result};
use crate::table::line_of;

/// One row of the sample sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEntry {
    pub name: String,
    pub fwd: PathBuf,
    pub rev: PathBuf,
}

impl SampleEntry {
    /// Where the forward/reverse links live inside `tmp`.
    pub fn link_paths(&self, tmp: &Path) -> (PathBuf, PathBuf) {
        (
            tmp.join(format!("{}_1.fastq.gz", self.name)),
            tmp.join(format!("{}_2.fastq.gz", self.name)),
        )
    }
}

/// Parse a sample sheet: a header row, then `sample,fwd,rev[,...]`.
pub fn read_sample_sheet(sheet: &Path) -> Result<Vec<SampleEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(sheet)
        .map_err(csv_err(sheet))?;

    let mut entries = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err(sheet))?;
        if record.len() < 3 {
            return Err(ReportError::parse(
                sheet,
                line_of(&record),
                format!("expected sample, forward and reverse columns, found {}", record.len()),
            ));
        }
        entries.push(SampleEntry {
            name: record[0].to_string(),
            fwd: PathBuf::from(&record[1]),
            rev: PathBuf::from(&record[2]),
        });
    }
    Ok(entries)
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

/// Link every sample's reads into `tmp` as `{sample}_1.fastq.gz` /
/// `{sample}_2.fastq.gz`, pointing at absolute paths. Samples whose forward
/// link already exists are left alone. Returns sample names in sheet order.
pub fn ingest_samples(sheet: &Path, tmp: &Path) -> Result<Vec<String>> {
    let entries = read_sample_sheet(sheet)?;

    for entry in &entries {
        let (fwd_link, rev_link) = entry.link_paths(tmp);
        if fwd_link.exists() {
            log::debug!("{} already linked", entry.name);
            continue;
        }
        let fwd = path::absolute(&entry.fwd).map_err(io_err(&entry.fwd))?;
        let rev = path::absolute(&entry.rev).map_err(io_err(&entry.rev))?;
        symlink(&fwd, &fwd_link).map_err(io_err(&fwd_link))?;
        symlink(&rev, &rev_link).map_err(io_err(&rev_link))?;
    }

    log::info!("Ingested {} samples from {}", entries.len(), sheet.display());
    Ok(entries.into_iter().map(|e| e.name).collect())
}
