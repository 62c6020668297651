//src/metaphlan.rs

use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};

use csv::StringRecordsIntoIter;

use crate::config::StandardizeParams;
use crate::error::{csv_err, io_err, ReportError, Result};
use crate::table::{aggregate_by_clade, line_of, open_reader, tsv_reader, AbundanceTable};
use crate::types::{Classifier, Rank, TaxId, UnifiedRecord};

/// Comment lines at the top of every MetaPhlAn profile.
pub const HEADER_LINES: usize = 5;

/// Turn one MetaPhlAn row into a unified record.
///
/// The leaf of `clade_path` is used, except that a strain leaf (`t__`) is
/// replaced by its species parent; `taxid_path` follows the same rule.
/// `rel_abundance` is a percentage. Returns `None` for tokens whose rank
/// prefix is not recognised.
pub fn reshape_row(
    clade_path: &str,
    taxid_path: &str,
    rel_abundance: f64,
    min_abund: f64,
) -> Option<UnifiedRecord> {
    let clades: Vec<&str> = clade_path.split('|').collect();
    let taxids: Vec<&str> = taxid_path.split('|').collect();

    let strain_leaf = clades.len() > 1 && clades[clades.len() - 1].starts_with("t__");
    let step_back = if strain_leaf { 2 } else { 1 };
    let token = clades[clades.len() - step_back];
    let taxid = taxids
        .len()
        .checked_sub(step_back)
        .and_then(|i| taxids.get(i))
        .copied()
        .unwrap_or("");

    let abundance = if rel_abundance < min_abund * 100.0 {
        0.0
    } else {
        rel_abundance / 100.0
    };

    if token.to_ascii_lowercase().contains("unclassified") {
        return Some(UnifiedRecord {
            rank: Rank::Unclassified,
            classifier: Classifier::MetaPhlAn,
            clade: "unclassified".to_string(),
            tax_id: TaxId::Unresolved,
            abundances: vec![abundance],
        });
    }

    let (prefix, name) = token.split_once("__")?;
    let mut letters = prefix.chars();
    let rank = match (letters.next(), letters.next()) {
        (Some(letter), None) => Rank::from_letter(letter)?,
        _ => return None,
    };

    Some(UnifiedRecord {
        rank,
        classifier: Classifier::MetaPhlAn,
        clade: name.replace('_', " "),
        tax_id: TaxId::parse(taxid),
        abundances: vec![abundance],
    })
}

/// Lazy sequence of unified records over one MetaPhlAn profile body.
pub struct MetaphlanRecords<R: Read> {
    path: PathBuf,
    records: StringRecordsIntoIter<R>,
    min_abund: f64,
}

impl<R: Read> MetaphlanRecords<R> {
    /// `reader` must already be positioned past the header lines.
    pub fn new(reader: R, path: &Path, min_abund: f64) -> Self {
        Self {
            path: path.to_path_buf(),
            records: tsv_reader(reader, false).into_records(),
            min_abund,
        }
    }

    fn parse(&self, record: &csv::StringRecord) -> Result<Option<UnifiedRecord>> {
        let line = line_of(record) + HEADER_LINES as u64;
        if record.len() < 3 {
            return Err(ReportError::parse(
                &self.path,
                line,
                format!("expected at least 3 fields, found {}", record.len()),
            ));
        }
        let rel_abundance: f64 = record[2].trim().parse().map_err(|_| {
            ReportError::parse(
                &self.path,
                line,
                format!("relative abundance '{}' is not a number", &record[2]),
            )
        })?;

        let reshaped = reshape_row(&record[0], &record[1], rel_abundance, self.min_abund);
        if reshaped.is_none() {
            log::debug!("Skipping unrecognised clade '{}' at line {}", &record[0], line);
        }
        Ok(reshaped)
    }
}

impl<R: Read> Iterator for MetaphlanRecords<R> {
    type Item = Result<UnifiedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(csv_err(&self.path)(e))),
            };
            match self.parse(&record) {
                Ok(Some(unified)) => return Some(Ok(unified)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Open a MetaPhlAn profile and skip its header.
pub fn read_metaphlan_records(
    report: &Path,
    min_abund: f64,
) -> Result<MetaphlanRecords<Box<dyn BufRead>>> {
    let mut reader = open_reader(report)?;
    let mut skipped = String::new();
    for _ in 0..HEADER_LINES {
        skipped.clear();
        if reader.read_line(&mut skipped).map_err(io_err(report))? == 0 {
            break;
        }
    }
    Ok(MetaphlanRecords::new(reader, report, min_abund))
}

/// Split reshaped records into one aggregated table per standard rank.
pub fn tables_by_rank(sample: &str, records: &[UnifiedRecord]) -> Vec<(Rank, AbundanceTable)> {
    Rank::STANDARD
        .iter()
        .map(|&rank| {
            let rows: Vec<UnifiedRecord> = records
                .iter()
                .filter(|r| r.rank == rank)
                .cloned()
                .collect();
            let table = AbundanceTable::new(vec![sample.to_string()], aggregate_by_clade(rows));
            (rank, table)
        })
        .collect()
}

/// Standardize one sample's MetaPhlAn profile into `{sample}_{rank}.csv`
/// files under `out_dir`, one per standard rank. Returns the written paths.
pub fn standardize_metaphlan(
    report: &Path,
    sample: &str,
    out_dir: &Path,
    params: &StandardizeParams,
) -> Result<Vec<PathBuf>> {
    let records = read_metaphlan_records(report, params.min_abund)?
        .collect::<Result<Vec<_>>>()?;
    log::info!(
        "Read {} MetaPhlAn records for sample {} from {}",
        records.len(),
        sample,
        report.display()
    );

    let mut written = Vec::with_capacity(Rank::STANDARD.len());
    for (rank, table) in tables_by_rank(sample, &records) {
        let path = out_dir.join(format!("{}_{}.csv", sample, rank.name()));
        table.write_csv_file(&path)?;
        written.push(path);
    }
    Ok(written)
}
