//src/bracken.rs

use std::path::{Path, PathBuf};

use crate::config::StandardizeParams;
use crate::error::{csv_err, ReportError, Result};
use crate::table::{line_of, open_reader, tsv_reader, AbundanceTable};
use crate::types::{Classifier, Rank, TaxId, UnifiedRecord};

/// Columns of a Bracken abundance table, in file order.
pub const BRACKEN_COLUMNS: [&str; 7] = [
    "name",
    "taxonomy_id",
    "taxonomy_lvl",
    "kraken_assigned_reads",
    "added_reads",
    "new_est_reads",
    "fraction_total_reads",
];

/// Sample and rank of a Bracken report laid out as `.../{sample}/{rank}.*`.
pub fn sample_and_rank(report: &Path) -> Result<(String, String)> {
    let sample = report
        .parent()
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ReportError::InvalidPath {
            path: report.to_path_buf(),
            what: "sample name",
        })?;
    let rank = report
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ReportError::InvalidPath {
            path: report.to_path_buf(),
            what: "rank",
        })?;
    Ok((sample, rank))
}

/// Read a Bracken report into a single-sample table, keeping input order.
///
/// `rank` is only used to tag the records; Bracken has already restricted
/// the report to one level.
pub fn read_bracken_table(
    report: &Path,
    sample: &str,
    rank: Rank,
    params: &StandardizeParams,
) -> Result<AbundanceTable> {
    let mut rdr = tsv_reader(open_reader(report)?, true);

    let headers = rdr.headers().map_err(csv_err(report))?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ReportError::parse(report, 1, format!("missing column '{}'", name)))
    };
    let name_col = column("name")?;
    let taxid_col = column("taxonomy_id")?;
    let fraction_col = column("fraction_total_reads")?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err(report))?;
        let line = line_of(&record);
        if record.len() != headers.len() {
            return Err(ReportError::parse(
                report,
                line,
                format!("expected {} fields, found {}", headers.len(), record.len()),
            ));
        }

        let fraction: f64 = record[fraction_col].trim().parse().map_err(|_| {
            ReportError::parse(
                report,
                line,
                format!("fraction_total_reads '{}' is not a number", &record[fraction_col]),
            )
        })?;
        let abundance = if fraction < params.min_abund { 0.0 } else { fraction };

        rows.push(UnifiedRecord {
            rank,
            classifier: Classifier::KrakenBracken,
            clade: record[name_col].to_string(),
            tax_id: TaxId::parse(&record[taxid_col]),
            abundances: vec![abundance],
        });
    }

    Ok(AbundanceTable::new(vec![sample.to_string()], rows))
}

/// Standardize a `.../{sample}/{rank}.*` Bracken report into
/// `{out_dir}/{sample}_{rank}.csv`.
pub fn standardize_bracken(
    report: &Path,
    out_dir: &Path,
    params: &StandardizeParams,
) -> Result<PathBuf> {
    let (sample, rank_name) = sample_and_rank(report)?;
    let rank = match Rank::STANDARD.into_iter().find(|r| r.name() == rank_name) {
        Some(rank) => rank,
        None => {
            log::warn!("'{}' is not a standard rank name; writing it anyway", rank_name);
            Rank::Unclassified
        }
    };

    let table = read_bracken_table(report, &sample, rank, params)?;
    log::info!(
        "Read {} Bracken rows for sample {} at rank {}",
        table.rows.len(),
        sample,
        rank_name
    );

    let path = out_dir.join(format!("{}_{}.csv", sample, rank_name));
    table.write_csv_file(&path)?;
    Ok(path)
}
