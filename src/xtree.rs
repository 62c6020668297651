//src/xtree.rs

use std::path::{Path, PathBuf};

use crate::config::StandardizeParams;
use crate::error::{csv_err, ReportError, Result};
use crate::table::{aggregate_by_clade, line_of, open_reader, tsv_reader, AbundanceTable};
use crate::taxdb::TaxonomyMap;
use crate::types::{Classifier, Rank, UnifiedRecord};

/// One data row of a merged XTree coverage table.
#[derive(Debug, Clone, PartialEq)]
pub struct XtreeRow {
    /// `;`-separated rank-prefixed clade tokens, e.g. `d__Bacteria;...;s__Name`.
    pub lineage: String,
    /// One value per sample; `NaN` where the table says `NA`.
    pub values: Vec<f64>,
}

/// A parsed merged XTree report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XtreeReport {
    pub samples: Vec<String>,
    pub rows: Vec<XtreeRow>,
}

/// Find the clade for `rank` in a lineage string (first match wins) and
/// build its unified record. `None` if the lineage never reaches that rank.
pub fn reshape_row(row: &XtreeRow, rank: Rank, taxonomy: &TaxonomyMap) -> Option<UnifiedRecord> {
    let prefix = rank.token_prefix();
    let raw_name = row
        .lineage
        .split(';')
        .map(str::trim)
        .find_map(|token| token.strip_prefix(prefix.as_str()))?;

    let clade = raw_name.replace('_', " ");
    let tax_id = taxonomy.lookup_any(&[clade.as_str(), raw_name]);

    Some(UnifiedRecord {
        rank,
        classifier: Classifier::XTree,
        clade,
        tax_id,
        abundances: row.values.clone(),
    })
}

fn parse_value(field: &str) -> Option<f64> {
    match field.trim() {
        "" | "NA" | "NaN" | "nan" => Some(f64::NAN),
        s => s.parse().ok(),
    }
}

/// Read a merged XTree report. The header is `NA` followed by one
/// `X{sample}` column per sample; the `X` is stripped.
pub fn read_xtree_report(report: &Path) -> Result<XtreeReport> {
    let mut records = tsv_reader(open_reader(report)?, false).into_records();

    let header = match records.next() {
        Some(result) => result.map_err(csv_err(report))?,
        None => return Err(ReportError::parse(report, 1, "missing header row")),
    };
    let samples: Vec<String> = header
        .iter()
        .skip(1)
        .map(|s| {
            let s = s.trim();
            s.strip_prefix('X').unwrap_or(s).to_string()
        })
        .collect();

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(csv_err(report))?;
        let line = line_of(&record);
        if record.len() != samples.len() + 1 {
            return Err(ReportError::parse(
                report,
                line,
                format!("expected {} fields, found {}", samples.len() + 1, record.len()),
            ));
        }

        let values = record
            .iter()
            .skip(1)
            .map(|field| {
                parse_value(field).ok_or_else(|| {
                    ReportError::parse(report, line, format!("value '{}' is not a number", field))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        rows.push(XtreeRow {
            lineage: record[0].to_string(),
            values,
        });
    }

    Ok(XtreeReport { samples, rows })
}

/// Mask values below `uthresh`, drop rows left with no value at all, and
/// write the remaining masked cells as 0.
pub fn apply_uthresh(rows: Vec<UnifiedRecord>, uthresh: f64) -> Vec<UnifiedRecord> {
    rows.into_iter()
        .filter_map(|mut row| {
            let mut any_kept = false;
            for value in row.abundances.iter_mut() {
                if value.is_nan() || *value < uthresh {
                    *value = 0.0;
                } else {
                    any_kept = true;
                }
            }
            any_kept.then_some(row)
        })
        .collect()
}

/// Build the table for one rank. Species rows are kept one per input row;
/// higher ranks are summed per clade.
pub fn rank_table(
    report: &XtreeReport,
    rank: Rank,
    taxonomy: &TaxonomyMap,
    uthresh: f64,
) -> AbundanceTable {
    let matched: Vec<UnifiedRecord> = report
        .rows
        .iter()
        .filter_map(|row| reshape_row(row, rank, taxonomy))
        .collect();
    let matched = if rank == Rank::Species {
        matched
    } else {
        aggregate_by_clade(matched)
    };
    AbundanceTable::new(report.samples.clone(), apply_uthresh(matched, uthresh))
}

/// Standardize a merged XTree report into `xtree_{rank}.csv` files under
/// `out_dir`, one per standard rank.
pub fn standardize_xtree(
    report: &Path,
    taxonomy: &TaxonomyMap,
    out_dir: &Path,
    params: &StandardizeParams,
) -> Result<Vec<PathBuf>> {
    let parsed = read_xtree_report(report)?;
    log::info!(
        "Read {} XTree rows over {} samples from {}",
        parsed.rows.len(),
        parsed.samples.len(),
        report.display()
    );

    let mut written = Vec::with_capacity(Rank::STANDARD.len());
    for rank in Rank::STANDARD {
        let table = rank_table(&parsed, rank, taxonomy, params.uthresh);
        let path = out_dir.join(format!("xtree_{}.csv", rank.name()));
        table.write_csv_file(&path)?;
        written.push(path);
    }
    Ok(written)
}
